//! Input validators for player-provided profile fields. These are pure
//! functions: violations come back as typed errors for the view layer
//! to render, never as panics.

use thiserror::Error;

/// Display name length bounds (inclusive)
const NAME_MIN_LEN: usize = 3;
const NAME_MAX_LEN: usize = 12;

/// Total length cap for a battle tag including the `#digits` suffix
const BATTLE_TAG_MAX_LEN: usize = 20;

/// Names that can never be claimed, compared case-insensitively
const RESERVED_NAMES: &[&str] = &[
    "admin",
    "administrator",
    "mod",
    "moderator",
    "player",
    "bot",
    "system",
    "server",
    "referee",
];

/// Which character classes a display name may draw from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameAlphabet {
    /// ASCII letters, digits, `_` and `-`
    #[default]
    English,
    /// Any Unicode letter plus digits, `_` and `-`
    International,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name must be between {NAME_MIN_LEN} and {NAME_MAX_LEN} characters")]
    Length,
    #[error("name contains characters that are not allowed")]
    Charset,
    #[error("that name is reserved")]
    Reserved,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattleTagError {
    #[error("battle tag must look like Name#1234")]
    Format,
    #[error("battle tag must be at most {BATTLE_TAG_MAX_LEN} characters")]
    Length,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CountryError {
    #[error("country must be a two letter ISO code")]
    Format,
}

impl NameAlphabet {
    fn allows(&self, value: char) -> bool {
        if value.is_ascii_alphanumeric() || value == '_' || value == '-' {
            return true;
        }
        match self {
            NameAlphabet::English => false,
            NameAlphabet::International => value.is_alphanumeric(),
        }
    }
}

/// Validates a display name (or alt name) against the length, charset
/// and reserved-word rules
pub fn validate_display_name(name: &str, alphabet: NameAlphabet) -> Result<(), NameError> {
    let length = name.chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&length) {
        return Err(NameError::Length);
    }

    if !name.chars().all(|value| alphabet.allows(value)) {
        return Err(NameError::Charset);
    }

    let lowered = name.to_lowercase();
    if RESERVED_NAMES.iter().any(|reserved| *reserved == lowered) {
        return Err(NameError::Reserved);
    }

    Ok(())
}

/// Validates a battle tag of the form `Name#1234`
pub fn validate_battle_tag(tag: &str) -> Result<(), BattleTagError> {
    if tag.chars().count() > BATTLE_TAG_MAX_LEN {
        return Err(BattleTagError::Length);
    }

    let (name, digits) = tag.split_once('#').ok_or(BattleTagError::Format)?;

    let name_ok = (1..=15).contains(&name.len())
        && name
            .chars()
            .all(|value| value.is_ascii_alphanumeric() || value == '_' || value == '-');
    let digits_ok = (1..=6).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit());

    if !name_ok || !digits_ok {
        return Err(BattleTagError::Format);
    }

    Ok(())
}

/// Validates the shape of an ISO country code; membership in the known
/// country table is checked against the catalog by the caller
pub fn validate_country_shape(code: &str) -> Result<(), CountryError> {
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(CountryError::Format)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Length 3 passes, 2 fails; length 12 passes, 13 fails
    #[test]
    fn test_name_length_bounds() {
        assert!(validate_display_name("abc", NameAlphabet::English).is_ok());
        assert_eq!(
            validate_display_name("ab", NameAlphabet::English),
            Err(NameError::Length)
        );
        assert!(validate_display_name("abcdefghijkl", NameAlphabet::English).is_ok());
        assert_eq!(
            validate_display_name("abcdefghijklm", NameAlphabet::English),
            Err(NameError::Length)
        );
    }

    #[test]
    fn test_name_charset() {
        assert!(validate_display_name("Flash_1-2", NameAlphabet::English).is_ok());
        assert_eq!(
            validate_display_name("Fla sh", NameAlphabet::English),
            Err(NameError::Charset)
        );
        assert_eq!(
            validate_display_name("Фла́ш", NameAlphabet::English),
            Err(NameError::Charset)
        );
    }

    /// International mode admits Unicode letters but still rejects
    /// punctuation and whitespace
    #[test]
    fn test_name_international() {
        assert!(validate_display_name("Флаш", NameAlphabet::International).is_ok());
        assert!(validate_display_name("제동", NameAlphabet::International).is_err());
        assert!(validate_display_name("저그대마왕", NameAlphabet::International).is_ok());
        assert_eq!(
            validate_display_name("Фла ш", NameAlphabet::International),
            Err(NameError::Charset)
        );
    }

    #[test]
    fn test_name_reserved() {
        assert_eq!(
            validate_display_name("Admin", NameAlphabet::English),
            Err(NameError::Reserved)
        );
        assert_eq!(
            validate_display_name("MODERATOR", NameAlphabet::English),
            Err(NameError::Reserved)
        );
        assert!(validate_display_name("Admiral", NameAlphabet::English).is_ok());
    }

    #[test]
    fn test_battle_tag() {
        assert!(validate_battle_tag("Flash#1234").is_ok());
        assert!(validate_battle_tag("a#1").is_ok());
        assert_eq!(validate_battle_tag("Flash1234"), Err(BattleTagError::Format));
        assert_eq!(validate_battle_tag("Flash#"), Err(BattleTagError::Format));
        assert_eq!(validate_battle_tag("#1234"), Err(BattleTagError::Format));
        assert_eq!(
            validate_battle_tag("Flash#1234567"),
            Err(BattleTagError::Format)
        );
        // 15 name chars + '#' + 6 digits is 22 > 20 total
        assert_eq!(
            validate_battle_tag("abcdefghijklmno#123456"),
            Err(BattleTagError::Length)
        );
    }

    #[test]
    fn test_country_shape() {
        assert!(validate_country_shape("KR").is_ok());
        assert!(validate_country_shape("XX").is_ok());
        assert!(validate_country_shape("kr").is_err());
        assert!(validate_country_shape("KOR").is_err());
    }
}
