//! Static reference catalogs: races, maps, regions, countries and the
//! inter-region ping cross-table. Loaded once at startup; a missing or
//! malformed file is fatal. [Catalog::builtin] carries the shipped
//! tables so tests and fresh installs work without a data directory.

use crate::database::entities::RaceCode;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::{fmt, fs};
use thiserror::Error;

/// Closed set of residential network regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum RegionCode {
    /// North America East
    Nae,
    /// North America West
    Naw,
    /// North America Central
    Nac,
    /// South America
    Sam,
    /// Europe West
    Euw,
    /// Europe East
    Eue,
    /// Europe North
    Eun,
    /// Russia
    Rus,
    /// Middle East
    Mea,
    /// Africa
    Afr,
    /// Korea
    Kor,
    /// China
    Chn,
    /// Japan
    Jpn,
    /// South-East Asia
    Sea,
    /// India
    Ind,
    /// Oceania
    Oce,
}

impl RegionCode {
    pub const COUNT: usize = 16;

    pub const ALL: [RegionCode; Self::COUNT] = [
        RegionCode::Nae,
        RegionCode::Naw,
        RegionCode::Nac,
        RegionCode::Sam,
        RegionCode::Euw,
        RegionCode::Eue,
        RegionCode::Eun,
        RegionCode::Rus,
        RegionCode::Mea,
        RegionCode::Afr,
        RegionCode::Kor,
        RegionCode::Chn,
        RegionCode::Jpn,
        RegionCode::Sea,
        RegionCode::Ind,
        RegionCode::Oce,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            RegionCode::Nae => "NAE",
            RegionCode::Naw => "NAW",
            RegionCode::Nac => "NAC",
            RegionCode::Sam => "SAM",
            RegionCode::Euw => "EUW",
            RegionCode::Eue => "EUE",
            RegionCode::Eun => "EUN",
            RegionCode::Rus => "RUS",
            RegionCode::Mea => "MEA",
            RegionCode::Afr => "AFR",
            RegionCode::Kor => "KOR",
            RegionCode::Chn => "CHN",
            RegionCode::Jpn => "JPN",
            RegionCode::Sea => "SEA",
            RegionCode::Ind => "IND",
            RegionCode::Oce => "OCE",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }

    /// Coarse geographic zone used by the builtin ping and server tables
    fn zone(&self) -> Zone {
        match self {
            RegionCode::Nae | RegionCode::Naw | RegionCode::Nac | RegionCode::Sam => Zone::Americas,
            RegionCode::Euw
            | RegionCode::Eue
            | RegionCode::Eun
            | RegionCode::Rus
            | RegionCode::Mea
            | RegionCode::Afr => Zone::Europe,
            RegionCode::Kor
            | RegionCode::Chn
            | RegionCode::Jpn
            | RegionCode::Sea
            | RegionCode::Ind => Zone::Asia,
            RegionCode::Oce => Zone::Oceania,
        }
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for RegionCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RegionCode::ALL
            .into_iter()
            .find(|region| region.code() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Americas,
    Europe,
    Asia,
    Oceania,
}

/// Country codes whose meaning is "keep my country private"
pub const PRIVATE_COUNTRY_CODES: &[&str] = &["XX", "ZZ"];

/// Every ISO 3166-1 alpha-2 code
const ISO_COUNTRIES: &str = "AD AE AF AG AI AL AM AO AQ AR AS AT AU AW AX AZ BA BB BD BE BF BG BH \
    BI BJ BL BM BN BO BQ BR BS BT BV BW BY BZ CA CC CD CF CG CH CI CK CL CM CN CO CR CU CV CW CX \
    CY CZ DE DJ DK DM DO DZ EC EE EG EH ER ES ET FI FJ FK FM FO FR GA GB GD GE GF GG GH GI GL GM \
    GN GP GQ GR GS GT GU GW GY HK HM HN HR HT HU ID IE IL IM IN IO IQ IR IS IT JE JM JO JP KE KG \
    KH KI KM KN KP KR KW KY KZ LA LB LC LI LK LR LS LT LU LV LY MA MC MD ME MF MG MH MK ML MM MN \
    MO MP MQ MR MS MT MU MV MW MX MY MZ NA NC NE NF NG NI NL NO NP NR NU NZ OM PA PE PF PG PH PK \
    PL PM PN PR PS PT PW PY QA RE RO RS RU RW SA SB SC SD SE SG SH SI SJ SK SL SM SN SO SR SS ST \
    SV SX SY SZ TC TD TF TG TH TJ TK TL TM TN TO TR TT TV TW TZ UA UG UM US UY UZ VA VC VE VG VI \
    VN VU WF WS YE YT ZA ZM ZW";

/// Default competitive map pool
const BUILTIN_MAPS: &[&str] = &[
    "Fighting Spirit",
    "Circuit Breaker",
    "Polypoid",
    "Eclipse",
    "Sylphid",
    "Heartbreak Ridge",
    "Vermeer",
];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {0}: {1}")]
    Read(String, #[source] std::io::Error),
    #[error("failed to parse catalog file {0}: {1}")]
    Parse(String, #[source] serde_json::Error),
    #[error("catalog file {0} references unknown region {1:?}")]
    UnknownRegion(String, String),
}

/// Loaded reference tables. Immutable after construction.
pub struct Catalog {
    races: Vec<(RaceCode, String)>,
    maps: Vec<String>,
    countries: HashSet<String>,
    /// Symmetric expected ping penalty in ms between region pairs
    ping: [[u16; RegionCode::COUNT]; RegionCode::COUNT],
    /// Explicit server overrides per unordered region pair
    server_overrides: HashMap<(RegionCode, RegionCode), String>,
}

impl Catalog {
    /// The shipped reference tables
    pub fn builtin() -> Catalog {
        Catalog {
            races: RaceCode::ALL
                .into_iter()
                .map(|race| (race, display_name(race)))
                .collect(),
            maps: BUILTIN_MAPS.iter().map(|name| name.to_string()).collect(),
            countries: ISO_COUNTRIES
                .split_ascii_whitespace()
                .map(str::to_string)
                .collect(),
            ping: builtin_ping_table(),
            server_overrides: HashMap::new(),
        }
    }

    /// Loads catalogs from `dir`. Every file must be present:
    /// races.json, maps.json, countries.json, ping.json, servers.json.
    /// ping.json and servers.json are sparse overrides on top of the
    /// builtin tables.
    pub fn load(dir: &Path) -> Result<Catalog, CatalogError> {
        let races: Vec<RaceFile> = read_json(dir, "races.json")?;
        let maps: Vec<String> = read_json(dir, "maps.json")?;
        let countries: Vec<String> = read_json(dir, "countries.json")?;
        let ping: HashMap<String, HashMap<String, u16>> = read_json(dir, "ping.json")?;
        let servers: Vec<ServerFile> = read_json(dir, "servers.json")?;

        let mut table = builtin_ping_table();
        for (from, row) in ping {
            let from = parse_region("ping.json", &from)?;
            for (to, ms) in row {
                let to = parse_region("ping.json", &to)?;
                table[from.index()][to.index()] = ms;
                table[to.index()][from.index()] = ms;
            }
        }

        let mut server_overrides = HashMap::new();
        for entry in servers {
            let a = parse_region("servers.json", &entry.region_a)?;
            let b = parse_region("servers.json", &entry.region_b)?;
            server_overrides.insert(ordered(a, b), entry.server);
        }

        Ok(Catalog {
            races: races
                .into_iter()
                .map(|race| (race.code, race.name))
                .collect(),
            maps,
            countries: countries.into_iter().collect(),
            ping: table,
            server_overrides,
        })
    }

    pub fn races(&self) -> &[(RaceCode, String)] {
        &self.races
    }

    /// The active map pool
    pub fn map_pool(&self) -> &[String] {
        &self.maps
    }

    pub fn is_known_map(&self, name: &str) -> bool {
        self.maps.iter().any(|map| map == name)
    }

    /// Whether `code` is an assignable country value: a known ISO code
    /// or one of the private sentinels
    pub fn is_known_country(&self, code: &str) -> bool {
        PRIVATE_COUNTRY_CODES.contains(&code) || self.countries.contains(code)
    }

    /// Expected ping penalty in ms between two residential regions
    pub fn ping_between(&self, a: RegionCode, b: RegionCode) -> u32 {
        self.ping[a.index()][b.index()] as u32
    }

    /// Replaces one cross-table entry, mirrored symmetrically. The
    /// same override mechanism `ping.json` entries go through.
    pub fn override_ping(&mut self, a: RegionCode, b: RegionCode, ms: u16) {
        self.ping[a.index()][b.index()] = ms;
        self.ping[b.index()][a.index()] = ms;
    }

    /// Game server assigned to a pairing of the two regions
    pub fn server_for(&self, a: RegionCode, b: RegionCode) -> String {
        if let Some(server) = self.server_overrides.get(&ordered(a, b)) {
            return server.clone();
        }
        builtin_server(a, b).to_string()
    }
}

#[derive(Deserialize)]
struct RaceFile {
    code: RaceCode,
    name: String,
}

#[derive(Deserialize)]
struct ServerFile {
    region_a: String,
    region_b: String,
    server: String,
}

fn read_json<T: serde::de::DeserializeOwned>(dir: &Path, name: &str) -> Result<T, CatalogError> {
    let path = dir.join(name);
    let data = fs::read_to_string(&path).map_err(|err| CatalogError::Read(name.to_string(), err))?;
    serde_json::from_str(&data).map_err(|err| CatalogError::Parse(name.to_string(), err))
}

fn parse_region(file: &str, code: &str) -> Result<RegionCode, CatalogError> {
    RegionCode::from_str(code)
        .map_err(|_| CatalogError::UnknownRegion(file.to_string(), code.to_string()))
}

fn ordered(a: RegionCode, b: RegionCode) -> (RegionCode, RegionCode) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn display_name(race: RaceCode) -> String {
    match race {
        RaceCode::BwProtoss => "BW Protoss",
        RaceCode::BwTerran => "BW Terran",
        RaceCode::BwZerg => "BW Zerg",
        RaceCode::Sc2Protoss => "SC2 Protoss",
        RaceCode::Sc2Terran => "SC2 Terran",
        RaceCode::Sc2Zerg => "SC2 Zerg",
    }
    .to_string()
}

/// Builds the default cross-table from coarse zone distances. Same
/// region is always 20 ms; everything else depends on the zone pair.
fn builtin_ping_table() -> [[u16; RegionCode::COUNT]; RegionCode::COUNT] {
    let mut table = [[0u16; RegionCode::COUNT]; RegionCode::COUNT];
    for a in RegionCode::ALL {
        for b in RegionCode::ALL {
            table[a.index()][b.index()] = if a == b {
                20
            } else {
                zone_ping(a.zone(), b.zone())
            };
        }
    }
    table
}

fn zone_ping(a: Zone, b: Zone) -> u16 {
    use Zone::*;
    match ordered_zones(a, b) {
        (Americas, Americas) => 60,
        (Europe, Europe) => 50,
        (Asia, Asia) => 60,
        (Oceania, Oceania) => 20,
        (Americas, Europe) => 130,
        (Americas, Asia) => 180,
        (Americas, Oceania) => 190,
        (Europe, Asia) => 170,
        (Europe, Oceania) => 290,
        (Asia, Oceania) => 120,
        _ => unreachable!("zone pairs are normalized"),
    }
}

fn ordered_zones(a: Zone, b: Zone) -> (Zone, Zone) {
    if (a as u8) <= (b as u8) {
        (a, b)
    } else {
        (b, a)
    }
}

fn builtin_server(a: RegionCode, b: RegionCode) -> &'static str {
    use Zone::*;
    match ordered_zones(a.zone(), b.zone()) {
        (Americas, Americas) => "us-central",
        (Europe, Europe) => "eu-central",
        (Asia, Asia) => "kr-central",
        (Oceania, Oceania) => "oce-central",
        (Americas, Europe) => "us-east",
        (Americas, Asia) => "us-west",
        (Americas, Oceania) => "us-west",
        (Europe, Asia) => "eu-east",
        (Europe, Oceania) => "sg-central",
        (Asia, Oceania) => "sg-central",
        _ => unreachable!("zone pairs are normalized"),
    }
}

#[cfg(test)]
mod test {
    use super::{Catalog, RegionCode};
    use std::str::FromStr;

    #[test]
    fn test_region_codes_round_trip() {
        for region in RegionCode::ALL {
            assert_eq!(RegionCode::from_str(region.code()), Ok(region));
        }
        assert!(RegionCode::from_str("ATLANTIS").is_err());
    }

    /// The cross-table must be symmetric and same-region pings small
    #[test]
    fn test_ping_table_symmetric() {
        let catalog = Catalog::builtin();
        for a in RegionCode::ALL {
            assert_eq!(catalog.ping_between(a, a), 20);
            for b in RegionCode::ALL {
                assert_eq!(catalog.ping_between(a, b), catalog.ping_between(b, a));
            }
        }
    }

    /// Server assignment must not depend on argument order
    #[test]
    fn test_server_assignment_symmetric() {
        let catalog = Catalog::builtin();
        for a in RegionCode::ALL {
            for b in RegionCode::ALL {
                assert_eq!(catalog.server_for(a, b), catalog.server_for(b, a));
            }
        }
        assert_eq!(
            catalog.server_for(RegionCode::Nae, RegionCode::Euw),
            "us-east"
        );
    }

    #[test]
    fn test_countries() {
        let catalog = Catalog::builtin();
        assert!(catalog.is_known_country("KR"));
        assert!(catalog.is_known_country("DE"));
        // Private sentinels are assignable but not ISO codes
        assert!(catalog.is_known_country("XX"));
        assert!(catalog.is_known_country("ZZ"));
        assert!(!catalog.is_known_country("Q1"));
    }
}
