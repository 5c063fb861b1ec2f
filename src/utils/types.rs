//! Module for type aliases that help to better identify field types

/// External (chat platform) user ID, used as the player key everywhere
pub type PlayerId = i64;
/// Monotonically increasing match key
pub type MatchId = i64;
/// Integer matchmaking rating
pub type Mmr = i32;
