//! Rating math. Everything in here is pure and deterministic: the
//! lifecycle coordinator feeds it MMR pairs and applies the returned
//! deltas through the data layer.

use crate::utils::types::Mmr;
use serde::Serialize;

/// Update magnitude constant
pub const K_FACTOR: f64 = 40.0;
/// Denominator inside the logistic. Conventional Elo uses 400; the
/// ladder has always run with 500 which flattens expected scores a
/// little and keeps deltas smaller at wide gaps.
pub const DIVISOR: f64 = 500.0;
/// MMR given to a rating row created on a player's first match
pub const INITIAL_MMR: Mmr = 1200;

/// Expected score of `own` against `opponent`, in (0, 1)
pub fn expected_score(own: Mmr, opponent: Mmr) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - own) as f64 / DIVISOR))
}

/// MMR deltas for a decided game, returned as (winner, loser). The
/// deltas always sum to zero.
pub fn rate_win(winner: Mmr, loser: Mmr) -> (i32, i32) {
    let expected = expected_score(winner, loser);
    let delta = round_half_away(K_FACTOR * (1.0 - expected));
    (delta, -delta)
}

/// MMR deltas for a draw, returned in argument order. The lower-rated
/// side gains what the higher-rated side loses.
pub fn rate_draw(a: Mmr, b: Mmr) -> (i32, i32) {
    let delta = round_half_away(K_FACTOR * (0.5 - expected_score(a, b)));
    (delta, -delta)
}

/// Applies a delta to an MMR, clamping at zero
pub fn apply(mmr: Mmr, delta: i32) -> Mmr {
    (mmr + delta).max(0)
}

/// f64::round rounds half away from zero, which is exactly the rounding
/// the ladder wants
fn round_half_away(value: f64) -> i32 {
    value.round() as i32
}

/// Percentile rank tier over all (player, race) rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, serde::Deserialize)]
pub enum RankTier {
    S,
    A,
    B,
    C,
    D,
    E,
    F,
    /// Unranked: zero games played. Kept in the snapshot but excluded
    /// from default leaderboard display.
    U,
}

impl RankTier {
    pub const RANKED: [RankTier; 7] = [
        RankTier::S,
        RankTier::A,
        RankTier::B,
        RankTier::C,
        RankTier::D,
        RankTier::E,
        RankTier::F,
    ];
}

/// Tier for the row at 0-based `index` of a descending MMR list of
/// `total` ranked rows. Ties are broken upstream by row creation order,
/// so position alone decides the tier.
pub fn tier_for_position(index: usize, total: usize) -> RankTier {
    debug_assert!(index < total);
    let fraction = index as f64 / total as f64;
    if fraction < 0.01 {
        RankTier::S
    } else if fraction < 0.08 {
        RankTier::A
    } else if fraction < 0.29 {
        RankTier::B
    } else if fraction < 0.50 {
        RankTier::C
    } else if fraction < 0.71 {
        RankTier::D
    } else if fraction < 0.92 {
        RankTier::E
    } else {
        RankTier::F
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Evenly matched players trade exactly half the K factor
    #[test]
    fn test_even_win() {
        assert_eq!(rate_win(1500, 1500), (20, -20));
    }

    /// The S1 scenario pairing: 1500 beats 1520
    #[test]
    fn test_underdog_win() {
        let (winner, loser) = rate_win(1500, 1520);
        assert_eq!(winner, 21);
        assert_eq!(loser, -21);
    }

    /// Winner and loser deltas always cancel out
    #[test]
    fn test_zero_sum() {
        for (a, b) in [(1200, 1200), (800, 2400), (1850, 1230), (0, 3000)] {
            let (winner, loser) = rate_win(a, b);
            assert_eq!(winner + loser, 0);
            assert!(winner > 0);
        }
    }

    /// A draw between equals moves nothing; otherwise the lower side
    /// gains what the higher side loses
    #[test]
    fn test_draw() {
        assert_eq!(rate_draw(1500, 1500), (0, 0));
        let (low, high) = rate_draw(1400, 1600);
        assert!(low > 0);
        assert_eq!(low + high, 0);
    }

    /// Rating is a pure function of the inputs: swapping the pair and
    /// re-applying preserves the original difference
    #[test]
    fn test_pure_function_of_inputs() {
        let (first_a, first_b) = rate_win(1450, 1610);
        let (second_a, second_b) = rate_win(1450, 1610);
        assert_eq!((first_a, first_b), (second_a, second_b));
    }

    /// MMR never goes below zero
    #[test]
    fn test_floor() {
        assert_eq!(apply(5, -40), 0);
        assert_eq!(apply(1200, -40), 1160);
    }

    /// Tier boundaries at the percent edges
    #[test]
    fn test_tier_boundaries() {
        let total = 100;
        assert_eq!(tier_for_position(0, total), RankTier::S);
        assert_eq!(tier_for_position(1, total), RankTier::A);
        assert_eq!(tier_for_position(7, total), RankTier::A);
        assert_eq!(tier_for_position(8, total), RankTier::B);
        assert_eq!(tier_for_position(28, total), RankTier::B);
        assert_eq!(tier_for_position(29, total), RankTier::C);
        assert_eq!(tier_for_position(49, total), RankTier::C);
        assert_eq!(tier_for_position(50, total), RankTier::D);
        assert_eq!(tier_for_position(70, total), RankTier::D);
        assert_eq!(tier_for_position(71, total), RankTier::E);
        assert_eq!(tier_for_position(91, total), RankTier::E);
        assert_eq!(tier_for_position(92, total), RankTier::F);
        assert_eq!(tier_for_position(99, total), RankTier::F);
    }

    /// A tiny ladder still puts its top row in S
    #[test]
    fn test_tier_small_ladder() {
        assert_eq!(tier_for_position(0, 3), RankTier::S);
        assert_eq!(tier_for_position(2, 3), RankTier::D);
    }
}
