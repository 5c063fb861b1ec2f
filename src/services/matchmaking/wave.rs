//! Pure pairing logic for one wave tick. Operates on a snapshot of the
//! queue so the scheduling loop can hold its lock only to snapshot and
//! to remove the winners.

use crate::catalog::{Catalog, RegionCode};
use crate::database::entities::RaceCode;
use crate::utils::types::{Mmr, PlayerId};

/// Ping at or above this is never acceptable, regardless of wait
pub const ABSOLUTE_PING_VETO: u32 = 300;

/// Snapshot of one queued player. Carries everything a pairing needs
/// so a mid-wave cancellation cannot void a chosen pair.
#[derive(Debug, Clone)]
pub struct WaveEntry {
    pub player: PlayerId,
    /// Selected races with the player's MMR in each (1-2 entries)
    pub races: Vec<(RaceCode, Mmr)>,
    pub vetoes: Vec<String>,
    pub region: RegionCode,
    pub wait_cycles: u32,
}

/// An accepted pairing for this wave
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub player_a: PlayerId,
    pub player_b: PlayerId,
    /// The shared race both sides will play
    pub race: RaceCode,
}

/// Acceptance window widening with the wait-cycle counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairWindow {
    pub max_mmr_diff: u32,
    pub max_ping: u32,
}

/// Window for a given wait-cycle count. Widens monotonically and
/// saturates from the third unpaired wave onwards.
pub fn window_for(wait_cycles: u32) -> PairWindow {
    match wait_cycles {
        0 => PairWindow {
            max_mmr_diff: 100,
            max_ping: 100,
        },
        1 => PairWindow {
            max_mmr_diff: 200,
            max_ping: 150,
        },
        2 => PairWindow {
            max_mmr_diff: 350,
            max_ping: 200,
        },
        _ => PairWindow {
            max_mmr_diff: 500,
            max_ping: 300,
        },
    }
}

struct Candidate {
    a: usize,
    b: usize,
    race: RaceCode,
    cost: f64,
    /// Longer of the two waits, for tie-breaking
    wait: u32,
    /// Lower of the two participant IDs, for tie-breaking
    low_id: PlayerId,
}

/// Computes the accepted pairings for one wave: all feasible pairs are
/// costed, sorted cheapest first and accepted greedily.
pub fn pair_wave(entries: &[WaveEntry], catalog: &Catalog) -> Vec<Pairing> {
    let mut candidates: Vec<Candidate> = Vec::new();

    for a in 0..entries.len() {
        for b in (a + 1)..entries.len() {
            if let Some(candidate) = evaluate(entries, a, b, catalog) {
                candidates.push(candidate);
            }
        }
    }

    candidates.sort_by(|x, y| {
        x.cost
            .total_cmp(&y.cost)
            .then(y.wait.cmp(&x.wait))
            .then(x.low_id.cmp(&y.low_id))
    });

    let mut taken = vec![false; entries.len()];
    let mut pairings = Vec::new();
    for candidate in candidates {
        if taken[candidate.a] || taken[candidate.b] {
            continue;
        }
        taken[candidate.a] = true;
        taken[candidate.b] = true;
        pairings.push(Pairing {
            player_a: entries[candidate.a].player,
            player_b: entries[candidate.b].player,
            race: candidate.race,
        });
    }
    pairings
}

/// Feasibility and cost for one unordered pair
fn evaluate(entries: &[WaveEntry], a: usize, b: usize, catalog: &Catalog) -> Option<Candidate> {
    let first = &entries[a];
    let second = &entries[b];

    if first.player == second.player {
        return None;
    }

    // Best shared race: the one with the smallest rating gap, ties
    // falling to the smaller race code for determinism
    let (race, diff, lower_mmr) = first
        .races
        .iter()
        .filter_map(|(race, own)| {
            let (_, theirs) = second.races.iter().find(|(other, _)| other == race)?;
            Some((*race, own.abs_diff(*theirs), (*own).min(*theirs)))
        })
        .min_by_key(|(race, diff, _)| (*diff, *race))?;

    // The longer-waiting player's window governs: widening exists so
    // patience can reach newcomers, who always sit at wait zero
    let window = window_for(first.wait_cycles.max(second.wait_cycles));

    if diff > window.max_mmr_diff {
        return None;
    }

    let ping = catalog.ping_between(first.region, second.region);
    if ping >= ABSOLUTE_PING_VETO || ping > window.max_ping {
        return None;
    }

    let wait = first.wait_cycles.max(second.wait_cycles);
    Some(Candidate {
        a,
        b,
        race,
        cost: pair_cost(lower_mmr, diff, ping, wait),
        wait,
        low_id: first.player.min(second.player),
    })
}

/// Weighted cost of a feasible pair. Weights come from the weaker
/// player's bracket; long waits attenuate the ping weight so patience
/// buys distance.
fn pair_cost(lower_mmr: Mmr, mmr_diff: u32, ping: u32, wait_cycles: u32) -> f64 {
    let (ping_weight, mmr_weight) = if lower_mmr < 1200 {
        (0.75, 0.25)
    } else if lower_mmr < 1800 {
        (0.50, 0.50)
    } else {
        (0.25, 0.75)
    };
    let attenuation = 1.0 - (0.1 * wait_cycles as f64).min(0.3);
    mmr_weight * mmr_diff as f64 + ping_weight * attenuation * ping as f64
}
