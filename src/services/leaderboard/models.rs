//! Materialized leaderboard data structures and the pure computation
//! that produces them. Building a snapshot is the expensive part and
//! runs on the worker pool; queries are cheap slices over the result.

use crate::database::entities::{Player, RaceCode, Rating};
use crate::services::rating::{tier_for_position, RankTier};
use crate::utils::types::{Mmr, PlayerId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Hard cap on rows per page
pub const MAX_PAGE_SIZE: usize = 40;
/// Hard cap on pages exposed; rows beyond are truncated
pub const MAX_PAGES: usize = 25;

/// One (player, race) row of the materialized view
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardRow {
    pub player_id: PlayerId,
    pub display_name: String,
    pub country: Option<String>,
    pub race: RaceCode,
    pub mmr: Mmr,
    pub games_played: i32,
    pub games_won: i32,
    pub games_lost: i32,
    pub games_drawn: i32,
    pub last_played: Option<DateTime<Utc>>,
    /// 1-based position among ranked rows; 0 for unranked
    pub rank: u32,
    pub tier: RankTier,
    /// Rating row ID, monotonic, used as the creation-order tie break
    row_id: i64,
}

/// An immutable ranked view over every rating row
pub struct LeaderboardSnapshot {
    /// Ranked rows, sorted by descending MMR with ranks assigned
    rows: Vec<LeaderboardRow>,
    /// Zero-game rows, kept for completeness but hidden by default
    unranked: Vec<LeaderboardRow>,
    pub refreshed_at: DateTime<Utc>,
}

/// Filters applied to a leaderboard query
#[derive(Debug, Clone, Default)]
pub struct QueryFilters {
    pub country: Option<String>,
    pub races: Vec<RaceCode>,
    pub rank: Option<RankTier>,
    /// Reduce to each player's best race BEFORE applying the other
    /// filters; the ordering is load-bearing for the tier-count sums
    pub best_race_only: bool,
}

/// One page of query results
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub rows: Vec<LeaderboardRow>,
    pub page: usize,
    pub page_size: usize,
    /// Rows matching the filters, after truncation to the page cap
    pub total_rows: usize,
    pub total_pages: usize,
}

impl LeaderboardSnapshot {
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            unranked: Vec::new(),
            refreshed_at: Utc::now(),
        }
    }

    pub fn ranked_len(&self) -> usize {
        self.rows.len()
    }

    /// Runs a filtered, paginated query over the snapshot
    pub fn query(&self, filters: &QueryFilters, page: usize, page_size: usize) -> Page {
        let base: &[LeaderboardRow] = if filters.rank == Some(RankTier::U) {
            &self.unranked
        } else {
            &self.rows
        };

        let mut working: Vec<&LeaderboardRow> = if filters.best_race_only {
            reduce_to_best_race(base)
        } else {
            base.iter().collect()
        };

        working.retain(|row| {
            if let Some(country) = &filters.country {
                if row.country.as_deref() != Some(country.as_str()) {
                    return false;
                }
            }
            if !filters.races.is_empty() && !filters.races.contains(&row.race) {
                return false;
            }
            if let Some(rank) = filters.rank {
                if row.tier != rank {
                    return false;
                }
            }
            true
        });

        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let total_rows = working.len().min(page_size * MAX_PAGES);
        let total_pages = total_rows.div_ceil(page_size).min(MAX_PAGES);

        let page = page.max(1);
        let start = (page - 1).saturating_mul(page_size).min(total_rows);
        let end = (start + page_size).min(total_rows);

        Page {
            rows: working[start..end].iter().map(|row| (*row).clone()).collect(),
            page,
            page_size,
            total_rows,
            total_pages,
        }
    }
}

/// One row per player: highest MMR, breaking ties by the most recent
/// game and then the smaller race code. Keeps the incoming rank order.
fn reduce_to_best_race(rows: &[LeaderboardRow]) -> Vec<&LeaderboardRow> {
    let mut best: HashMap<PlayerId, &LeaderboardRow> = HashMap::new();
    for row in rows {
        match best.get(&row.player_id) {
            Some(current) if !beats(row, current) => {}
            _ => {
                best.insert(row.player_id, row);
            }
        }
    }
    let mut reduced: Vec<&LeaderboardRow> = best.into_values().collect();
    reduced.sort_by_key(|row| (row.rank, row.row_id));
    reduced
}

fn beats(challenger: &LeaderboardRow, current: &LeaderboardRow) -> bool {
    (
        challenger.mmr,
        challenger.last_played,
        std::cmp::Reverse(challenger.race),
    ) > (current.mmr, current.last_played, std::cmp::Reverse(current.race))
}

/// Builds a fresh snapshot from frame contents. Pure and CPU-bound:
/// callers offload it to the worker pool.
pub fn build_snapshot(
    players: &HashMap<PlayerId, Player>,
    ratings: &HashMap<(PlayerId, RaceCode), Rating>,
) -> LeaderboardSnapshot {
    let mut ranked: Vec<LeaderboardRow> = Vec::new();
    let mut unranked: Vec<LeaderboardRow> = Vec::new();

    for rating in ratings.values() {
        let Some(player) = players.get(&rating.player_id) else {
            // A rating row without its player row is a mirror glitch;
            // skip rather than render a nameless entry
            continue;
        };
        let row = LeaderboardRow {
            player_id: rating.player_id,
            display_name: player.display_name.clone(),
            country: player.country.clone(),
            race: rating.race,
            mmr: rating.mmr,
            games_played: rating.games_played,
            games_won: rating.games_won,
            games_lost: rating.games_lost,
            games_drawn: rating.games_drawn,
            last_played: rating.last_played,
            rank: 0,
            tier: RankTier::U,
            row_id: rating.id,
        };
        if rating.games_played > 0 {
            ranked.push(row);
        } else {
            unranked.push(row);
        }
    }

    // Descending MMR, creation order breaking ties
    ranked.sort_by_key(|row| (std::cmp::Reverse(row.mmr), row.row_id));

    let total = ranked.len();
    for (index, row) in ranked.iter_mut().enumerate() {
        row.rank = (index + 1) as u32;
        row.tier = tier_for_position(index, total);
    }

    LeaderboardSnapshot {
        rows: ranked,
        unranked,
        refreshed_at: Utc::now(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::services::data::MONTHLY_ABORT_QUOTA;

    fn player(id: PlayerId, country: &str) -> Player {
        let now = Utc::now();
        Player {
            id,
            display_name: format!("player-{id}"),
            battle_tag: None,
            alt_name_1: None,
            alt_name_2: None,
            country: Some(country.to_string()),
            region: None,
            accepted_tos: true,
            completed_setup: true,
            activated: true,
            abort_quota: MONTHLY_ABORT_QUOTA,
            abort_month: 0,
            accepted_tos_date: Some(now),
            completed_setup_date: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    fn rating(id: i64, player_id: PlayerId, race: RaceCode, mmr: Mmr, games: i32) -> Rating {
        Rating {
            id,
            player_id,
            race,
            mmr,
            games_played: games,
            games_won: games,
            games_lost: 0,
            games_drawn: 0,
            last_played: None,
            created_at: Utc::now(),
        }
    }

    fn fixture() -> LeaderboardSnapshot {
        let players: HashMap<PlayerId, Player> = [
            (1, player(1, "KR")),
            (2, player(2, "KR")),
            (3, player(3, "DE")),
        ]
        .into_iter()
        .collect();
        let ratings: HashMap<(PlayerId, RaceCode), Rating> = [
            rating(1, 1, RaceCode::BwTerran, 1900, 10),
            rating(2, 1, RaceCode::Sc2Zerg, 1400, 4),
            rating(3, 2, RaceCode::BwTerran, 1700, 8),
            rating(4, 2, RaceCode::BwZerg, 1700, 2),
            rating(5, 3, RaceCode::Sc2Protoss, 1500, 6),
            rating(6, 3, RaceCode::BwTerran, 0, 0),
        ]
        .into_iter()
        .map(|row| ((row.player_id, row.race), row))
        .collect();
        build_snapshot(&players, &ratings)
    }

    /// Ranks are assigned in descending MMR order, zero-game rows
    /// stay out of the ranked list
    #[test]
    fn test_build_orders_and_ranks() {
        let snapshot = fixture();
        assert_eq!(snapshot.ranked_len(), 5);

        let page = snapshot.query(&QueryFilters::default(), 1, 40);
        let mmrs: Vec<Mmr> = page.rows.iter().map(|row| row.mmr).collect();
        assert_eq!(mmrs, vec![1900, 1700, 1700, 1500, 1400]);
        let ranks: Vec<u32> = page.rows.iter().map(|row| row.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
        // Equal MMR resolves by creation order
        assert_eq!(page.rows[1].race, RaceCode::BwTerran);
        assert_eq!(page.rows[2].race, RaceCode::BwZerg);
    }

    /// best_race_only keeps one row per player
    #[test]
    fn test_best_race_reduction() {
        let snapshot = fixture();
        let page = snapshot.query(
            &QueryFilters {
                best_race_only: true,
                ..Default::default()
            },
            1,
            40,
        );
        assert_eq!(page.total_rows, 3);
        let ids: Vec<PlayerId> = page.rows.iter().map(|row| row.player_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        // Player 2's tie between equal-MMR races falls to the smaller code
        assert_eq!(page.rows[1].race, RaceCode::BwTerran);
    }

    /// The reduction happens BEFORE the race filter: a player whose
    /// best race is filtered out disappears instead of falling back to
    /// a weaker race
    #[test]
    fn test_reduce_then_filter_order() {
        let snapshot = fixture();
        let page = snapshot.query(
            &QueryFilters {
                best_race_only: true,
                races: vec![RaceCode::Sc2Zerg],
                ..Default::default()
            },
            1,
            40,
        );
        // Player 1 plays sc2_zerg but their best race is bw_terran
        assert_eq!(page.total_rows, 0);
    }

    /// Summing per-tier counts reproduces the unfiltered best-race count
    #[test]
    fn test_tier_counts_sum() {
        let snapshot = fixture();
        let base = snapshot
            .query(
                &QueryFilters {
                    best_race_only: true,
                    ..Default::default()
                },
                1,
                40,
            )
            .total_rows;

        let sum: usize = RankTier::RANKED
            .into_iter()
            .map(|tier| {
                snapshot
                    .query(
                        &QueryFilters {
                            best_race_only: true,
                            rank: Some(tier),
                            ..Default::default()
                        },
                        1,
                        40,
                    )
                    .total_rows
            })
            .sum();
        assert_eq!(sum, base);
    }

    #[test]
    fn test_country_filter() {
        let snapshot = fixture();
        let page = snapshot.query(
            &QueryFilters {
                country: Some("KR".to_string()),
                ..Default::default()
            },
            1,
            40,
        );
        assert_eq!(page.total_rows, 4);
        assert!(page.rows.iter().all(|row| row.country.as_deref() == Some("KR")));
    }

    /// Unranked rows are reachable only through the explicit U filter
    #[test]
    fn test_unranked_hidden_by_default() {
        let snapshot = fixture();
        let hidden = snapshot.query(&QueryFilters::default(), 1, 40);
        assert!(hidden.rows.iter().all(|row| row.games_played > 0));

        let unranked = snapshot.query(
            &QueryFilters {
                rank: Some(RankTier::U),
                ..Default::default()
            },
            1,
            40,
        );
        assert_eq!(unranked.total_rows, 1);
        assert_eq!(unranked.rows[0].player_id, 3);
    }

    /// Page size caps at 40 and pagination walks the order
    #[test]
    fn test_pagination_caps() {
        let players: HashMap<PlayerId, Player> =
            (1..=60).map(|id| (id, player(id, "KR"))).collect();
        let ratings: HashMap<(PlayerId, RaceCode), Rating> = (1..=60)
            .map(|id| rating(id, id, RaceCode::BwTerran, 1000 + id as i32, 1))
            .map(|row| ((row.player_id, row.race), row))
            .collect();
        let snapshot = build_snapshot(&players, &ratings);

        let first = snapshot.query(&QueryFilters::default(), 1, 100);
        assert_eq!(first.page_size, MAX_PAGE_SIZE);
        assert_eq!(first.rows.len(), 40);
        assert_eq!(first.total_pages, 2);

        let second = snapshot.query(&QueryFilters::default(), 2, 100);
        assert_eq!(second.rows.len(), 20);
        // Pages never overlap
        assert!(first.rows.iter().all(|row| row.rank <= 40));
        assert!(second.rows.iter().all(|row| row.rank > 40));
    }
}
