//! Per-match state machine coordinator. Every transition for a match
//! runs under that match's own lock, created on demand and discarded
//! once the match reaches a terminal state. Late arrivals observe the
//! terminal status and become no-ops.

use crate::database::entities::{Match, MatchStatus, ReportedResult};
use crate::errors::{LadderError, LadderResult};
use crate::services::data::DataLayer;
use crate::services::events::{EventBus, EventKind, MatchEvent};
use crate::services::rating;
use crate::utils::hashing::IntHashMap;
use crate::utils::types::{MatchId, PlayerId};
use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;

/// Lock table keyed by match ID. Entries are created lazily and
/// removed on terminal transition; holders that already cloned the
/// [Arc] keep a working lock and simply observe the terminal state.
#[derive(Default)]
struct MatchLocks {
    locks: Mutex<IntHashMap<MatchId, Arc<AsyncMutex<()>>>>,
}

impl MatchLocks {
    fn acquire(&self, match_id: MatchId) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .entry(match_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn release(&self, match_id: MatchId) {
        self.locks.lock().remove(&match_id);
    }
}

/// How a pair of agreeing or disagreeing reports resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Player1Win,
    Player2Win,
    Draw,
    Conflict,
}

/// Resolves two self-reports into a terminal outcome. Abort never
/// reaches here: it finalizes immediately on submission.
fn resolve_reports(report_1: ReportedResult, report_2: ReportedResult) -> Resolution {
    use ReportedResult::*;
    match (report_1, report_2) {
        (Win, Loss) => Resolution::Player1Win,
        (Loss, Win) => Resolution::Player2Win,
        (Draw, Draw) => Resolution::Draw,
        _ => Resolution::Conflict,
    }
}

pub struct Lifecycle {
    data: Arc<DataLayer>,
    bus: Arc<EventBus>,
    locks: MatchLocks,
    match_timeout: Duration,
}

impl Lifecycle {
    pub fn new(data: Arc<DataLayer>, bus: Arc<EventBus>, match_timeout: Duration) -> Self {
        Self {
            data,
            bus,
            locks: MatchLocks::default(),
            match_timeout,
        }
    }

    /// Handles a participant's self-report, including abort requests.
    /// Returns the match status after the report was processed.
    pub async fn report_result(
        &self,
        match_id: MatchId,
        player: PlayerId,
        result: ReportedResult,
    ) -> LadderResult<MatchStatus> {
        let lock = self.locks.acquire(match_id);
        let _guard = lock.lock().await;

        let row = self
            .data
            .get_match(match_id)
            .ok_or(LadderError::NotFound("match"))?;
        if row.player_1 != player && row.player_2 != player {
            return Err(LadderError::Validation(
                "player is not part of this match".to_string(),
            ));
        }
        if row.status.is_terminal() {
            debug!("report for resolved match {match_id} ignored");
            return Err(LadderError::State("match is already resolved"));
        }

        if result == ReportedResult::Abort {
            return self.abort(row, player).await;
        }

        let row = self.data.record_report(match_id, player, result)?;
        self.bus.publish(MatchEvent {
            match_id,
            kind: EventKind::ResultReported { player, result },
            lag: 0,
        });

        match (row.report_1, row.report_2) {
            (Some(report_1), Some(report_2)) => {
                self.resolve(row, resolve_reports(report_1, report_2)).await
            }
            // First report only: stay open and wait for the other side
            _ => Ok(MatchStatus::Pending),
        }
    }

    /// Abort with quota enforcement. Quota is only consumed when the
    /// match is actually aborted.
    async fn abort(&self, row: Match, player: PlayerId) -> LadderResult<MatchStatus> {
        let match_id = row.id;
        let remaining = self.data.try_consume_abort(player, Utc::now())?;

        let Some(_) = self.data.finalize_match(match_id, MatchStatus::Aborted, None) else {
            debug!("abort lost the race on match {match_id}");
            return Err(LadderError::State("match is already resolved"));
        };

        info!("match {match_id} aborted by {player} ({remaining} aborts left)");
        self.bus.publish(MatchEvent {
            match_id,
            kind: EventKind::Aborted { by: player },
            lag: 0,
        });
        self.locks.release(match_id);
        Ok(MatchStatus::Aborted)
    }

    /// Applies a dual-report resolution: rating updates for a decided
    /// outcome, a conflict flag otherwise
    async fn resolve(&self, row: Match, resolution: Resolution) -> LadderResult<MatchStatus> {
        let match_id = row.id;

        if resolution == Resolution::Conflict {
            if self
                .data
                .finalize_match(match_id, MatchStatus::Conflict, None)
                .is_none()
            {
                return Err(LadderError::State("match is already resolved"));
            }
            warn!("match {match_id} reports disagree, flagged for review");
            self.bus.publish(MatchEvent {
                match_id,
                kind: EventKind::Conflicted,
                lag: 0,
            });
            self.locks.release(match_id);
            return Ok(MatchStatus::Conflict);
        }

        // Rating rows for the shared race, created at the midpoint on
        // a player's first match in it
        let race = row.race_1;
        let mut rating_1 = self.data.rating_or_default(row.player_1, race);
        let mut rating_2 = self.data.rating_or_default(row.player_2, race);

        let (status, delta_1, delta_2) = match resolution {
            Resolution::Player1Win => {
                let (winner, loser) = rating::rate_win(rating_1.mmr, rating_2.mmr);
                (MatchStatus::Player1Win, winner, loser)
            }
            Resolution::Player2Win => {
                let (winner, loser) = rating::rate_win(rating_2.mmr, rating_1.mmr);
                (MatchStatus::Player2Win, loser, winner)
            }
            Resolution::Draw => {
                let (delta_1, delta_2) = rating::rate_draw(rating_1.mmr, rating_2.mmr);
                (MatchStatus::Draw, delta_1, delta_2)
            }
            Resolution::Conflict => unreachable!("conflict handled above"),
        };

        // Claim the terminal transition before touching ratings so a
        // lost race never double-applies deltas
        let Some(_) = self
            .data
            .finalize_match(match_id, status, Some((delta_1, delta_2)))
        else {
            return Err(LadderError::State("match is already resolved"));
        };

        let now = Utc::now();
        apply_outcome(&mut rating_1, delta_1, now);
        apply_outcome(&mut rating_2, delta_2, now);
        match status {
            MatchStatus::Player1Win => {
                rating_1.games_won += 1;
                rating_2.games_lost += 1;
            }
            MatchStatus::Player2Win => {
                rating_1.games_lost += 1;
                rating_2.games_won += 1;
            }
            MatchStatus::Draw => {
                rating_1.games_drawn += 1;
                rating_2.games_drawn += 1;
            }
            _ => unreachable!("only decided outcomes reach rating application"),
        }
        self.data.upsert_rating(rating_1);
        self.data.upsert_rating(rating_2);
        self.data.invalidate_leaderboard();

        info!("match {match_id} completed: {status:?} ({delta_1:+}/{delta_2:+})");
        self.bus.publish(MatchEvent {
            match_id,
            kind: EventKind::Completed {
                status,
                delta_1,
                delta_2,
            },
            lag: 0,
        });
        self.locks.release(match_id);
        Ok(status)
    }

    /// Flags a match conflicted from outside the report flow, used by
    /// replay ingestion on a cross-match hash collision
    pub async fn flag_conflict(&self, match_id: MatchId) -> LadderResult<()> {
        let lock = self.locks.acquire(match_id);
        let _guard = lock.lock().await;

        if self
            .data
            .finalize_match(match_id, MatchStatus::Conflict, None)
            .is_none()
        {
            return Err(LadderError::State("match is already resolved"));
        }
        warn!("match {match_id} flagged conflicted");
        self.bus.publish(MatchEvent {
            match_id,
            kind: EventKind::Conflicted,
            lag: 0,
        });
        self.locks.release(match_id);
        Ok(())
    }

    /// Finalizes matches whose timeout elapsed with no resolution.
    /// Timed-out matches are stored as aborted but consume nobody's
    /// quota. Returns how many matches were closed.
    pub async fn sweep_timeouts(&self) -> usize {
        let now = Utc::now();
        let cutoff = chrono::Duration::from_std(self.match_timeout)
            .unwrap_or_else(|_| chrono::Duration::minutes(60));

        let expired: Vec<MatchId> = self
            .data
            .matches_snapshot()
            .values()
            .filter(|row| row.status == MatchStatus::Pending && now - row.played_at > cutoff)
            .map(|row| row.id)
            .collect();

        let mut closed = 0;
        for match_id in expired {
            let lock = self.locks.acquire(match_id);
            let _guard = lock.lock().await;

            if self
                .data
                .finalize_match(match_id, MatchStatus::Aborted, None)
                .is_none()
            {
                continue;
            }
            info!("match {match_id} timed out");
            self.bus.publish(MatchEvent {
                match_id,
                kind: EventKind::TimedOut,
                lag: 0,
            });
            self.locks.release(match_id);
            closed += 1;
        }
        closed
    }

    /// Periodic timeout sweep
    pub async fn run(self: Arc<Self>, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval.tick().await;
        loop {
            interval.tick().await;
            self.sweep_timeouts().await;
        }
    }
}

fn apply_outcome(
    rating: &mut crate::database::entities::Rating,
    delta: i32,
    now: chrono::DateTime<Utc>,
) {
    rating.mmr = rating::apply(rating.mmr, delta);
    rating.games_played += 1;
    rating.last_played = Some(now);
}
