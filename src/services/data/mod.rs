//! Write-through in-memory data layer. All reference tables live in
//! column frames swapped as immutable snapshots: reads never wait,
//! writers clone-and-swap under a short exclusive lock. Durable writes
//! are queued to a single background worker; the in-memory mirror is
//! applied at submission time so the process always reads its own
//! writes.

use crate::database::entities::{
    ActionSource, Match, MatchStatus, Player, Preferences, RaceCode, Rating, Replay, ReportedResult,
};
use crate::errors::{LadderError, LadderResult};
use crate::services::rating::INITIAL_MMR;
use crate::utils::types::{MatchId, PlayerId};
use chrono::{DateTime, Datelike, Utc};
use log::error;
use parking_lot::RwLock;
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

mod writer;

pub use writer::WriteJob;

/// Aborts granted at the start of every calendar month
pub const MONTHLY_ABORT_QUOTA: i32 = 3;

/// Copy-on-write snapshot map. Readers grab an [Arc] handle that stays
/// stable for the duration of the call; writers clone the map, apply
/// the mutation and swap the pointer under the lock.
pub struct Frame<K, V> {
    inner: RwLock<Arc<HashMap<K, V>>>,
}

impl<K, V> Frame<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn new(map: HashMap<K, V>) -> Self {
        Self {
            inner: RwLock::new(Arc::new(map)),
        }
    }

    pub fn snapshot(&self) -> Arc<HashMap<K, V>> {
        self.inner.read().clone()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.read().get(key).cloned()
    }

    fn mutate<R>(&self, apply: impl FnOnce(&mut HashMap<K, V>) -> R) -> R {
        let mut guard = self.inner.write();
        let mut next = HashMap::clone(&guard);
        let out = apply(&mut next);
        *guard = Arc::new(next);
        out
    }
}

/// Shared flag raised by the data layer when a finalized match makes
/// the materialized leaderboard stale
#[derive(Clone, Default)]
pub struct InvalidationSignal(Arc<AtomicBool>);

impl InvalidationSignal {
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clears and returns the flag
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// In-memory mirrors of every table the core reads
pub struct Frames {
    pub players: Frame<PlayerId, Player>,
    pub ratings: Frame<(PlayerId, RaceCode), Rating>,
    pub matches: Frame<MatchId, Match>,
    pub preferences: Frame<PlayerId, Preferences>,
    pub replays: Frame<String, Replay>,
}

/// Fields a completed `/setup` may touch
pub struct SetupFields {
    pub display_name: String,
    pub battle_tag: Option<String>,
    pub alt_name_1: Option<String>,
    pub alt_name_2: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
}

/// One changed profile field, mirrored into the action log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDelta {
    pub field: &'static str,
    pub old: Option<String>,
    pub new: Option<String>,
}

pub struct DataLayer {
    frames: Arc<Frames>,
    writer_tx: mpsc::UnboundedSender<WriteJob>,
    next_match_id: AtomicI64,
    next_rating_id: AtomicI64,
    invalidation: InvalidationSignal,
}

impl DataLayer {
    /// Loads every frame from the durable store and starts the write
    /// worker. Construction blocks until the frames are complete.
    pub async fn new(db: DatabaseConnection, data_dir: PathBuf) -> LadderResult<Arc<DataLayer>> {
        let players = Player::all(&db).await.map_err(upstream)?;
        let ratings = Rating::all(&db).await.map_err(upstream)?;
        let matches = Match::all_pending(&db).await.map_err(upstream)?;
        let preferences = Preferences::all(&db).await.map_err(upstream)?;
        let replays = Replay::all(&db).await.map_err(upstream)?;

        let max_match_id = Match::max_id(&db).await.map_err(upstream)?;
        let max_rating_id = ratings.iter().map(|row| row.id).max().unwrap_or(0);

        let frames = Arc::new(Frames {
            players: Frame::new(players.into_iter().map(|row| (row.id, row)).collect()),
            ratings: Frame::new(
                ratings
                    .into_iter()
                    .map(|row| ((row.player_id, row.race), row))
                    .collect(),
            ),
            matches: Frame::new(matches.into_iter().map(|row| (row.id, row)).collect()),
            preferences: Frame::new(
                preferences
                    .into_iter()
                    .map(|row| (row.player_id, row))
                    .collect(),
            ),
            replays: Frame::new(
                replays
                    .into_iter()
                    .map(|row| (row.hash.clone(), row))
                    .collect(),
            ),
        });

        let (writer_tx, writer_rx) = mpsc::unbounded_channel();
        tokio::spawn(writer::run(
            db,
            writer_rx,
            frames.clone(),
            data_dir.join("failed_writes.log"),
        ));

        Ok(Arc::new(DataLayer {
            frames,
            writer_tx,
            next_match_id: AtomicI64::new(max_match_id),
            next_rating_id: AtomicI64::new(max_rating_id),
            invalidation: InvalidationSignal::default(),
        }))
    }

    fn enqueue(&self, job: WriteJob) {
        // The worker outlives every caller except during shutdown,
        // where losing analytics-grade jobs is acceptable
        if self.writer_tx.send(job).is_err() {
            error!("write worker is gone, dropping write job");
        }
    }

    // ----- players -----

    pub fn get_player(&self, id: PlayerId) -> Option<Player> {
        self.frames.players.get(&id)
    }

    pub fn players_snapshot(&self) -> Arc<HashMap<PlayerId, Player>> {
        self.frames.players.snapshot()
    }

    /// Fetches the player, creating a minimal row on first contact
    pub fn ensure_player(&self, id: PlayerId, display_name: &str) -> Player {
        if let Some(existing) = self.frames.players.get(&id) {
            return existing;
        }
        let now = Utc::now();
        let row = Player {
            id,
            display_name: display_name.to_string(),
            battle_tag: None,
            alt_name_1: None,
            alt_name_2: None,
            country: None,
            region: None,
            accepted_tos: false,
            completed_setup: false,
            activated: false,
            abort_quota: MONTHLY_ABORT_QUOTA,
            abort_month: month_index(now),
            accepted_tos_date: None,
            completed_setup_date: None,
            created_at: now,
            updated_at: now,
        };
        let inserted = self.frames.insert_player_if_absent(row);
        self.enqueue(WriteJob::UpsertPlayer(inserted.clone()));
        inserted
    }

    /// Applies the `/setup` fields, returning the per-field deltas that
    /// were also appended to the action log
    pub fn complete_setup(
        &self,
        id: PlayerId,
        fields: SetupFields,
    ) -> LadderResult<Vec<FieldDelta>> {
        let now = Utc::now();
        let (updated, deltas) = self.frames.players.mutate(|players| {
            let player = players.get_mut(&id).ok_or(LadderError::NotFound("player"))?;

            let mut deltas = Vec::new();
            track(
                &mut deltas,
                "display_name",
                Some(player.display_name.clone()),
                Some(fields.display_name.clone()),
            );
            track(
                &mut deltas,
                "battle_tag",
                player.battle_tag.clone(),
                fields.battle_tag.clone(),
            );
            track(
                &mut deltas,
                "alt_name_1",
                player.alt_name_1.clone(),
                fields.alt_name_1.clone(),
            );
            track(
                &mut deltas,
                "alt_name_2",
                player.alt_name_2.clone(),
                fields.alt_name_2.clone(),
            );
            track(
                &mut deltas,
                "country",
                player.country.clone(),
                fields.country.clone(),
            );
            track(
                &mut deltas,
                "region",
                player.region.clone(),
                fields.region.clone(),
            );

            player.display_name = fields.display_name;
            player.battle_tag = fields.battle_tag;
            player.alt_name_1 = fields.alt_name_1;
            player.alt_name_2 = fields.alt_name_2;
            player.country = fields.country;
            player.region = fields.region;
            player.completed_setup = true;
            // Write-once: only the first completed setup stamps the date
            player.completed_setup_date.get_or_insert(now);
            player.updated_at = now;

            Ok::<_, LadderError>((player.clone(), deltas))
        })?;

        self.enqueue(WriteJob::UpsertPlayer(updated));
        for delta in &deltas {
            self.enqueue(WriteJob::ActionLog {
                player_id: id,
                field: delta.field.to_string(),
                old_value: delta.old.clone(),
                new_value: delta.new.clone(),
                at: now,
                source: ActionSource::User,
            });
        }
        Ok(deltas)
    }

    /// Records a ToS decision. The acceptance date is write-once.
    pub fn accept_tos(&self, id: PlayerId, accepted: bool) -> LadderResult<()> {
        let now = Utc::now();
        let updated = self.frames.players.mutate(|players| {
            let player = players.get_mut(&id).ok_or(LadderError::NotFound("player"))?;
            player.accepted_tos = accepted;
            if accepted {
                player.accepted_tos_date.get_or_insert(now);
            }
            player.updated_at = now;
            Ok::<_, LadderError>(player.clone())
        })?;
        self.enqueue(WriteJob::UpsertPlayer(updated));
        Ok(())
    }

    /// One-shot activation
    pub fn activate(&self, id: PlayerId) -> LadderResult<()> {
        let now = Utc::now();
        let updated = self.frames.players.mutate(|players| {
            let player = players.get_mut(&id).ok_or(LadderError::NotFound("player"))?;
            if player.activated {
                return Err(LadderError::State("account is already activated"));
            }
            player.activated = true;
            player.updated_at = now;
            Ok(player.clone())
        })?;
        self.enqueue(WriteJob::UpsertPlayer(updated));
        Ok(())
    }

    pub fn update_country(&self, id: PlayerId, code: &str) -> LadderResult<FieldDelta> {
        let now = Utc::now();
        let (updated, delta) = self.frames.players.mutate(|players| {
            let player = players.get_mut(&id).ok_or(LadderError::NotFound("player"))?;
            let delta = FieldDelta {
                field: "country",
                old: player.country.clone(),
                new: Some(code.to_string()),
            };
            player.country = Some(code.to_string());
            player.updated_at = now;
            Ok::<_, LadderError>((player.clone(), delta))
        })?;
        self.enqueue(WriteJob::UpsertPlayer(updated));
        self.enqueue(WriteJob::ActionLog {
            player_id: id,
            field: "country".to_string(),
            old_value: delta.old.clone(),
            new_value: delta.new.clone(),
            at: now,
            source: ActionSource::User,
        });
        Ok(delta)
    }

    /// Consumes one abort from the player's monthly quota, resetting
    /// the counter on the first abort of a new calendar month
    pub fn try_consume_abort(&self, id: PlayerId, now: DateTime<Utc>) -> LadderResult<i32> {
        let (updated, reset_from) = self.frames.players.mutate(|players| {
            let player = players.get_mut(&id).ok_or(LadderError::NotFound("player"))?;
            let month = month_index(now);
            let mut reset_from = None;
            if player.abort_month != month {
                reset_from = Some(player.abort_quota);
                player.abort_month = month;
                player.abort_quota = MONTHLY_ABORT_QUOTA;
            }
            if player.abort_quota <= 0 {
                return Err(LadderError::Quota);
            }
            player.abort_quota -= 1;
            player.updated_at = now;
            Ok((player.clone(), reset_from))
        })?;
        if let Some(old_quota) = reset_from {
            self.append_system_action(
                id,
                "abort_quota",
                Some(old_quota.to_string()),
                Some(MONTHLY_ABORT_QUOTA.to_string()),
            );
        }
        let remaining = updated.abort_quota;
        self.enqueue(WriteJob::UpsertPlayer(updated));
        Ok(remaining)
    }

    // ----- ratings -----

    pub fn get_rating(&self, id: PlayerId, race: RaceCode) -> Option<Rating> {
        self.frames.ratings.get(&(id, race))
    }

    pub fn get_ratings_for(&self, id: PlayerId) -> Vec<Rating> {
        let snapshot = self.frames.ratings.snapshot();
        let mut rows: Vec<Rating> = snapshot
            .values()
            .filter(|row| row.player_id == id)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.race);
        rows
    }

    pub fn ratings_snapshot(&self) -> Arc<HashMap<(PlayerId, RaceCode), Rating>> {
        self.frames.ratings.snapshot()
    }

    /// Current MMR for matchmaking purposes: the rating row if one
    /// exists, the initial midpoint otherwise
    pub fn mmr_for(&self, id: PlayerId, race: RaceCode) -> i32 {
        self.get_rating(id, race)
            .map(|row| row.mmr)
            .unwrap_or(INITIAL_MMR)
    }

    /// Fetches the rating row for (player, race), creating it at the
    /// initial MMR when absent. Used by match finalization only.
    pub fn rating_or_default(&self, id: PlayerId, race: RaceCode) -> Rating {
        if let Some(existing) = self.frames.ratings.get(&(id, race)) {
            return existing;
        }
        Rating {
            id: self.next_rating_id.fetch_add(1, Ordering::AcqRel) + 1,
            player_id: id,
            race,
            mmr: INITIAL_MMR,
            games_played: 0,
            games_won: 0,
            games_lost: 0,
            games_drawn: 0,
            last_played: None,
            created_at: Utc::now(),
        }
    }

    /// Authoritative rating write from match finalization
    pub fn upsert_rating(&self, row: Rating) {
        self.frames.ratings.mutate(|ratings| {
            ratings.insert((row.player_id, row.race), row.clone());
        });
        self.enqueue(WriteJob::UpsertRating(row));
    }

    // ----- preferences -----

    pub fn get_preferences(&self, id: PlayerId) -> Option<Preferences> {
        self.frames.preferences.get(&id)
    }

    /// Replaces the player's stored queue choices
    pub fn save_preferences(&self, id: PlayerId, races: &[RaceCode], vetoes: &[String]) {
        let row = Preferences {
            player_id: id,
            // Serializing a Vec of plain enums/strings cannot fail
            races: serde_json::to_string(races).unwrap_or_default(),
            vetoes: serde_json::to_string(vetoes).unwrap_or_default(),
            updated_at: Utc::now(),
        };
        self.frames.preferences.mutate(|preferences| {
            preferences.insert(id, row.clone());
        });
        self.enqueue(WriteJob::SavePreferences(row));
    }

    // ----- matches -----

    pub fn get_match(&self, id: MatchId) -> Option<Match> {
        self.frames.matches.get(&id)
    }

    pub fn matches_snapshot(&self) -> Arc<HashMap<MatchId, Match>> {
        self.frames.matches.snapshot()
    }

    /// The player's current non-terminal match, if any
    pub fn active_match_for(&self, id: PlayerId) -> Option<MatchId> {
        self.frames
            .matches
            .snapshot()
            .values()
            .find(|row| {
                row.status == MatchStatus::Pending && (row.player_1 == id || row.player_2 == id)
            })
            .map(|row| row.id)
    }

    pub fn create_match(
        &self,
        player_1: PlayerId,
        player_2: PlayerId,
        race_1: RaceCode,
        race_2: RaceCode,
        map: String,
        server: String,
    ) -> MatchId {
        let id = self.next_match_id.fetch_add(1, Ordering::AcqRel) + 1;
        let row = Match {
            id,
            player_1,
            player_2,
            player_3: None,
            player_4: None,
            race_1,
            race_2,
            map,
            server,
            replay_1_hash: None,
            replay_1_uploaded_at: None,
            replay_2_hash: None,
            replay_2_uploaded_at: None,
            report_1: None,
            report_2: None,
            status: MatchStatus::Pending,
            delta_1: None,
            delta_2: None,
            played_at: Utc::now(),
        };
        self.frames.matches.mutate(|matches| {
            matches.insert(id, row.clone());
        });
        self.enqueue(WriteJob::CreateMatch(row));
        id
    }

    /// Records a participant's self-reported result on a pending match
    pub fn record_report(
        &self,
        match_id: MatchId,
        player: PlayerId,
        result: ReportedResult,
    ) -> LadderResult<Match> {
        let updated = self.frames.matches.mutate(|matches| {
            let row = matches
                .get_mut(&match_id)
                .ok_or(LadderError::NotFound("match"))?;
            if row.status.is_terminal() {
                return Err(LadderError::State("match is already resolved"));
            }
            if row.player_1 == player {
                row.report_1 = Some(result);
            } else if row.player_2 == player {
                row.report_2 = Some(result);
            } else {
                return Err(LadderError::Validation(
                    "player is not part of this match".to_string(),
                ));
            }
            Ok(row.clone())
        })?;
        self.enqueue(WriteJob::UpdateMatch(updated.clone()));
        Ok(updated)
    }

    /// Attaches an uploaded replay to a pending match. Idempotent per
    /// (match, uploader): a second upload overwrites the reference.
    pub fn record_replay(
        &self,
        match_id: MatchId,
        uploader: PlayerId,
        hash: &str,
    ) -> LadderResult<Match> {
        let now = Utc::now();
        let updated = self.frames.matches.mutate(|matches| {
            let row = matches
                .get_mut(&match_id)
                .ok_or(LadderError::NotFound("match"))?;
            if row.status.is_terminal() {
                return Err(LadderError::State("match is already resolved"));
            }
            if row.player_1 == uploader {
                row.replay_1_hash = Some(hash.to_string());
                row.replay_1_uploaded_at = Some(now);
            } else if row.player_2 == uploader {
                row.replay_2_hash = Some(hash.to_string());
                row.replay_2_uploaded_at = Some(now);
            } else {
                return Err(LadderError::Validation(
                    "player is not part of this match".to_string(),
                ));
            }
            Ok(row.clone())
        })?;
        self.enqueue(WriteJob::UpdateMatch(updated.clone()));
        Ok(updated)
    }

    /// Moves a pending match to a terminal status. Returns [None] when
    /// the match already left pending: late racers are no-ops.
    pub fn finalize_match(
        &self,
        match_id: MatchId,
        status: MatchStatus,
        deltas: Option<(i32, i32)>,
    ) -> Option<Match> {
        let updated = self.frames.matches.mutate(|matches| {
            let row = matches.get_mut(&match_id)?;
            if row.status.is_terminal() {
                return None;
            }
            row.status = status;
            if let Some((delta_1, delta_2)) = deltas {
                row.delta_1 = Some(delta_1);
                row.delta_2 = Some(delta_2);
            }
            Some(row.clone())
        })?;
        self.enqueue(WriteJob::FinalizeMatch(updated.clone()));
        Some(updated)
    }

    // ----- replays -----

    pub fn replay_by_hash(&self, hash: &str) -> Option<Replay> {
        self.frames.replays.get(&hash.to_string())
    }

    /// Matches currently referencing the given replay hash
    pub fn matches_referencing_hash(&self, hash: &str) -> Vec<MatchId> {
        self.frames
            .matches
            .snapshot()
            .values()
            .filter(|row| {
                row.replay_1_hash.as_deref() == Some(hash)
                    || row.replay_2_hash.as_deref() == Some(hash)
            })
            .map(|row| row.id)
            .collect()
    }

    pub fn insert_replay_artifact(&self, row: Replay) {
        self.frames.replays.mutate(|replays| {
            replays.insert(row.hash.clone(), row.clone());
        });
        self.enqueue(WriteJob::UpsertReplay(row));
    }

    // ----- audit -----

    pub fn append_command_audit(&self, player_id: PlayerId, command: &str) {
        self.enqueue(WriteJob::CommandAudit {
            player_id,
            command: command.to_string(),
            at: Utc::now(),
        });
    }

    pub fn append_system_action(
        &self,
        player_id: PlayerId,
        field: &str,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        self.enqueue(WriteJob::ActionLog {
            player_id,
            field: field.to_string(),
            old_value,
            new_value,
            at: Utc::now(),
            source: ActionSource::System,
        });
    }

    // ----- leaderboard invalidation -----

    pub fn invalidate_leaderboard(&self) {
        self.invalidation.raise();
    }

    pub fn invalidation_signal(&self) -> InvalidationSignal {
        self.invalidation.clone()
    }

    // ----- shutdown -----

    /// Drains the write queue, waiting until the worker has applied
    /// everything submitted before this call or the timeout elapses
    pub async fn shutdown(&self, timeout: Duration) {
        let (tx, rx) = oneshot::channel();
        if self.writer_tx.send(WriteJob::Shutdown(tx)).is_err() {
            return;
        }
        if tokio::time::timeout(timeout, rx).await.is_err() {
            error!("write queue did not drain before shutdown timeout");
        }
    }
}

impl Frames {
    /// Insert-if-absent for the player frame, returning the winning row
    fn insert_player_if_absent(&self, row: Player) -> Player {
        self.players.mutate(|players| {
            players.entry(row.id).or_insert(row).clone()
        })
    }
}

fn track(
    deltas: &mut Vec<FieldDelta>,
    field: &'static str,
    old: Option<String>,
    new: Option<String>,
) {
    if old != new {
        deltas.push(FieldDelta { field, old, new });
    }
}

/// Months since year zero, used as the abort-quota reset marker
fn month_index(now: DateTime<Utc>) -> i32 {
    now.year() * 12 + now.month0() as i32
}

fn upstream(err: sea_orm::DbErr) -> LadderError {
    LadderError::Upstream(err.to_string())
}
