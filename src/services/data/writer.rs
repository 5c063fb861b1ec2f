//! Background worker draining the write queue into the durable store.
//! The in-memory mirror was already updated when the job was enqueued,
//! so this side only has to persist. Analytics-grade failures land in
//! the failed-writes log; authoritative jobs are retried and escalate
//! by flagging the match conflicted.

use super::Frames;
use crate::database::entities::{
    ActionLog, ActionSource, CommandAudit, Match, MatchStatus, Player, Preferences, Rating, Replay,
};
use crate::database::DbResult;
use crate::utils::types::PlayerId;
use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};

/// Retry attempts for authoritative writes
const AUTHORITATIVE_ATTEMPTS: u32 = 3;
/// Base backoff doubled per retry
const BACKOFF_BASE: Duration = Duration::from_millis(100);

/// A queued durable mutation. Submitting one returns immediately; the
/// worker applies it in FIFO order.
#[derive(Serialize)]
pub enum WriteJob {
    UpsertPlayer(Player),
    SavePreferences(Preferences),
    CreateMatch(Match),
    UpdateMatch(Match),
    /// Authoritative: terminal match write
    FinalizeMatch(Match),
    /// Authoritative: rating update from finalization
    UpsertRating(Rating),
    UpsertReplay(Replay),
    ActionLog {
        player_id: PlayerId,
        field: String,
        old_value: Option<String>,
        new_value: Option<String>,
        at: DateTime<Utc>,
        source: ActionSource,
    },
    CommandAudit {
        player_id: PlayerId,
        command: String,
        at: DateTime<Utc>,
    },
    /// Drain marker: everything enqueued before it has been applied
    /// once the acknowledgement fires
    #[serde(skip)]
    Shutdown(oneshot::Sender<()>),
}

impl WriteJob {
    fn is_authoritative(&self) -> bool {
        matches!(self, WriteJob::FinalizeMatch(_) | WriteJob::UpsertRating(_))
    }

    fn describe(&self) -> &'static str {
        match self {
            WriteJob::UpsertPlayer(_) => "upsert_player",
            WriteJob::SavePreferences(_) => "save_preferences",
            WriteJob::CreateMatch(_) => "create_match",
            WriteJob::UpdateMatch(_) => "update_match",
            WriteJob::FinalizeMatch(_) => "finalize_match",
            WriteJob::UpsertRating(_) => "upsert_rating",
            WriteJob::UpsertReplay(_) => "upsert_replay",
            WriteJob::ActionLog { .. } => "action_log",
            WriteJob::CommandAudit { .. } => "command_audit",
            WriteJob::Shutdown(_) => "shutdown",
        }
    }
}

pub async fn run(
    db: DatabaseConnection,
    mut rx: mpsc::UnboundedReceiver<WriteJob>,
    frames: Arc<Frames>,
    failed_log: PathBuf,
) {
    while let Some(job) = rx.recv().await {
        if let WriteJob::Shutdown(ack) = job {
            debug!("write queue drained");
            _ = ack.send(());
            continue;
        }

        if job.is_authoritative() {
            apply_authoritative(&db, &frames, &failed_log, job).await;
        } else if let Err(err) = apply(&db, &job).await {
            warn!("durable write {} failed: {err}", job.describe());
            append_failed(&failed_log, &job).await;
        }
    }
}

/// Applies an authoritative job with retries; on final failure the
/// match involved is flagged conflicted so it surfaces for review
async fn apply_authoritative(
    db: &DatabaseConnection,
    frames: &Frames,
    failed_log: &PathBuf,
    job: WriteJob,
) {
    let mut backoff = BACKOFF_BASE;
    for attempt in 1..=AUTHORITATIVE_ATTEMPTS {
        match apply(db, &job).await {
            Ok(()) => return,
            Err(err) if attempt < AUTHORITATIVE_ATTEMPTS => {
                warn!(
                    "authoritative write {} failed (attempt {attempt}): {err}",
                    job.describe()
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            Err(err) => {
                error!(
                    "authoritative write {} failed after {AUTHORITATIVE_ATTEMPTS} attempts, \
                     flagging match conflicted: {err}",
                    job.describe()
                );
                if let WriteJob::FinalizeMatch(row) = &job {
                    let id = row.id;
                    frames.matches.mutate(|matches| {
                        if let Some(row) = matches.get_mut(&id) {
                            row.status = MatchStatus::Conflict;
                        }
                    });
                }
                append_failed(failed_log, &job).await;
            }
        }
    }
}

async fn apply(db: &DatabaseConnection, job: &WriteJob) -> DbResult<()> {
    match job {
        WriteJob::UpsertPlayer(row) => Player::upsert(db, row.clone()).await,
        WriteJob::SavePreferences(row) => Preferences::upsert(db, row.clone()).await,
        WriteJob::CreateMatch(row) => Match::create(db, row.clone()).await.map(|_| ()),
        WriteJob::UpdateMatch(row) | WriteJob::FinalizeMatch(row) => {
            Match::update_row(db, row.clone()).await
        }
        WriteJob::UpsertRating(row) => Rating::upsert(db, row.clone()).await,
        WriteJob::UpsertReplay(row) => Replay::upsert(db, row.clone()).await,
        WriteJob::ActionLog {
            player_id,
            field,
            old_value,
            new_value,
            at,
            source,
        } => ActionLog::append(
            db,
            *player_id,
            field.clone(),
            old_value.clone(),
            new_value.clone(),
            *at,
            *source,
        )
        .await
        .map(|_| ()),
        WriteJob::CommandAudit {
            player_id,
            command,
            at,
        } => CommandAudit::append(db, *player_id, command.clone(), *at)
            .await
            .map(|_| ()),
        WriteJob::Shutdown(_) => Ok(()),
    }
}

#[derive(Serialize)]
struct FailedWrite<'a> {
    at: String,
    job: &'a WriteJob,
}

/// Appends the lost job as a JSON line for later reconciliation. The
/// mirror is not rolled back: availability wins for analytics rows.
async fn append_failed(path: &PathBuf, job: &WriteJob) {
    let entry = FailedWrite {
        at: Utc::now().to_rfc3339(),
        job,
    };
    let line = match serde_json::to_string(&entry) {
        Ok(mut body) => {
            body.push('\n');
            body
        }
        Err(err) => {
            error!("failed to serialize lost write job: {err}");
            return;
        }
    };

    let result = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await;

    match result {
        Ok(mut file) => {
            if let Err(err) = file.write_all(line.as_bytes()).await {
                error!("failed to append to failed-writes log: {err}");
            }
        }
        Err(err) => error!("failed to open failed-writes log: {err}"),
    }
}
