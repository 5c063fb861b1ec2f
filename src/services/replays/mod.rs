//! Replay ingestion pipeline: validate, hash, dedupe, parse on the
//! worker pool, store, record. Parsing the binary itself is an opaque
//! collaborator behind [ReplayParser]; the shipped implementation only
//! sniffs the archive header.

use crate::database::entities::Replay;
use crate::errors::{LadderError, LadderResult};
use crate::services::data::DataLayer;
use crate::services::events::{EventBus, EventKind, MatchEvent};
use crate::services::lifecycle::Lifecycle;
use crate::services::storage::ObjectStore;
use crate::utils::hashing::content_hash;
use crate::utils::types::{MatchId, PlayerId};
use bytes::Bytes;
use chrono::Utc;
use log::{debug, warn};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

/// Replays above this size are rejected before hashing
pub const MAX_REPLAY_SIZE: usize = 10 * 1024 * 1024;

/// Required file extension, compared case-insensitively
pub const REPLAY_EXTENSION: &str = "SC2Replay";

/// Metadata the parser extracts from a replay blob
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReplay {
    pub duration_secs: Option<i32>,
    pub map_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("file is not a valid replay archive")]
    InvalidFormat,
}

/// Opaque replay parser collaborator. Parsing is CPU-bound, so
/// implementations are called from the worker pool with an owned blob.
pub trait ReplayParser: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedReplay, ParseError>;
}

/// Minimal parser: validates the MPQ archive magic and extracts
/// nothing else. Deployments wire a real parser in its place.
pub struct MpqHeaderParser;

impl ReplayParser for MpqHeaderParser {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedReplay, ParseError> {
        // "MPQ" then either the archive (0x1a) or user-data (0x1b)
        // header marker
        let valid = bytes.len() > 4
            && &bytes[0..3] == b"MPQ"
            && (bytes[3] == 0x1a || bytes[3] == 0x1b);
        if !valid {
            return Err(ParseError::InvalidFormat);
        }
        Ok(ParsedReplay::default())
    }
}

pub struct Replays {
    data: Arc<DataLayer>,
    bus: Arc<EventBus>,
    lifecycle: Arc<Lifecycle>,
    store: ObjectStore,
    parser: Arc<dyn ReplayParser>,
    /// Shared CPU-offload pool; each parse borrows one permit
    workers: Arc<Semaphore>,
}

impl Replays {
    pub fn new(
        data: Arc<DataLayer>,
        bus: Arc<EventBus>,
        lifecycle: Arc<Lifecycle>,
        store: ObjectStore,
        parser: Arc<dyn ReplayParser>,
        workers: Arc<Semaphore>,
    ) -> Self {
        Self {
            data,
            bus,
            lifecycle,
            store,
            parser,
            workers,
        }
    }

    /// Ingests a replay uploaded by a participant of `match_id`
    pub async fn ingest(
        &self,
        match_id: MatchId,
        uploader: PlayerId,
        file_name: &str,
        bytes: Bytes,
    ) -> LadderResult<Replay> {
        validate_upload(file_name, bytes.len())?;

        let row = self
            .data
            .get_match(match_id)
            .ok_or(LadderError::NotFound("match"))?;
        if row.player_1 != uploader && row.player_2 != uploader {
            return Err(LadderError::Validation(
                "player is not part of this match".to_string(),
            ));
        }
        if row.status.is_terminal() {
            return Err(LadderError::State("match is already resolved"));
        }

        // Hash in the calling task; cheap next to parsing
        let hash = content_hash(&bytes);

        // The same content surfacing outside this match is a cheating
        // signal: flag this match and store nothing. Re-uploads within
        // the match (either participant) are legitimate.
        let known_here = row.replay_1_hash.as_deref() == Some(hash.as_str())
            || row.replay_2_hash.as_deref() == Some(hash.as_str());
        if self.data.replay_by_hash(&hash).is_some() && !known_here {
            warn!("replay hash {hash} resubmitted on match {match_id}");
            self.lifecycle.flag_conflict(match_id).await?;
            return Err(LadderError::Conflict(
                "this replay was already submitted for another match".to_string(),
            ));
        }

        let parsed = self.parse_offloaded(bytes.clone()).await?;

        let key = object_key(match_id, uploader, file_name);
        let pointer = self.store.store(&key, bytes).await?;

        let artifact = Replay {
            hash: hash.clone(),
            uploaded_at: Utc::now(),
            uploader_id: uploader,
            duration_secs: parsed.duration_secs,
            map_name: parsed.map_name,
            pointer,
        };
        self.data.insert_replay_artifact(artifact.clone());
        self.data.record_replay(match_id, uploader, &hash)?;

        debug!("replay {hash} recorded for match {match_id}");
        self.bus.publish(MatchEvent {
            match_id,
            kind: EventKind::ReplayUploaded { player: uploader },
            lag: 0,
        });

        Ok(artifact)
    }

    /// Runs the parser on the worker pool with an owned copy of the blob
    async fn parse_offloaded(&self, bytes: Bytes) -> LadderResult<ParsedReplay> {
        let permit = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| LadderError::Cancelled)?;
        let parser = self.parser.clone();

        let handle = tokio::task::spawn_blocking(move || {
            let result = parser.parse(&bytes);
            drop(permit);
            result
        });

        handle
            .await
            .map_err(|_| LadderError::Cancelled)?
            .map_err(|err| LadderError::Validation(err.to_string()))
    }
}

/// Extension and size rules shared by every upload path
fn validate_upload(file_name: &str, size: usize) -> LadderResult<()> {
    let extension = file_name.rsplit_once('.').map(|(_, ext)| ext);
    if !extension.is_some_and(|ext| ext.eq_ignore_ascii_case(REPLAY_EXTENSION)) {
        return Err(LadderError::Validation(format!(
            "replay files must end in .{REPLAY_EXTENSION}"
        )));
    }
    if size > MAX_REPLAY_SIZE {
        return Err(LadderError::Validation(
            "replay file exceeds the 10 MiB limit".to_string(),
        ));
    }
    Ok(())
}

fn object_key(match_id: MatchId, uploader: PlayerId, file_name: &str) -> String {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or(REPLAY_EXTENSION);
    format!("{match_id}/player_{uploader}.{extension}")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_extension_rules() {
        assert!(validate_upload("game.SC2Replay", 100).is_ok());
        assert!(validate_upload("game.sc2replay", 100).is_ok());
        assert!(validate_upload("archive.zip", 100).is_err());
        assert!(validate_upload("SC2Replay", 100).is_err());
    }

    #[test]
    fn test_size_limit() {
        assert!(validate_upload("game.SC2Replay", MAX_REPLAY_SIZE).is_ok());
        assert!(validate_upload("game.SC2Replay", MAX_REPLAY_SIZE + 1).is_err());
    }

    #[test]
    fn test_object_key() {
        assert_eq!(
            object_key(101, 42, "game.SC2Replay"),
            "101/player_42.SC2Replay"
        );
    }

    /// The header parser accepts both MPQ marker variants and nothing else
    #[test]
    fn test_mpq_header_parser() {
        let parser = MpqHeaderParser;
        assert!(parser.parse(b"MPQ\x1bmore-bytes").is_ok());
        assert!(parser.parse(b"MPQ\x1amore-bytes").is_ok());
        assert_eq!(parser.parse(b"PK\x03\x04zip"), Err(ParseError::InvalidFormat));
        assert_eq!(parser.parse(b"MPQ"), Err(ParseError::InvalidFormat));
    }
}
