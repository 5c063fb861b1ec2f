//! Live matchmaking queue and the wave scheduler that drains it. A
//! single exclusive lock guards the queue map; the scheduling loop
//! takes it only to snapshot and to remove the winners, so joining and
//! leaving stay instant between ticks. A pairing chosen by a running
//! wave stands even if the player left mid-wave.

use crate::catalog::{Catalog, RegionCode};
use crate::database::entities::RaceCode;
use crate::errors::{LadderError, LadderResult};
use crate::services::data::DataLayer;
use crate::services::events::{EventBus, EventKind, MatchEvent};
use crate::utils::hashing::IntHashMap;
use crate::utils::types::{MatchId, Mmr, PlayerId};
use log::{debug, error, info};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub mod wave;

use wave::{pair_wave, Pairing, WaveEntry};

/// Maximum maps a player may veto per queue entry
pub const MAX_VETOES: usize = 3;

/// Entry into the matchmaking queue
#[derive(Debug, Clone)]
struct QueueEntry {
    /// Selected races with the MMR held in each at queue time
    races: Vec<(RaceCode, Mmr)>,
    vetoes: Vec<String>,
    region: RegionCode,
    /// Waves endured without being paired
    wait_cycles: u32,
}

pub struct Matchmaking {
    /// The live queue, keyed by participant
    queue: Mutex<IntHashMap<PlayerId, QueueEntry>>,
    data: Arc<DataLayer>,
    catalog: Arc<Catalog>,
    bus: Arc<EventBus>,
}

impl Matchmaking {
    pub fn new(data: Arc<DataLayer>, catalog: Arc<Catalog>, bus: Arc<EventBus>) -> Self {
        Self {
            queue: Mutex::new(IntHashMap::default()),
            data,
            catalog,
            bus,
        }
    }

    /// Adds a player to the queue with their race selection and map
    /// vetoes, replacing their stored preferences
    pub fn join(
        &self,
        player: PlayerId,
        races: Vec<RaceCode>,
        vetoes: Vec<String>,
    ) -> LadderResult<()> {
        if races.is_empty() || races.len() > 2 {
            return Err(LadderError::Validation(
                "select one or two races to queue".to_string(),
            ));
        }
        if races.len() == 2 && races[0] == races[1] {
            return Err(LadderError::Validation(
                "selected races must be distinct".to_string(),
            ));
        }
        if vetoes.len() > MAX_VETOES {
            return Err(LadderError::Validation(format!(
                "at most {MAX_VETOES} map vetoes are allowed"
            )));
        }
        for veto in &vetoes {
            if !self.catalog.is_known_map(veto) {
                return Err(LadderError::Validation(format!(
                    "{veto:?} is not in the active map pool"
                )));
            }
        }

        let profile = self
            .data
            .get_player(player)
            .ok_or(LadderError::NotFound("player"))?;
        let region = profile
            .region
            .as_deref()
            .and_then(|code| RegionCode::from_str(code).ok())
            .ok_or_else(|| {
                LadderError::Validation("set a residential region before queueing".to_string())
            })?;

        if self.data.active_match_for(player).is_some() {
            return Err(LadderError::State("finish your current match first"));
        }

        let entry = QueueEntry {
            races: races
                .iter()
                .map(|race| (*race, self.data.mmr_for(player, *race)))
                .collect(),
            vetoes: vetoes.clone(),
            region,
            wait_cycles: 0,
        };

        {
            let mut queue = self.queue.lock();
            if queue.contains_key(&player) {
                return Err(LadderError::State("already in the matchmaking queue"));
            }
            queue.insert(player, entry);
        }

        self.data.save_preferences(player, &races, &vetoes);
        debug!("player {player} entered the queue");
        Ok(())
    }

    /// Removes the player from the queue. Returns whether an entry was
    /// removed; a pairing chosen by a wave already in flight stands.
    pub fn leave(&self, player: PlayerId) -> bool {
        let removed = self.queue.lock().remove(&player).is_some();
        if removed {
            debug!("player {player} left the queue");
        }
        removed
    }

    pub fn queued(&self, player: PlayerId) -> bool {
        self.queue.lock().contains_key(&player)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Runs one wave: snapshot, pair, create matches, publish, then
    /// remove the winners and age everyone else
    pub fn tick(&self) -> Vec<MatchId> {
        let snapshot: Vec<WaveEntry> = {
            let queue = self.queue.lock();
            queue
                .iter()
                .map(|(player, entry)| WaveEntry {
                    player: *player,
                    races: entry.races.clone(),
                    vetoes: entry.vetoes.clone(),
                    region: entry.region,
                    wait_cycles: entry.wait_cycles,
                })
                .collect()
        };

        if snapshot.len() < 2 {
            self.age_unpaired(&snapshot, &[]);
            return Vec::new();
        }

        let pairings = pair_wave(&snapshot, &self.catalog);
        let mut created = Vec::with_capacity(pairings.len());

        for pairing in &pairings {
            // One bad pairing must not poison the rest of the wave
            match self.launch(pairing, &snapshot) {
                Ok(match_id) => created.push(match_id),
                Err(err) => {
                    error!(
                        "failed to launch match for ({}, {}): {err}",
                        pairing.player_a, pairing.player_b
                    );
                }
            }
        }

        self.age_unpaired(&snapshot, &pairings);

        if !created.is_empty() {
            info!("wave paired {} match(es)", created.len());
        }
        created
    }

    /// Creates the match row and announces it to both participants.
    /// Works entirely from the wave snapshot: a player who left after
    /// the snapshot was taken is still held to the pairing.
    fn launch(&self, pairing: &Pairing, snapshot: &[WaveEntry]) -> LadderResult<MatchId> {
        let entry_a = snapshot_entry(snapshot, pairing.player_a)?;
        let entry_b = snapshot_entry(snapshot, pairing.player_b)?;

        let map = self.pick_map(&entry_a.vetoes, &entry_b.vetoes)?;
        let server = self.catalog.server_for(entry_a.region, entry_b.region);

        let match_id = self.data.create_match(
            pairing.player_a,
            pairing.player_b,
            pairing.race,
            pairing.race,
            map.clone(),
            server.clone(),
        );

        self.bus.publish(MatchEvent {
            match_id,
            kind: EventKind::MatchFound {
                player_1: pairing.player_a,
                player_2: pairing.player_b,
                race_1: pairing.race,
                race_2: pairing.race,
                map,
                server,
            },
            lag: 0,
        });

        Ok(match_id)
    }

    /// Active pool minus the union of both veto sets, uniformly random;
    /// the full pool when the vetoes cancel everything out
    fn pick_map(&self, vetoes_a: &[String], vetoes_b: &[String]) -> LadderResult<String> {
        let pool = self.catalog.map_pool();
        let remaining: Vec<&String> = pool
            .iter()
            .filter(|&map| !vetoes_a.contains(map) && !vetoes_b.contains(map))
            .collect();

        let mut rng = rand::thread_rng();
        let picked = if remaining.is_empty() {
            pool.choose(&mut rng)
        } else {
            remaining.choose(&mut rng).copied()
        };
        picked
            .cloned()
            .ok_or(LadderError::State("active map pool is empty"))
    }

    /// Removes paired entries and increments the wait counter of every
    /// snapshot entry that went unpaired and is still queued
    fn age_unpaired(&self, snapshot: &[WaveEntry], pairings: &[Pairing]) {
        let mut queue = self.queue.lock();
        for entry in snapshot {
            let paired = pairings
                .iter()
                .any(|p| p.player_a == entry.player || p.player_b == entry.player);
            if paired {
                queue.remove(&entry.player);
            } else if let Some(live) = queue.get_mut(&entry.player) {
                live.wait_cycles += 1;
            }
        }
    }

    /// Scheduling loop: one wave per period until the process exits
    pub async fn run(self: Arc<Self>, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so a fresh
        // queue gets a full wave period to fill
        interval.tick().await;
        loop {
            interval.tick().await;
            self.tick();
        }
    }
}

fn snapshot_entry(snapshot: &[WaveEntry], player: PlayerId) -> LadderResult<&WaveEntry> {
    snapshot
        .iter()
        .find(|entry| entry.player == player)
        .ok_or(LadderError::NotFound("queue entry"))
}
