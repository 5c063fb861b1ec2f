//! Module for leaderboard related logic. Holds the materialized ranked
//! view and keeps it fresh from two directions: a periodic background
//! refresh and an invalidation flag raised by match finalization that
//! forces a refresh on the next read.

use crate::services::data::{DataLayer, InvalidationSignal};
use crate::utils::types::PlayerId;
use log::{debug, error};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub mod models;

use models::{build_snapshot, LeaderboardSnapshot, Page, QueryFilters};

pub struct Leaderboard {
    data: Arc<DataLayer>,
    snapshot: RwLock<Arc<LeaderboardSnapshot>>,
    invalidation: InvalidationSignal,
    /// Shared CPU-offload pool; rank recomputation borrows one permit
    workers: Arc<Semaphore>,
}

impl Leaderboard {
    pub fn new(data: Arc<DataLayer>, workers: Arc<Semaphore>) -> Self {
        let invalidation = data.invalidation_signal();
        // Force the first read to materialize the view
        invalidation.raise();
        Self {
            data,
            snapshot: RwLock::new(Arc::new(LeaderboardSnapshot::empty())),
            invalidation,
            workers,
        }
    }

    /// The current materialized view without refreshing
    pub fn current(&self) -> Arc<LeaderboardSnapshot> {
        self.snapshot.read().clone()
    }

    /// Runs a query, refreshing first if an invalidation is pending
    pub async fn query(&self, filters: &QueryFilters, page: usize, page_size: usize) -> Page {
        if self.invalidation.take() {
            self.refresh().await;
        }
        self.current().query(filters, page, page_size)
    }

    /// Rank of a player's best race row, for profile views
    pub async fn rank_of(&self, player: PlayerId) -> Option<u32> {
        let page = self
            .query(
                &QueryFilters {
                    best_race_only: true,
                    ..Default::default()
                },
                1,
                models::MAX_PAGE_SIZE,
            )
            .await;
        page.rows
            .iter()
            .find(|row| row.player_id == player)
            .map(|row| row.rank)
    }

    /// Rebuilds the snapshot and swaps it in. The rank pass runs on
    /// the worker pool; when no permit can be had (the pool is closed
    /// during shutdown) it falls back to building inline.
    pub async fn refresh(&self) {
        let players = self.data.players_snapshot();
        let ratings = self.data.ratings_snapshot();

        let built = match self.workers.clone().acquire_owned().await {
            Ok(permit) => {
                let handle = tokio::task::spawn_blocking(move || {
                    let snapshot = build_snapshot(&players, &ratings);
                    drop(permit);
                    snapshot
                });
                match handle.await {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        error!("leaderboard refresh worker panicked: {err}");
                        return;
                    }
                }
            }
            Err(_) => {
                // Inline fallback keeps the view usable without a pool
                build_snapshot(&self.data.players_snapshot(), &self.data.ratings_snapshot())
            }
        };

        debug!("leaderboard refreshed ({} ranked rows)", built.ranked_len());
        *self.snapshot.write() = Arc::new(built);
    }

    /// Scheduled refresh loop
    pub async fn run(self: Arc<Self>, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval.tick().await;
        loop {
            interval.tick().await;
            self.invalidation.take();
            self.refresh().await;
        }
    }
}
