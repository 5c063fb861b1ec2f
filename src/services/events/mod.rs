//! Single-process publish/subscribe fabric for match lifecycle events.
//! Each subscription owns a bounded ring of 16 events: a publisher
//! never blocks on a slow consumer, the oldest event is dropped instead
//! and the subscription's lag counter ticks up. Per-match ordering is
//! guaranteed because a single publisher serializes under the list
//! lock; nothing is guaranteed across matches.

use crate::database::entities::{MatchStatus, RaceCode, ReportedResult};
use crate::utils::types::{MatchId, PlayerId};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Maximum events a subscription queues before dropping the oldest
const SUBSCRIBER_CAPACITY: usize = 16;

/// What happened to a match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    MatchFound {
        player_1: PlayerId,
        player_2: PlayerId,
        race_1: RaceCode,
        race_2: RaceCode,
        map: String,
        server: String,
    },
    ReplayUploaded {
        player: PlayerId,
    },
    ResultReported {
        player: PlayerId,
        result: ReportedResult,
    },
    Completed {
        status: MatchStatus,
        delta_1: i32,
        delta_2: i32,
    },
    Conflicted,
    Aborted {
        by: PlayerId,
    },
    TimedOut,
}

/// A delivered event. `lag` is the number of events this subscription
/// has dropped so far, so views can tell when they missed something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEvent {
    pub match_id: MatchId,
    pub kind: EventKind,
    pub lag: u64,
}

/// Which events a subscription wants: both fields must match when set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub match_id: Option<MatchId>,
    pub participant: Option<PlayerId>,
}

impl EventFilter {
    pub fn for_match(match_id: MatchId) -> Self {
        Self {
            match_id: Some(match_id),
            participant: None,
        }
    }

    pub fn for_participant(match_id: MatchId, participant: PlayerId) -> Self {
        Self {
            match_id: Some(match_id),
            participant: Some(participant),
        }
    }

    fn accepts(&self, event: &MatchEvent) -> bool {
        if let Some(match_id) = self.match_id {
            if event.match_id != match_id {
                return false;
            }
        }
        if let Some(participant) = self.participant {
            if !event_involves(&event.kind, participant) {
                return false;
            }
        }
        true
    }
}

/// Whether the event is addressed to the given participant. Events
/// without an explicit addressee are delivered to every participant
/// subscription on the match.
fn event_involves(kind: &EventKind, participant: PlayerId) -> bool {
    match kind {
        EventKind::MatchFound {
            player_1, player_2, ..
        } => *player_1 == participant || *player_2 == participant,
        _ => true,
    }
}

struct SubscriberState {
    filter: EventFilter,
    queue: Mutex<VecDeque<MatchEvent>>,
    lag: AtomicU64,
    notify: Notify,
    closed: AtomicBool,
}

/// The notification bus. Cheap to share; publishers and subscribers
/// hold the same [Arc].
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Arc<SubscriberState>>>,
}

impl EventBus {
    /// Registers a subscription for events matching `filter`
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let state = Arc::new(SubscriberState {
            filter,
            queue: Mutex::new(VecDeque::with_capacity(SUBSCRIBER_CAPACITY)),
            lag: AtomicU64::new(0),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        });
        self.subscribers.lock().push(state.clone());
        Subscription { state }
    }

    /// Delivers `event` to every live matching subscription. Dead
    /// subscriptions are pruned on the way through.
    pub fn publish(&self, event: MatchEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|state| !state.closed.load(Ordering::Acquire));

        for state in subscribers.iter() {
            if !state.filter.accepts(&event) {
                continue;
            }

            {
                let mut queue = state.queue.lock();
                if queue.len() == SUBSCRIBER_CAPACITY {
                    queue.pop_front();
                    state.lag.fetch_add(1, Ordering::AcqRel);
                }
                queue.push_back(event.clone());
            }
            state.notify.notify_one();
        }
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

/// A live subscription handle. Dropping it cancels the subscription.
pub struct Subscription {
    state: Arc<SubscriberState>,
}

impl Subscription {
    /// Pops the next queued event without waiting. The delivered event
    /// carries the subscription's drop count at delivery time.
    pub fn try_recv(&self) -> Option<MatchEvent> {
        let mut event = self.state.queue.lock().pop_front()?;
        event.lag = self.state.lag.load(Ordering::Acquire);
        Some(event)
    }

    /// Waits for the next event. Cancellation safe: dropping the
    /// future loses nothing, events stay queued.
    pub async fn recv(&self) -> MatchEvent {
        loop {
            if let Some(event) = self.try_recv() {
                return event;
            }
            self.state.notify.notified().await;
        }
    }

    /// Total events dropped on this subscription so far
    pub fn lag(&self) -> u64 {
        self.state.lag.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.state.closed.store(true, Ordering::Release);
    }
}
