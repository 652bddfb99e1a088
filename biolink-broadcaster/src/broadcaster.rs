use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::events::{BroadcastEvent, DaemonState};

/// One subscriber's end of the fan-out: an id plus its private backlog
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    rx: UnboundedReceiver<BroadcastEvent>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next event; None once unsubscribed or the broadcaster is gone
    pub async fn recv(&mut self) -> Option<BroadcastEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is already queued
    pub fn try_recv(&mut self) -> Option<BroadcastEvent> {
        self.rx.try_recv().ok()
    }
}

/// Registry of subscriber backlogs
///
/// `publish` clones the event onto every registered backlog without waiting
/// on any consumer. The registry lock is only held while enqueueing.
pub struct EventBroadcaster {
    subscribers: Mutex<HashMap<u64, UnboundedSender<BroadcastEvent>>>,
    next_id: AtomicU64,
    last_state: Mutex<DaemonState>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            last_state: Mutex::new(DaemonState::Idle),
        }
    }

    /// Register a new subscriber with an empty backlog
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        let mut subscribers = self.subscribers.lock();
        subscribers.insert(id, tx);
        tracing::info!("Subscriber {} registered. Total: {}", id, subscribers.len());

        Subscription { id, rx }
    }

    /// Deregister a subscriber and discard its undelivered backlog
    pub fn unsubscribe(&self, subscription: Subscription) {
        let mut subscribers = self.subscribers.lock();
        if subscribers.remove(&subscription.id).is_some() {
            tracing::info!(
                "Subscriber {} removed. Remaining: {}",
                subscription.id,
                subscribers.len()
            );
        }
    }

    /// Enqueue `event` for every subscriber, returning how many received it
    ///
    /// Backlogs whose receiver was dropped without `unsubscribe` are pruned.
    pub fn publish(&self, event: BroadcastEvent) -> usize {
        let mut subscribers = self.subscribers.lock();

        subscribers.retain(|id, tx| {
            let delivered = tx.send(event.clone()).is_ok();
            if !delivered {
                tracing::debug!("Pruning closed subscriber {}", id);
            }
            delivered
        });

        subscribers.len()
    }

    /// Record and publish a daemon state change
    pub fn broadcast_state_change(&self, state: DaemonState) {
        *self.last_state.lock() = state;
        self.publish(BroadcastEvent::state_change(state));
    }

    /// State sent to newly connected clients
    pub fn current_state(&self) -> DaemonState {
        *self.last_state.lock()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
