//! Subscriber registry for keyboard events

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::keys::KeyboardEvent;
use crate::callback::shield;

/// Receiver of keyboard events, called on the hook thread
pub type KeyEventHandler = Arc<dyn Fn(&KeyboardEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Fans every event out to all subscribers, synchronously and in order
#[derive(Default)]
pub struct KeyEventDispatcher {
    subscribers: RwLock<Vec<(SubscriptionId, KeyEventHandler)>>,
    next_id: AtomicU64,
    faults: AtomicU64,
}

impl KeyEventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: KeyEventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, handler));
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sub, _)| *sub != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Deliver `event` to every subscriber before returning.
    ///
    /// A failing subscriber is shielded and does not stop delivery to the
    /// ones after it.
    pub fn dispatch(&self, event: KeyboardEvent) {
        // Snapshot so handlers may (un)subscribe without deadlocking
        let handlers: Vec<KeyEventHandler> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in handlers {
            let delivered = shield("keyboard subscriber", || {
                handler(&event);
                Ok(())
            });
            if delivered.is_err() {
                self.faults.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Subscriber invocations that panicked
    pub fn fault_count(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }
}
