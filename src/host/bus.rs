//! In-process document event bus.
//!
//! Delivery is synchronous: [`EventBus::publish`] calls every subscriber on
//! the publishing thread, in subscription order, and hands back what each of
//! them returned. A failing subscriber does not stop delivery to the rest.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::{DocumentEvent, DocumentEventHandler, DocumentEvents};
use crate::error::Result;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscribers = Vec<(SubscriptionId, Arc<dyn DocumentEventHandler>)>;

/// Multi-subscriber bus for [`DocumentEvent`]s.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Subscribers>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every subscriber.
    pub fn publish(&self, event: &DocumentEvent) -> Vec<Result<()>> {
        // Snapshot so handlers may subscribe or unsubscribe re-entrantly.
        let handlers: Vec<_> = self
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        tracing::debug!("Publishing {:?} to {} subscriber(s)", event, handlers.len());
        handlers.iter().map(|h| h.handle(event)).collect()
    }

    /// Remove a subscriber. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|(sub, _)| *sub != id);
        subscribers.len() != before
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Subscribers> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DocumentEvents for EventBus {
    fn subscribe(&self, handler: Arc<dyn DocumentEventHandler>) -> Result<SubscriptionId> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, handler));
        Ok(id)
    }
}
