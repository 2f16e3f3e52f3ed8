//! Topic-based event bus.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

use super::types::{CombatEvent, Topic};

/// Topic-based event bus.
///
/// Consumers subscribe to specific topics and only receive events they
/// care about. Delivery is best-effort: with no subscribers (or a lagging
/// one) events are dropped, never buffered unboundedly.
pub struct EventBus {
    channels: Arc<RwLock<HashMap<Topic, broadcast::Sender<CombatEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Event bus with the given per-topic channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut channels = HashMap::new();
        channels.insert(Topic::Lifecycle, broadcast::channel(capacity).0);
        channels.insert(Topic::Round, broadcast::channel(capacity).0);
        channels.insert(Topic::Defeat, broadcast::channel(capacity).0);

        Self {
            channels: Arc::new(RwLock::new(channels)),
        }
    }

    /// Publish an event to its topic.
    pub fn publish(&self, event: CombatEvent) {
        let topic = event.topic();

        // try_read keeps this callable from sync and async contexts alike;
        // under contention the event is skipped, not blocked on.
        match self.channels.try_read() {
            Ok(channels) => {
                if let Some(tx) = channels.get(&topic)
                    && tx.send(event).is_err()
                {
                    // No subscribers for this topic, which is normal.
                    tracing::trace!(?topic, "no subscribers");
                }
            }
            Err(_) => {
                tracing::debug!(?topic, "event bus contended, event skipped");
            }
        }
    }

    /// Subscribe to a single topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<CombatEvent> {
        let channels = self
            .channels
            .try_read()
            .expect("event channels read lock unavailable");
        channels
            .get(&topic)
            .expect("topic channel not initialized")
            .subscribe()
    }

    /// Subscribe to several topics at once.
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<CombatEvent>> {
        let channels = self
            .channels
            .try_read()
            .expect("event channels read lock unavailable");
        topics
            .iter()
            .map(|&topic| {
                let rx = channels
                    .get(&topic)
                    .expect("topic channel not initialized")
                    .subscribe();
                (topic, rx)
            })
            .collect()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            channels: Arc::clone(&self.channels),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
