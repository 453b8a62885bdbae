//! Coarse cache invalidation events.
//!
//! Mutations do not describe what changed; they name the schema whose
//! derived state is now suspect. Subscribers rebuild from module state on
//! the next read.

use slate_schema::SchemaId;
use tokio::sync::broadcast;
use tracing::debug;

/// Everything derived from this schema must be recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    pub schema: SchemaId,
}

impl Invalidation {
    pub fn new(schema: impl Into<SchemaId>) -> Self {
        Self {
            schema: schema.into(),
        }
    }
}

/// Broadcast channel for [`Invalidation`] events.
///
/// Publishing never fails: with no live subscribers the event is dropped,
/// which is correct because there is no derived state to refresh.
#[derive(Debug, Clone)]
pub struct InvalidationBus {
    sender: broadcast::Sender<Invalidation>,
}

impl InvalidationBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: Invalidation) {
        debug!(schema = %event.schema, "schema invalidated");
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for InvalidationBus {
    fn default() -> Self {
        Self::new(64)
    }
}
