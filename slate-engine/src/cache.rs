//! Cached projection skeletons, dropped wholesale on invalidation.
//!
//! The cache stores id lists rather than borrowed rows so entries stay
//! valid across record reloads. An entry is only a hint: readers rebuild
//! the real projection from module state and use the cache to skip work
//! when nothing changed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use slate_schema::{PropertyId, RecordId, SchemaId, ViewId};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::events::InvalidationBus;

/// The id skeleton of one evaluated view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedProjection {
    pub columns: Vec<PropertyId>,
    pub rows: Vec<RecordId>,
}

/// Projection skeletons keyed by `(schema, view)`.
#[derive(Debug, Default)]
pub struct ProjectionCache {
    entries: Mutex<HashMap<(SchemaId, ViewId), CachedProjection>>,
}

impl ProjectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, schema: &SchemaId, view: &ViewId) -> Option<CachedProjection> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(&(schema.clone(), view.clone())).cloned()
    }

    pub fn put(&self, schema: SchemaId, view: ViewId, projection: CachedProjection) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert((schema, view), projection);
    }

    /// Drops every entry under `schema` and returns how many were removed.
    pub fn invalidate_schema(&self, schema: &SchemaId) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|(s, _), _| s != schema);
        let dropped = before - entries.len();
        if dropped > 0 {
            debug!(schema = %schema, dropped, "projection cache invalidated");
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawns a task that drops entries as invalidations arrive.
    ///
    /// The task ends when the bus is dropped. Lagged receivers clear the
    /// whole cache, since missed events cannot be replayed.
    pub fn listen(self: Arc<Self>, bus: &InvalidationBus) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        self.invalidate_schema(&event.schema);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                        let mut entries =
                            self.entries.lock().unwrap_or_else(|e| e.into_inner());
                        entries.clear();
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Invalidation;

    fn skeleton(rows: &[&str]) -> CachedProjection {
        CachedProjection {
            columns: vec!["title".into()],
            rows: rows.iter().map(|r| RecordId::from(*r)).collect(),
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let cache = ProjectionCache::new();
        cache.put("books".into(), "v1".into(), skeleton(&["r1", "r2"]));
        let hit = cache.get(&"books".into(), &"v1".into()).unwrap();
        assert_eq!(hit.rows.len(), 2);
        assert!(cache.get(&"books".into(), &"v2".into()).is_none());
    }

    #[test]
    fn invalidation_only_touches_the_named_schema() {
        let cache = ProjectionCache::new();
        cache.put("books".into(), "v1".into(), skeleton(&["r1"]));
        cache.put("books".into(), "v2".into(), skeleton(&["r1"]));
        cache.put("tasks".into(), "v1".into(), skeleton(&["t1"]));
        assert_eq!(cache.invalidate_schema(&"books".into()), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&"tasks".into(), &"v1".into()).is_some());
    }

    #[tokio::test]
    async fn listener_drains_the_bus() {
        let bus = InvalidationBus::default();
        let cache = Arc::new(ProjectionCache::new());
        cache.put("books".into(), "v1".into(), skeleton(&["r1"]));
        let handle = cache.clone().listen(&bus);
        bus.publish(Invalidation::new("books"));
        tokio::task::yield_now().await;
        for _ in 0..50 {
            if cache.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        assert!(cache.is_empty());
        handle.abort();
    }
}
