//! Reactive sync bridge.
//!
//! Watches the namespace for changes and republishes the full record set on
//! every one of them. There is no diffing: a notification means "state may
//! have changed" and consumers re-read the whole view.
//!
//! The latest view is held in a [`watch`] channel, so a consumer that
//! subscribes late sees it immediately and a slow consumer only ever sees
//! the newest one.
//!
//! # Example
//!
//! ```ignore
//! let bridge = SyncBridge::start(store).await;
//! let mut view = bridge.subscribe();
//!
//! while view.changed().await.is_ok() {
//!     let snapshot = view.borrow_and_update().clone();
//!     render(&snapshot.records);
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::namespace::NamespaceChange;
use crate::store::{TabRecord, TabStore};

// ============================================================================
// SyncView
// ============================================================================

/// One published view of the record set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncView {
    /// Number of successful fetches that produced this view.
    pub generation: u64,
    /// Every decodable record at fetch time.
    pub records: Arc<Vec<TabRecord>>,
}

// ============================================================================
// SyncBridge
// ============================================================================

/// Background task that keeps a [`SyncView`] current.
///
/// Dropping the bridge stops the task.
pub struct SyncBridge {
    view: watch::Receiver<SyncView>,
    task: JoinHandle<()>,
}

impl fmt::Debug for SyncBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncBridge")
            .field("generation", &self.generation())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl SyncBridge {
    /// Subscribes to `store`'s namespace, fetches once, and starts the task.
    ///
    /// The subscription is taken before the initial fetch, so no change
    /// between the two is missed. A failed initial fetch publishes an empty
    /// view at generation 0.
    pub async fn start(store: TabStore) -> Self {
        let changes = store.namespace().subscribe();

        let initial = match store.get_all().await {
            Ok(records) => SyncView {
                generation: 1,
                records: Arc::new(records),
            },
            Err(e) => {
                warn!(error = %e, "Initial sync fetch failed");
                SyncView::default()
            }
        };

        let generation = initial.generation;
        debug!(
            count = initial.records.len(),
            generation, "Initial sync view published"
        );

        let (tx, view) = watch::channel(initial);
        let task = tokio::spawn(run(store, changes, tx, generation));

        info!("Sync bridge started");
        Self { view, task }
    }

    /// Returns a receiver for the published view.
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncView> {
        self.view.clone()
    }

    /// Returns the latest view.
    #[must_use]
    pub fn current(&self) -> SyncView {
        self.view.borrow().clone()
    }

    /// Returns the latest generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.view.borrow().generation
    }

    /// Returns `true` while the background task is running.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops the background task.
    pub fn shutdown(&self) {
        if self.is_running() {
            debug!("Sync bridge shutting down");
            self.task.abort();
        }
    }
}

impl Drop for SyncBridge {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ============================================================================
// Background Task
// ============================================================================

async fn run(
    store: TabStore,
    mut changes: broadcast::Receiver<NamespaceChange>,
    tx: watch::Sender<SyncView>,
    mut generation: u64,
) {
    loop {
        match changes.recv().await {
            Ok(change) => trace!(keys = ?change.keys, "Namespace changed"),
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "Sync bridge lagged, refetching");
            }
            Err(RecvError::Closed) => break,
        }

        match store.get_all().await {
            Ok(records) => {
                generation += 1;
                trace!(count = records.len(), generation, "Sync view refreshed");
                tx.send_replace(SyncView {
                    generation,
                    records: Arc::new(records),
                });
            }
            Err(e) => {
                warn!(error = %e, generation, "Sync refetch failed, keeping previous view");
            }
        }
    }

    info!("Sync bridge stopped");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{Map, Value, json};
    use tokio::time::timeout;

    use crate::analytics::AnalyticsLog;
    use crate::error::Result;
    use crate::identifiers::TabId;
    use crate::namespace::{MemoryNamespace, Namespace, StorageKey};
    use crate::store::TabObservation;

    const WAIT: Duration = Duration::from_secs(2);

    fn obs(id: u32) -> TabObservation {
        TabObservation::new(TabId::new(id).unwrap(), format!("https://site{id}.com"))
    }

    #[tokio::test]
    async fn test_initial_view() {
        let ns = MemoryNamespace::new();
        let store = TabStore::new(Arc::new(ns.clone()));
        store.upsert(&obs(1)).await.unwrap();

        let bridge = SyncBridge::start(store).await;
        let view = bridge.current();
        assert_eq!(view.generation, 1);
        assert_eq!(view.records.len(), 1);
        assert!(bridge.is_running());
    }

    #[tokio::test]
    async fn test_refetch_on_store_change() {
        let store = TabStore::new(Arc::new(MemoryNamespace::new()));
        let bridge = SyncBridge::start(store.clone()).await;
        let mut view = bridge.subscribe();

        store.upsert(&obs(1)).await.unwrap();
        timeout(WAIT, view.changed()).await.unwrap().unwrap();

        let current = view.borrow_and_update().clone();
        assert_eq!(current.generation, 2);
        assert_eq!(current.records[0].id.as_u32(), 1);
    }

    #[tokio::test]
    async fn test_any_key_triggers_refetch() {
        let ns: Arc<dyn Namespace> = Arc::new(MemoryNamespace::new());
        let store = TabStore::new(Arc::clone(&ns));
        let log = AnalyticsLog::new(Arc::clone(&ns));
        let bridge = SyncBridge::start(store).await;
        let mut view = bridge.subscribe();

        log.append("PING", Map::new()).await.unwrap();
        timeout(WAIT, view.changed()).await.unwrap().unwrap();
        assert_eq!(view.borrow().generation, 2);
        assert!(view.borrow().records.is_empty());
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_view() {
        let ns = MemoryNamespace::new();
        let store = TabStore::new(Arc::new(ns.clone()));
        store.upsert(&obs(1)).await.unwrap();
        let bridge = SyncBridge::start(store.clone()).await;
        let mut rx = bridge.subscribe();

        ns.set(StorageKey::TabTracker.as_str(), json!(5)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let view = bridge.current();
        assert_eq!(view.generation, 1);
        assert_eq!(view.records.len(), 1);

        ns.set(StorageKey::TabTracker.as_str(), json!({})).await.unwrap();
        timeout(WAIT, rx.changed()).await.unwrap().unwrap();
        assert_eq!(rx.borrow().generation, 2);
        assert!(rx.borrow().records.is_empty());
    }

    #[tokio::test]
    async fn test_lagged_subscriber_refetches() {
        let ns = MemoryNamespace::with_channel_capacity(1);
        let store = TabStore::new(Arc::new(ns.clone()));
        let bridge = SyncBridge::start(store.clone()).await;
        let mut view = bridge.subscribe();

        let writes: Vec<TabObservation> = (1..=5).map(obs).collect();
        for observation in &writes {
            store.upsert(observation).await.unwrap();
        }

        let mut latest = 0;
        while latest < 5 {
            timeout(WAIT, view.changed()).await.unwrap().unwrap();
            latest = view.borrow_and_update().records.len();
        }
        assert_eq!(latest, 5);
    }

    /// Namespace whose notification stream is already closed.
    struct Silent(MemoryNamespace);

    #[async_trait]
    impl Namespace for Silent {
        async fn get(&self, key: &str) -> Result<Option<Value>> {
            self.0.get(key).await
        }
        async fn set(&self, key: &str, value: Value) -> Result<()> {
            self.0.set(key, value).await
        }
        async fn remove(&self, key: &str) -> Result<()> {
            self.0.remove(key).await
        }
        async fn get_all(&self) -> Result<Map<String, Value>> {
            self.0.get_all().await
        }
        async fn clear(&self) -> Result<()> {
            self.0.clear().await
        }
        fn subscribe(&self) -> broadcast::Receiver<NamespaceChange> {
            broadcast::channel(1).1
        }
    }

    #[tokio::test]
    async fn test_closed_stream_stops_bridge() {
        let store = TabStore::new(Arc::new(Silent(MemoryNamespace::new())));
        let bridge = SyncBridge::start(store).await;

        for _ in 0..100 {
            if !bridge.is_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!bridge.is_running());
        assert_eq!(bridge.generation(), 1);
    }

    #[tokio::test]
    async fn test_shutdown() {
        let bridge = SyncBridge::start(TabStore::new(Arc::new(MemoryNamespace::new()))).await;
        bridge.shutdown();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!bridge.is_running());
    }
}
