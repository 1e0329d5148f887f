//! Tracker facade.
//!
//! The [`Tracker`] wires one namespace, clock and configuration into the
//! store, analytics log and lifecycle monitor, and exposes the popup-side
//! operations on top of them.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::analytics::{AnalyticsEvent, AnalyticsLog};
use crate::clock::Clock;
use crate::config::TrackerConfig;
use crate::error::Result;
use crate::identifiers::TabId;
use crate::monitor::{LifecycleSignal, TabMonitor, TabSource};
use crate::namespace::Namespace;
use crate::query::{Category, TabFilter};
use crate::snapshot;
use crate::store::{TabRecord, TabStore};
use crate::sync::SyncBridge;

use super::builder::TrackerBuilder;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the tracker.
struct TrackerInner {
    namespace: Arc<dyn Namespace>,
    clock: Arc<dyn Clock>,
    config: TrackerConfig,
    store: TabStore,
    analytics: AnalyticsLog,
    monitor: TabMonitor,
}

// ============================================================================
// Tracker
// ============================================================================

/// Entry point tying every component to one namespace.
///
/// Cloning is cheap; clones share all components.
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Tracker {
    /// Creates a builder for configuring a tracker.
    #[inline]
    #[must_use]
    pub fn builder() -> TrackerBuilder {
        TrackerBuilder::new()
    }

    /// Wires components together. Configuration is assumed valid.
    pub(crate) fn new(
        namespace: Arc<dyn Namespace>,
        source: Arc<dyn TabSource>,
        clock: Arc<dyn Clock>,
        config: TrackerConfig,
    ) -> Self {
        let store = TabStore::with_options(
            Arc::clone(&namespace),
            Arc::clone(&clock),
            config.serialize_writes,
        );
        let analytics = AnalyticsLog::with_options(
            Arc::clone(&namespace),
            Arc::clone(&clock),
            config.analytics_capacity,
            config.serialize_writes,
        );
        let monitor = TabMonitor::new(store.clone(), source, config.clone());

        info!(
            analytics_capacity = config.analytics_capacity,
            rescan_policy = ?config.rescan_policy,
            serialize_writes = config.serialize_writes,
            "Tracker created"
        );

        Self {
            inner: Arc::new(TrackerInner {
                namespace,
                clock,
                config,
                store,
                analytics,
                monitor,
            }),
        }
    }
}

// ============================================================================
// Tracker - Accessors
// ============================================================================

impl Tracker {
    /// Returns the backing namespace.
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &Arc<dyn Namespace> {
        &self.inner.namespace
    }

    /// Returns the active configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    /// Returns the tab record store.
    #[inline]
    #[must_use]
    pub fn store(&self) -> &TabStore {
        &self.inner.store
    }

    /// Returns the analytics log.
    #[inline]
    #[must_use]
    pub fn analytics(&self) -> &AnalyticsLog {
        &self.inner.analytics
    }

    /// Returns the lifecycle monitor.
    #[inline]
    #[must_use]
    pub fn monitor(&self) -> &TabMonitor {
        &self.inner.monitor
    }

    /// Current time according to the tracker's clock.
    #[inline]
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.inner.clock.now_ms()
    }
}

// ============================================================================
// Tracker - Background Tasks
// ============================================================================

impl Tracker {
    /// Starts the monitor on a fresh signal channel.
    ///
    /// Returns the sender to feed lifecycle signals into, and the task
    /// handle. The task ends once every sender is dropped.
    pub fn spawn_monitor(
        &self,
        buffer: usize,
    ) -> (mpsc::Sender<LifecycleSignal>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let task = self.inner.monitor.spawn(rx);
        (tx, task)
    }

    /// Starts a sync bridge over the store.
    pub async fn start_sync(&self) -> SyncBridge {
        SyncBridge::start(self.inner.store.clone()).await
    }
}

// ============================================================================
// Tracker - Popup Operations
// ============================================================================

impl Tracker {
    /// Filtered view, newest visit first, using the configured recent
    /// window.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn view(&self, search: &str, category: Category) -> Result<Vec<TabRecord>> {
        let records = self.inner.store.get_all().await?;
        let filter = TabFilter::new()
            .search(search)
            .category(category)
            .recent_window_ms(self.inner.config.recent_window_ms);

        let view = filter.apply(&records, self.now_ms());
        debug!(
            search = %search,
            %category,
            total = records.len(),
            shown = view.len(),
            "Built filtered view"
        );
        Ok(view)
    }

    /// Records an observer message through the analytics log.
    ///
    /// # Errors
    ///
    /// See [`AnalyticsLog::handle_message`].
    pub async fn handle_message(
        &self,
        text: &str,
        sender: Option<TabId>,
    ) -> Result<Option<AnalyticsEvent>> {
        self.inner.analytics.handle_message(text, sender).await
    }

    /// Exports the whole namespace as snapshot text.
    ///
    /// # Errors
    ///
    /// See [`snapshot::export`].
    pub async fn export(&self) -> Result<String> {
        snapshot::export(self.inner.namespace.as_ref()).await
    }

    /// Imports snapshot text, replacing top-level keys.
    ///
    /// # Errors
    ///
    /// See [`snapshot::import`].
    pub async fn import(&self, text: &str) -> Result<usize> {
        snapshot::import(self.inner.namespace.as_ref(), text).await
    }

    /// Writes a timestamped snapshot file into `dir` and returns its path.
    ///
    /// # Errors
    ///
    /// See [`snapshot::export_to_file`].
    pub async fn export_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir
            .as_ref()
            .join(snapshot::snapshot_file_name(self.now_ms()));
        snapshot::export_to_file(self.inner.namespace.as_ref(), &path).await?;
        Ok(path)
    }

    /// Imports the snapshot file at `path`.
    ///
    /// # Errors
    ///
    /// See [`snapshot::import_from_file`].
    pub async fn import_from_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        snapshot::import_from_file(self.inner.namespace.as_ref(), path).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::clock::{HOUR_MS, ManualClock};
    use crate::monitor::{BrowserTab, StaticTabSource};
    use crate::namespace::StorageKey;

    const T0: u64 = 1_700_000_000_000;

    fn tracker(source: &StaticTabSource, clock: &Arc<ManualClock>) -> Tracker {
        Tracker::builder()
            .in_memory()
            .source(Arc::new(source.clone()))
            .clock(Arc::clone(clock) as Arc<dyn Clock>)
            .build()
            .unwrap()
    }

    fn id(n: u32) -> TabId {
        TabId::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_components_share_namespace() {
        let source = StaticTabSource::with_tabs(vec![BrowserTab::new(1, "https://a.com")]);
        let clock = Arc::new(ManualClock::new(T0));
        let tracker = tracker(&source, &clock);

        tracker.monitor().handle(LifecycleSignal::Installed).await.unwrap();
        let message = r#"{
            "type": "TAB_ANALYTICS",
            "data": {"timeSpent": 1, "interactions": 0, "scrollDepth": 0, "url": "https://a.com"}
        }"#;
        tracker.handle_message(message, Some(id(1))).await.unwrap();

        let all = tracker.namespace().get_all().await.unwrap();
        assert!(all.contains_key(StorageKey::TabTracker.as_str()));
        assert!(all.contains_key(StorageKey::Analytics.as_str()));

        let record = tracker.store().get_by_id(id(1)).await.unwrap().unwrap();
        assert_eq!(record.last_visit, T0);
        assert_eq!(tracker.analytics().len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_view_uses_clock_and_window() {
        let source = StaticTabSource::with_tabs(vec![BrowserTab::new(1, "https://old.com")]);
        let clock = Arc::new(ManualClock::new(T0));
        let tracker = tracker(&source, &clock);
        tracker.monitor().rescan().await.unwrap();

        clock.advance(24 * HOUR_MS);
        source.set_tabs(vec![BrowserTab::new(2, "https://new.com")]);
        tracker.monitor().rescan().await.unwrap();
        clock.advance(HOUR_MS);

        let recent = tracker.view("", Category::Recent).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, id(2));

        let all = tracker.view("", Category::All).await.unwrap();
        assert_eq!(all.iter().map(|r| r.id.as_u32()).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_spawn_monitor_feeds_store() {
        let source = StaticTabSource::with_tabs(vec![BrowserTab::new(3, "https://c.com")]);
        let clock = Arc::new(ManualClock::new(T0));
        let tracker = tracker(&source, &clock);
        let bridge = tracker.start_sync().await;
        let mut view = bridge.subscribe();

        let (tx, task) = tracker.spawn_monitor(8);
        tx.send(LifecycleSignal::Created).await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), view.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(view.borrow().records.len(), 1);

        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_export_to_dir_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let source = StaticTabSource::with_tabs(vec![BrowserTab::new(1, "https://a.com")]);
        let clock = Arc::new(ManualClock::new(T0));

        let first = tracker(&source, &clock);
        first.monitor().rescan().await.unwrap();
        first.store().toggle_favorite(id(1)).await.unwrap();
        let path = first.export_to_dir(dir.path()).await.unwrap();
        assert!(path.ends_with(format!("tab-tracker-export-{T0}.json")));

        let second = tracker(&StaticTabSource::new(), &clock);
        second.import_from_file(&path).await.unwrap();
        assert_eq!(second.export().await.unwrap(), first.export().await.unwrap());
        assert!(
            second
                .view("", Category::Favorites)
                .await
                .unwrap()
                .iter()
                .any(|r| r.id == id(1))
        );
    }
}
