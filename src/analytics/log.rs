//! Bounded analytics event log.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::DEFAULT_ANALYTICS_CAPACITY;
use crate::error::{Error, Result};
use crate::namespace::{Namespace, StorageKey};

// ============================================================================
// AnalyticsEvent
// ============================================================================

/// One interaction event.
///
/// # Format
///
/// ```json
/// { "type": "TAB_ANALYTICS", "timestamp": 1700000000000, "data": { ... } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    /// Event tag.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Append time (ms since epoch).
    pub timestamp: u64,

    /// Opaque payload.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl AnalyticsEvent {
    /// Creates an event.
    #[inline]
    #[must_use]
    pub fn new(event_type: impl Into<String>, timestamp: u64, data: Map<String, Value>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp,
            data,
        }
    }
}

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for a log handle.
struct LogInner {
    /// Backing namespace.
    namespace: Arc<dyn Namespace>,
    /// Timestamp source.
    clock: Arc<dyn Clock>,
    /// Maximum retained events.
    capacity: usize,
    /// Serializes appends through this handle; `None` when disabled.
    write_lock: Option<Mutex<()>>,
}

// ============================================================================
// AnalyticsLog
// ============================================================================

/// Handle to the event list stored under
/// [`StorageKey::Analytics`](crate::namespace::StorageKey::Analytics).
///
/// Appends past capacity evict from the front, oldest first. Entries are
/// never edited or removed individually.
#[derive(Clone)]
pub struct AnalyticsLog {
    inner: Arc<LogInner>,
}

impl fmt::Debug for AnalyticsLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticsLog")
            .field("capacity", &self.inner.capacity)
            .finish_non_exhaustive()
    }
}

impl AnalyticsLog {
    /// Creates a log with the default capacity and system clock.
    #[must_use]
    pub fn new(namespace: Arc<dyn Namespace>) -> Self {
        Self::with_options(namespace, Arc::new(SystemClock), DEFAULT_ANALYTICS_CAPACITY, true)
    }

    /// Creates a log with explicit clock, capacity and write discipline.
    ///
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn with_options(
        namespace: Arc<dyn Namespace>,
        clock: Arc<dyn Clock>,
        capacity: usize,
        serialize_writes: bool,
    ) -> Self {
        Self {
            inner: Arc::new(LogInner {
                namespace,
                clock,
                capacity: capacity.max(1),
                write_lock: serialize_writes.then(|| Mutex::new(())),
            }),
        }
    }

    /// Returns the retention capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

// ============================================================================
// AnalyticsLog - Operations
// ============================================================================

impl AnalyticsLog {
    /// Appends an event stamped with the current time.
    ///
    /// If the log then exceeds capacity, the oldest events are evicted
    /// until it is exactly at capacity.
    pub async fn append(
        &self,
        event_type: impl Into<String>,
        data: Map<String, Value>,
    ) -> Result<AnalyticsEvent> {
        let _guard = self.write_guard().await;
        let event = AnalyticsEvent::new(event_type, self.inner.clock.now_ms(), data);

        let mut events = self.read_raw().await?;
        events.push(serde_json::to_value(&event)?);

        let overflow = events.len().saturating_sub(self.inner.capacity);
        if overflow > 0 {
            events.drain(..overflow);
            trace!(evicted = overflow, "Evicted oldest analytics events");
        }

        let len = events.len();
        self.write_raw(events).await?;

        debug!(event_type = %event.event_type, len, "Analytics event appended");
        Ok(event)
    }

    /// Returns the last `limit` events in arrival order, or all of them
    /// when `limit` is `None` or exceeds the log length.
    pub async fn recent(&self, limit: Option<usize>) -> Result<Vec<AnalyticsEvent>> {
        let mut events = self.read_events().await?;
        if let Some(limit) = limit {
            let skip = events.len().saturating_sub(limit);
            events.drain(..skip);
        }
        Ok(events)
    }

    /// Returns every event whose type equals `event_type`.
    pub async fn by_type(&self, event_type: &str) -> Result<Vec<AnalyticsEvent>> {
        Ok(self
            .read_events()
            .await?
            .into_iter()
            .filter(|event| event.event_type == event_type)
            .collect())
    }

    /// Empties the log.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_guard().await;
        self.write_raw(Vec::new()).await?;
        debug!("Analytics log cleared");
        Ok(())
    }

    /// Returns the number of stored events.
    pub async fn len(&self) -> Result<usize> {
        Ok(self.read_raw().await?.len())
    }

    /// Returns `true` if the log is empty.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.read_raw().await?.is_empty())
    }
}

// ============================================================================
// AnalyticsLog - Internal
// ============================================================================

impl AnalyticsLog {
    /// Acquires the per-handle write lock, if enabled.
    async fn write_guard(&self) -> Option<MutexGuard<'_, ()>> {
        match &self.inner.write_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }

    /// Reads the raw event list; an absent key is an empty list.
    async fn read_raw(&self) -> Result<Vec<Value>> {
        let key = StorageKey::Analytics.as_str();
        let value = self.inner.namespace.get(key).await.inspect_err(|e| {
            error!(error = %e, "Failed to read analytics log");
        })?;

        match value {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(events)) => Ok(events),
            Some(_) => Err(Error::corrupt(key, "expected an array of events")),
        }
    }

    /// Reads and decodes events, skipping entries that do not decode.
    async fn read_events(&self) -> Result<Vec<AnalyticsEvent>> {
        let raw = self.read_raw().await?;
        Ok(raw
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value(value) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(index, error = %e, "Skipping undecodable analytics event");
                    None
                }
            })
            .collect())
    }

    /// Writes the raw event list back.
    async fn write_raw(&self, events: Vec<Value>) -> Result<()> {
        self.inner
            .namespace
            .set(StorageKey::Analytics.as_str(), Value::Array(events))
            .await
            .inspect_err(|e| {
                error!(error = %e, "Failed to write analytics log");
            })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    use crate::clock::ManualClock;
    use crate::namespace::MemoryNamespace;

    fn log_with(ns: &MemoryNamespace, capacity: usize) -> (AnalyticsLog, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let log = AnalyticsLog::with_options(Arc::new(ns.clone()), clock.clone(), capacity, true);
        (log, clock)
    }

    fn seq(n: usize) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("seq".into(), json!(n));
        data
    }

    #[tokio::test]
    async fn test_append_stamps_time() {
        let ns = MemoryNamespace::new();
        let (log, clock) = log_with(&ns, 10);
        clock.set(1234);

        let event = log.append("click", seq(0)).await.unwrap();
        assert_eq!(event.timestamp, 1234);
        assert_eq!(log.recent(None).await.unwrap(), vec![event]);
    }

    #[tokio::test]
    async fn test_1001_appends_keep_last_1000() {
        let ns = MemoryNamespace::new();
        let (log, _) = log_with(&ns, 1000);

        for n in 0..1001 {
            log.append("tick", seq(n)).await.unwrap();
        }

        let events = log.recent(None).await.unwrap();
        assert_eq!(events.len(), 1000);
        assert_eq!(events[0].data["seq"], 1);
        assert_eq!(events[999].data["seq"], 1000);
        assert!(events.iter().all(|e| e.data["seq"] != 0));
    }

    #[tokio::test]
    async fn test_recent_limits() {
        let ns = MemoryNamespace::new();
        let (log, _) = log_with(&ns, 10);
        for n in 0..5 {
            log.append("tick", seq(n)).await.unwrap();
        }

        let last_two = log.recent(Some(2)).await.unwrap();
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[0].data["seq"], 3);
        assert_eq!(last_two[1].data["seq"], 4);

        assert_eq!(log.recent(Some(50)).await.unwrap().len(), 5);
        assert!(log.recent(Some(0)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_by_type_and_clear() {
        let ns = MemoryNamespace::new();
        let (log, _) = log_with(&ns, 10);
        log.append("a", seq(0)).await.unwrap();
        log.append("b", seq(1)).await.unwrap();
        log.append("a", seq(2)).await.unwrap();

        let a = log.by_type("a").await.unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a[1].data["seq"], 2);
        assert!(log.by_type("A").await.unwrap().is_empty());

        log.clear().await.unwrap();
        assert!(log.is_empty().await.unwrap());
        assert_eq!(ns.get("analytics").await.unwrap(), Some(json!([])));
    }

    #[tokio::test]
    async fn test_oversized_imported_log_is_trimmed_on_append() {
        let ns = MemoryNamespace::new();
        let events: Vec<Value> = (0..8)
            .map(|n| json!({"type": "old", "timestamp": n, "data": {}}))
            .collect();
        ns.set("analytics", Value::Array(events)).await.unwrap();

        let (log, _) = log_with(&ns, 5);
        log.append("new", Map::new()).await.unwrap();

        let events = log.recent(None).await.unwrap();
        assert_eq!(events.len(), 5);
        assert_eq!(events[0].timestamp, 4);
        assert_eq!(events[4].event_type, "new");
    }

    #[tokio::test]
    async fn test_non_array_log_is_corrupt() {
        let ns = MemoryNamespace::new();
        ns.set("analytics", json!({"not": "a list"})).await.unwrap();
        let (log, _) = log_with(&ns, 5);

        let err = log.append("x", Map::new()).await.unwrap_err();
        assert!(matches!(err, Error::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_failed_append_leaves_log_unchanged() {
        let ns = MemoryNamespace::new();
        let (log, _) = log_with(&ns, 5);
        log.append("a", seq(0)).await.unwrap();

        ns.fail_next_writes(1);
        assert!(log.append("b", seq(1)).await.is_err());
        assert_eq!(log.len().await.unwrap(), 1);
    }

    /// Clock that ticks forward on every read.
    struct TickingClock(std::sync::atomic::AtomicU64);

    impl Clock for TickingClock {
        fn now_ms(&self) -> u64 {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_land_in_timestamp_order() {
        let ns = MemoryNamespace::new();
        ns.set_latency(Some(std::time::Duration::from_millis(1)));
        let clock = Arc::new(TickingClock(std::sync::atomic::AtomicU64::new(0)));
        let log = AnalyticsLog::with_options(Arc::new(ns.clone()), clock, 100, true);

        let tasks: Vec<_> = (0..16)
            .map(|n| {
                let log = log.clone();
                tokio::spawn(async move { log.append("tick", seq(n)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let events = log.recent(None).await.unwrap();
        assert_eq!(events.len(), 16);
        assert!(events.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    proptest! {
        #[test]
        fn prop_log_keeps_newest_in_order(capacity in 1usize..20, appends in 0usize..50) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            rt.block_on(async {
                let ns = MemoryNamespace::new();
                let (log, _) = log_with(&ns, capacity);
                for n in 0..appends {
                    log.append("tick", seq(n)).await.unwrap();
                }

                let events = log.recent(None).await.unwrap();
                let expected: Vec<usize> = (appends.saturating_sub(capacity)..appends).collect();
                let actual: Vec<usize> = events
                    .iter()
                    .map(|e| e.data["seq"].as_u64().unwrap() as usize)
                    .collect();
                prop_assert_eq!(actual, expected);
                Ok(())
            })?;
        }
    }
}
