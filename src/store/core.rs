//! Core TabStore struct and read paths.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::identifiers::TabId;
use crate::namespace::{Namespace, StorageKey};

use super::record::TabRecord;

// ============================================================================
// Types
// ============================================================================

/// Raw tab map as stored: `tab_<id>` to record JSON.
pub(crate) type TabMap = Map<String, Value>;

/// Internal shared state for a store handle.
pub(crate) struct StoreInner {
    /// Backing namespace.
    pub namespace: Arc<dyn Namespace>,
    /// Timestamp source.
    pub clock: Arc<dyn Clock>,
    /// Serializes mutations through this handle; `None` when disabled.
    pub write_lock: Option<Mutex<()>>,
}

// ============================================================================
// TabStore
// ============================================================================

/// Handle to the tab record map inside a [`Namespace`].
///
/// Every mutation is read-entire-map, mutate, write-entire-map. With write
/// serialization enabled (the default), mutations issued through this
/// handle and its clones run one at a time. Other handles on the same
/// namespace are not coordinated with: the last write wins.
///
/// Records that fail to decode are skipped on read and carried through
/// verbatim on write.
#[derive(Clone)]
pub struct TabStore {
    pub(crate) inner: Arc<StoreInner>,
}

impl fmt::Debug for TabStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabStore")
            .field("serialized", &self.inner.write_lock.is_some())
            .finish_non_exhaustive()
    }
}

impl TabStore {
    /// Creates a store over `namespace` with the system clock and
    /// serialized writes.
    #[must_use]
    pub fn new(namespace: Arc<dyn Namespace>) -> Self {
        Self::with_options(namespace, Arc::new(SystemClock), true)
    }

    /// Creates a store with an explicit clock and write discipline.
    #[must_use]
    pub fn with_options(
        namespace: Arc<dyn Namespace>,
        clock: Arc<dyn Clock>,
        serialize_writes: bool,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                namespace,
                clock,
                write_lock: serialize_writes.then(|| Mutex::new(())),
            }),
        }
    }

    /// Returns the backing namespace.
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &Arc<dyn Namespace> {
        &self.inner.namespace
    }
}

// ============================================================================
// TabStore - Read Operations
// ============================================================================

impl TabStore {
    /// Returns every record, in no particular order.
    pub async fn get_all(&self) -> Result<Vec<TabRecord>> {
        let map = self.read_map().await?;
        let records: Vec<TabRecord> = map
            .iter()
            .filter_map(|(key, value)| decode_record(key, value))
            .collect();

        trace!(count = records.len(), "Loaded tab records");
        Ok(records)
    }

    /// Returns the record for `id`, or `None` if the tab is not tracked.
    pub async fn get_by_id(&self, id: TabId) -> Result<Option<TabRecord>> {
        let key = id.storage_key();
        let map = self.read_map().await?;
        Ok(map.get(&key).and_then(|value| decode_record(&key, value)))
    }

    /// Returns the number of decodable records, matching [`get_all`](Self::get_all).
    pub async fn len(&self) -> Result<usize> {
        Ok(self.get_all().await?.len())
    }

    /// Returns `true` if no decodable record is stored.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

// ============================================================================
// TabStore - Internal
// ============================================================================

impl TabStore {
    /// Current time from the injected clock.
    #[inline]
    pub(crate) fn now_ms(&self) -> u64 {
        self.inner.clock.now_ms()
    }

    /// Acquires the per-handle write lock, if enabled.
    pub(crate) async fn write_guard(&self) -> Option<MutexGuard<'_, ()>> {
        match &self.inner.write_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }

    /// Reads the raw tab map; an absent key is an empty map.
    pub(crate) async fn read_map(&self) -> Result<TabMap> {
        let key = StorageKey::TabTracker.as_str();
        let value = self.inner.namespace.get(key).await.inspect_err(|e| {
            error!(error = %e, "Failed to read tab map");
        })?;

        match value {
            None | Some(Value::Null) => Ok(TabMap::new()),
            Some(Value::Object(map)) => Ok(map),
            Some(other) => Err(Error::corrupt(
                key,
                format!("expected an object, found {}", json_kind(&other)),
            )),
        }
    }

    /// Writes the full tab map back.
    pub(crate) async fn write_map(&self, map: TabMap) -> Result<()> {
        let count = map.len();
        self.inner
            .namespace
            .set(StorageKey::TabTracker.as_str(), Value::Object(map))
            .await
            .inspect_err(|e| {
                error!(error = %e, "Failed to write tab map");
            })?;

        debug!(records = count, "Tab map written");
        Ok(())
    }
}

/// Decodes one map entry, logging and skipping entries that do not decode.
pub(crate) fn decode_record(key: &str, value: &Value) -> Option<TabRecord> {
    match TabRecord::deserialize(value) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(key = %key, error = %e, "Skipping undecodable tab record");
            None
        }
    }
}

/// Encodes a record for storage.
pub(crate) fn encode_record(record: &TabRecord) -> Result<Value> {
    Ok(serde_json::to_value(record)?)
}

/// Short name of a JSON value's type, for error messages.
fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::namespace::MemoryNamespace;

    #[tokio::test]
    async fn test_empty_namespace_has_no_records() {
        let store = TabStore::new(Arc::new(MemoryNamespace::new()));
        assert!(store.get_all().await.unwrap().is_empty());
        assert!(store.is_empty().await.unwrap());
        assert_eq!(
            store.get_by_id(TabId::new(1).unwrap()).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_non_object_tab_map_is_corrupt() {
        let ns = Arc::new(MemoryNamespace::new());
        ns.set("tabActivityTracker", json!([1, 2])).await.unwrap();

        let store = TabStore::new(ns);
        let err = store.get_all().await.unwrap_err();
        assert!(matches!(err, Error::Corrupt { .. }));
        assert!(err.to_string().contains("an array"));
    }

    #[tokio::test]
    async fn test_undecodable_records_are_skipped() {
        let ns = Arc::new(MemoryNamespace::new());
        ns.set(
            "tabActivityTracker",
            json!({
                "tab_1": {
                    "id": 1, "url": "https://a.com", "title": "A",
                    "lastUpdated": 0, "domain": "a.com",
                    "visitCount": 1, "lastVisit": 0
                },
                "tab_2": "garbage"
            }),
        )
        .await
        .unwrap();

        let store = TabStore::new(ns);
        let records = store.get_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "https://a.com");
        assert_eq!(store.len().await.unwrap(), 1);
        assert!(!store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_only_undecodable_records_counts_as_empty() {
        let ns = Arc::new(MemoryNamespace::new());
        ns.set("tabActivityTracker", json!({ "tab_3": "garbage" }))
            .await
            .unwrap();

        let store = TabStore::new(ns);
        assert!(store.get_all().await.unwrap().is_empty());
        assert_eq!(store.len().await.unwrap(), 0);
        assert!(store.is_empty().await.unwrap());
    }
}
