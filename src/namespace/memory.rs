//! In-memory namespace.
//!
//! Used as the runtime backend when persistence is handled elsewhere, and
//! as the test double for every component. Two knobs make the race and
//! failure paths reproducible:
//!
//! - [`MemoryNamespace::fail_next_writes`] makes the next N write calls
//!   return [`Error::Storage`] without touching state.
//! - [`MemoryNamespace::set_latency`] suspends every call for a fixed
//!   duration before it touches state, so concurrent read-modify-write
//!   sequences interleave.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::config::DEFAULT_CHANGE_CHANNEL_CAPACITY;
use crate::error::{Error, Result};

use super::{Namespace, NamespaceChange};

// ============================================================================
// Types
// ============================================================================

/// Internal shared state.
struct MemoryInner {
    /// Stored values.
    entries: RwLock<FxHashMap<String, Value>>,
    /// Change fan-out.
    changes: broadcast::Sender<NamespaceChange>,
    /// Remaining writes to fail.
    fail_writes: AtomicUsize,
    /// Successful write calls.
    write_count: AtomicUsize,
    /// Delay applied before every call.
    latency: Mutex<Option<Duration>>,
}

// ============================================================================
// MemoryNamespace
// ============================================================================

/// In-process [`Namespace`].
///
/// Cloning yields another handle to the same map.
#[derive(Clone)]
pub struct MemoryNamespace {
    inner: Arc<MemoryInner>,
}

impl std::fmt::Debug for MemoryNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryNamespace")
            .field("keys", &self.inner.entries.read().len())
            .field("subscribers", &self.inner.changes.receiver_count())
            .finish_non_exhaustive()
    }
}

impl Default for MemoryNamespace {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// MemoryNamespace - Constructor
// ============================================================================

impl MemoryNamespace {
    /// Creates an empty namespace.
    #[must_use]
    pub fn new() -> Self {
        Self::with_channel_capacity(DEFAULT_CHANGE_CHANNEL_CAPACITY)
    }

    /// Creates an empty namespace with a custom notification buffer.
    #[must_use]
    pub fn with_channel_capacity(capacity: usize) -> Self {
        let (changes, _rx) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(MemoryInner {
                entries: RwLock::new(FxHashMap::default()),
                changes,
                fail_writes: AtomicUsize::new(0),
                write_count: AtomicUsize::new(0),
                latency: Mutex::new(None),
            }),
        }
    }

    /// Creates a namespace pre-populated with `entries`.
    ///
    /// No notification is emitted for the initial contents.
    #[must_use]
    pub fn from_map(entries: Map<String, Value>) -> Self {
        let ns = Self::new();
        ns.inner.entries.write().extend(entries);
        ns
    }
}

// ============================================================================
// MemoryNamespace - Test Controls
// ============================================================================

impl MemoryNamespace {
    /// Makes the next `count` write calls fail.
    pub fn fail_next_writes(&self, count: usize) {
        self.inner.fail_writes.store(count, Ordering::SeqCst);
    }

    /// Sets a delay applied before every call touches state.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.inner.latency.lock() = latency;
    }

    /// Returns the number of successful write calls so far.
    #[inline]
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.inner.write_count.load(Ordering::SeqCst)
    }

    /// Returns the number of stored keys.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    /// Returns `true` if no key is stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }
}

// ============================================================================
// MemoryNamespace - Internal
// ============================================================================

impl MemoryNamespace {
    /// Sleeps for the configured latency, if any.
    async fn pause(&self) {
        let latency = *self.inner.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Consumes one injected failure, if any remain.
    fn take_failure(&self, key: &str) -> Result<()> {
        let injected = self
            .inner
            .fail_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        if injected {
            warn!(key = %key, "Injected namespace write failure");
            return Err(Error::storage(key, "injected write failure"));
        }
        Ok(())
    }

    /// Records a successful write and notifies subscribers.
    fn committed(&self, change: NamespaceChange) {
        self.inner.write_count.fetch_add(1, Ordering::SeqCst);
        match self.inner.changes.send(change) {
            Ok(count) => trace!(subscribers = count, "Namespace change broadcast"),
            Err(_) => trace!("No subscribers for namespace change"),
        }
    }
}

// ============================================================================
// Namespace Implementation
// ============================================================================

#[async_trait]
impl Namespace for MemoryNamespace {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.pause().await;
        Ok(self.inner.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.pause().await;
        self.take_failure(key)?;

        self.inner.entries.write().insert(key.to_string(), value);
        debug!(key = %key, "Namespace key set");

        self.committed(NamespaceChange::key(key));
        Ok(())
    }

    async fn set_many(&self, entries: Map<String, Value>) -> Result<()> {
        self.pause().await;
        let keys: Vec<String> = entries.keys().cloned().collect();
        self.take_failure(&keys.join(","))?;

        {
            let mut map = self.inner.entries.write();
            map.extend(entries);
        }
        debug!(count = keys.len(), "Namespace keys set");

        self.committed(NamespaceChange { keys });
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.pause().await;
        self.take_failure(key)?;

        let removed = self.inner.entries.write().remove(key).is_some();
        debug!(key = %key, removed, "Namespace key removed");

        self.committed(NamespaceChange::key(key));
        Ok(())
    }

    async fn get_all(&self) -> Result<Map<String, Value>> {
        self.pause().await;
        let entries = self.inner.entries.read();
        Ok(entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn clear(&self) -> Result<()> {
        self.pause().await;
        self.take_failure("*")?;

        let keys: Vec<String> = {
            let mut map = self.inner.entries.write();
            map.drain().map(|(k, _)| k).collect()
        };
        debug!(count = keys.len(), "Namespace cleared");

        self.committed(NamespaceChange { keys });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<NamespaceChange> {
        self.inner.changes.subscribe()
    }
}

// ============================================================================
// Tests
// ============================================================================
