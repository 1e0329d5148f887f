//! Persisted namespace: the shared key-value store.
//!
//! Every component reads and writes through the [`Namespace`] trait. The
//! namespace is the single source of truth: there is no transaction, no
//! compare-and-swap, and the last write to a key wins.
//!
//! # Backends
//!
//! | Type | Description |
//! |------|-------------|
//! | [`MemoryNamespace`] | In-process map with fault injection and latency |
//! | [`FileNamespace`] | JSON document on disk, replaced atomically per write |
//!
//! # Change notifications
//!
//! Each successful write call emits one [`NamespaceChange`] to every
//! subscriber after the write lands. Failed writes emit nothing.

// ============================================================================
// Submodules
// ============================================================================

/// JSON-file backed namespace.
pub mod file;

/// Reserved top-level keys.
pub mod keys;

/// In-memory namespace.
pub mod memory;

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::error::Result;

// ============================================================================
// Re-exports
// ============================================================================

pub use file::FileNamespace;
pub use keys::StorageKey;
pub use memory::MemoryNamespace;

// ============================================================================
// NamespaceChange
// ============================================================================

/// Notification that one or more top-level keys were written or removed.
///
/// Consumers should treat this as "state may have changed" and re-fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceChange {
    /// Keys touched by the write.
    pub keys: Vec<String>,
}

impl NamespaceChange {
    /// Creates a change for a single key.
    #[inline]
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            keys: vec![key.into()],
        }
    }

    /// Returns `true` if `key` was touched.
    #[inline]
    #[must_use]
    pub fn touches(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }
}

// ============================================================================
// Namespace
// ============================================================================

/// Asynchronous key-value store shared by every execution context.
///
/// Implementations must be safe to call concurrently. Individual calls are
/// atomic; sequences of calls are not.
#[async_trait]
pub trait Namespace: Send + Sync {
    /// Reads a top-level key.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replaces a top-level key.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Replaces several top-level keys.
    ///
    /// The default implementation calls [`Namespace::set`] per key, so a
    /// failure partway through leaves earlier keys written. Backends that
    /// can do better override it with a single write.
    async fn set_many(&self, entries: Map<String, Value>) -> Result<()> {
        for (key, value) in entries {
            self.set(&key, value).await?;
        }
        Ok(())
    }

    /// Removes a top-level key. No-op if absent.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Reads every top-level key.
    async fn get_all(&self) -> Result<Map<String, Value>>;

    /// Removes every top-level key.
    async fn clear(&self) -> Result<()>;

    /// Subscribes to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<NamespaceChange>;
}

// ============================================================================
// Tests
// ============================================================================
