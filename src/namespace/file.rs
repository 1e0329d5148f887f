//! JSON-file backed namespace.
//!
//! The whole namespace is one JSON object on disk. It is loaded on first
//! access and kept in memory; every write call rewrites the file by
//! writing a temporary file in the same directory and renaming it into
//! place. Readers never see a half-written document.
//!
//! A missing file is an empty namespace. A file that does not hold a JSON
//! object is reported as [`Error::Corrupt`].

// ============================================================================
// Imports
// ============================================================================

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, error, info, trace};

use crate::config::DEFAULT_CHANGE_CHANNEL_CAPACITY;
use crate::error::{Error, Result};

use super::{Namespace, NamespaceChange};

// ============================================================================
// Types
// ============================================================================

/// Internal shared state.
struct FileInner {
    /// Backing file.
    path: PathBuf,
    /// Loaded document; `None` until first access.
    cache: Mutex<Option<Map<String, Value>>>,
    /// Change fan-out.
    changes: broadcast::Sender<NamespaceChange>,
}

// ============================================================================
// FileNamespace
// ============================================================================

/// Durable [`Namespace`] stored as a single JSON document.
///
/// Calls on one `FileNamespace` (and its clones) are serialized internally.
/// Two `FileNamespace` values opened on the same path do not see each
/// other's writes until reopened.
#[derive(Clone)]
pub struct FileNamespace {
    inner: Arc<FileInner>,
}

impl std::fmt::Debug for FileNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileNamespace")
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}

impl FileNamespace {
    /// Opens a namespace backed by `path`.
    ///
    /// Nothing is read until the first call.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_channel_capacity(path, DEFAULT_CHANGE_CHANNEL_CAPACITY)
    }

    /// Opens a namespace backed by `path` with a custom notification buffer.
    #[must_use]
    pub fn with_channel_capacity(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let (changes, _rx) = broadcast::channel(capacity.max(1));
        let path = path.into();
        info!(path = %path.display(), capacity, "File namespace opened");

        Self {
            inner: Arc::new(FileInner {
                path,
                cache: Mutex::new(None),
                changes,
            }),
        }
    }

    /// Returns the backing file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

// ============================================================================
// FileNamespace - Internal
// ============================================================================

impl FileNamespace {
    /// Storage key used in error messages for whole-file failures.
    fn file_key(&self) -> String {
        self.inner.path.display().to_string()
    }

    /// Reads and parses the backing file.
    async fn load(&self) -> Result<Map<String, Value>> {
        let bytes = match tokio::fs::read(&self.inner.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.inner.path.display(), "No namespace file, starting empty");
                return Ok(Map::new());
            }
            Err(e) => {
                error!(path = %self.inner.path.display(), error = %e, "Namespace read failed");
                return Err(Error::storage(self.file_key(), e.to_string()));
            }
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => {
                debug!(keys = map.len(), "Namespace file loaded");
                Ok(map)
            }
            Ok(_) => Err(Error::corrupt(
                self.file_key(),
                "namespace file does not hold a JSON object",
            )),
            Err(e) => Err(Error::corrupt(self.file_key(), e.to_string())),
        }
    }

    /// Writes `map` to disk atomically.
    async fn persist(&self, key: &str, map: &Map<String, Value>) -> Result<()> {
        let bytes = serde_json::to_vec(map)?;
        let path = self.inner.path.clone();

        let result = tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| Error::storage(key, format!("persist task failed: {e}")))?;

        result.map_err(|e| {
            error!(key = %key, error = %e, "Namespace write failed");
            Error::storage(key, e.to_string())
        })?;

        trace!(key = %key, "Namespace file replaced");
        Ok(())
    }

    /// Applies `mutate` to a copy of the document, persists it, then
    /// swaps the copy in.
    async fn write_with<F>(&self, key: &str, change: NamespaceChange, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Map<String, Value>) + Send,
    {
        let mut guard = self.inner.cache.lock().await;
        let mut next = match guard.as_ref() {
            Some(map) => map.clone(),
            None => self.load().await?,
        };

        mutate(&mut next);
        self.persist(key, &next).await?;
        *guard = Some(next);
        drop(guard);

        let _ = self.inner.changes.send(change);
        Ok(())
    }

    /// Runs `read` against the loaded document.
    async fn read_with<T, F>(&self, read: F) -> Result<T>
    where
        F: FnOnce(&Map<String, Value>) -> T + Send,
    {
        let mut guard = self.inner.cache.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        let map = guard
            .as_ref()
            .ok_or_else(|| Error::storage(self.file_key(), "namespace not loaded"))?;
        Ok(read(map))
    }
}

/// Writes `bytes` to a temp file beside `path` and renames it into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ============================================================================
// Namespace Implementation
// ============================================================================

#[async_trait]
impl Namespace for FileNamespace {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.read_with(|map| map.get(key).cloned()).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let owned = key.to_string();
        self.write_with(key, NamespaceChange::key(key), move |map| {
            map.insert(owned, value);
        })
        .await
    }

    async fn set_many(&self, entries: Map<String, Value>) -> Result<()> {
        let keys: Vec<String> = entries.keys().cloned().collect();
        let label = keys.join(",");
        self.write_with(&label, NamespaceChange { keys }, move |map| {
            map.extend(entries);
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.write_with(key, NamespaceChange::key(key), |map| {
            map.remove(key);
        })
        .await
    }

    async fn get_all(&self) -> Result<Map<String, Value>> {
        self.read_with(|map| map.clone()).await
    }

    async fn clear(&self) -> Result<()> {
        let keys: Vec<String> = self
            .read_with(|map| map.keys().cloned().collect())
            .await?;
        self.write_with("*", NamespaceChange { keys }, Map::clear)
            .await
    }

    fn subscribe(&self) -> broadcast::Receiver<NamespaceChange> {
        self.inner.changes.subscribe()
    }
}

// ============================================================================
// Tests
// ============================================================================
