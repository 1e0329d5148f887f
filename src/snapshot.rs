//! Snapshot import and export.
//!
//! A snapshot is the whole namespace as one JSON document: pretty-printed,
//! keys sorted at every level. Every stored key is exported as is,
//! reserved or not; keys that were never written are not invented.
//!
//! Import replaces top-level keys verbatim. There is no field-level merge
//! and no schema validation; keys absent from the snapshot are left alone.

// ============================================================================
// Imports
// ============================================================================

use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::namespace::Namespace;

// ============================================================================
// Constants
// ============================================================================

/// Prefix of exported snapshot file names.
pub const SNAPSHOT_FILE_PREFIX: &str = "tab-tracker-export-";

// ============================================================================
// Export
// ============================================================================

/// Serializes the whole namespace into canonical snapshot text.
///
/// # Errors
///
/// Returns an error if the namespace cannot be read.
pub async fn export(namespace: &dyn Namespace) -> Result<String> {
    let entries = namespace.get_all().await?;
    let text = serde_json::to_string_pretty(&Value::Object(entries))?;
    debug!(bytes = text.len(), "Snapshot exported");
    Ok(text)
}

/// File name for a snapshot taken at `timestamp_ms`.
#[must_use]
pub fn snapshot_file_name(timestamp_ms: u64) -> String {
    format!("{SNAPSHOT_FILE_PREFIX}{timestamp_ms}.json")
}

/// Exports the namespace to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns an error if the namespace cannot be read or the file cannot be
/// written.
pub async fn export_to_file(namespace: &dyn Namespace, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let text = export(namespace).await?;
    tokio::fs::write(path, text).await?;
    info!(path = %path.display(), "Snapshot written");
    Ok(())
}

// ============================================================================
// Import
// ============================================================================

/// Parses snapshot text into its top-level entries.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the text is not JSON or its top level is not
/// an object.
pub fn parse(text: &str) -> Result<Map<String, Value>> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| Error::parse(format!("snapshot: {e}")))?;
    match value {
        Value::Object(entries) => Ok(entries),
        other => Err(Error::parse(format!(
            "snapshot must be a JSON object, got {}",
            kind(&other)
        ))),
    }
}

/// Replaces namespace keys with the snapshot's values.
///
/// The text is fully parsed before anything is written, so a malformed
/// snapshot leaves the namespace unchanged. Returns the number of keys
/// written.
///
/// # Errors
///
/// - [`Error::Parse`] if the text is malformed
/// - [`Error::Storage`] if the write fails. Whether a partial apply is
///   possible depends on the backend's [`Namespace::set_many`].
pub async fn import(namespace: &dyn Namespace, text: &str) -> Result<usize> {
    let entries = parse(text)?;
    let count = entries.len();
    if count == 0 {
        debug!("Empty snapshot, nothing to import");
        return Ok(0);
    }

    namespace.set_many(entries).await?;
    info!(keys = count, "Snapshot imported");
    Ok(count)
}

/// Imports the snapshot stored at `path`.
///
/// # Errors
///
/// Same as [`import`], plus [`Error::Io`] if the file cannot be read.
pub async fn import_from_file(namespace: &dyn Namespace, path: impl AsRef<Path>) -> Result<usize> {
    let text = tokio::fs::read_to_string(path.as_ref()).await?;
    import(namespace, &text).await
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Tests
// ============================================================================
