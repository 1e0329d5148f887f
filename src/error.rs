//! Error types for the tab tracker.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use tab_tracker::{Result, TabId};
//!
//! async fn example(store: &TabStore) -> Result<()> {
//!     store.toggle_favorite(TabId::new(7)).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Input | [`Error::Parse`] |
//! | Storage | [`Error::Storage`], [`Error::Corrupt`] |
//! | Configuration | [`Error::Config`] |
//! | External | [`Error::Io`], [`Error::Json`] |
//!
//! A missing tab record is never an error: operations that target an
//! absent record degrade to no-ops and report `false` / `None`.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Input Errors
    // ========================================================================
    /// Input text is not well-formed.
    ///
    /// Returned by snapshot import and inbound message parsing. Nothing
    /// has been written when this is returned.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parse failure.
        message: String,
    },

    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// Underlying persistence call failed.
    ///
    /// The operation was aborted; no retry is attempted.
    #[error("Storage error on '{key}': {message}")]
    Storage {
        /// Namespace key being accessed.
        key: String,
        /// Description of the backend failure.
        message: String,
    },

    /// Stored value does not decode into the expected shape.
    ///
    /// Possible after an unvalidated snapshot import.
    #[error("Corrupt value at '{key}': {message}")]
    Corrupt {
        /// Namespace key holding the value.
        key: String,
        /// Description of the decode failure.
        message: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when tracker configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a parse error.
    #[inline]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Creates a storage error.
    #[inline]
    pub fn storage(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a corrupt value error.
    #[inline]
    pub fn corrupt(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a parse error.
    #[inline]
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    /// Returns `true` if this error came from the storage layer.
    #[inline]
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Corrupt { .. } | Self::Io(_))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::storage("tabActivityTracker", "disk full");
        assert_eq!(
            err.to_string(),
            "Storage error on 'tabActivityTracker': disk full"
        );
    }

    #[test]
    fn test_parse_error() {
        let err = Error::parse("expected value at line 1");
        assert_eq!(err.to_string(), "Parse error: expected value at line 1");
        assert!(err.is_parse_error());
        assert!(!err.is_storage_error());
    }

    #[test]
    fn test_is_storage_error() {
        let storage = Error::storage("analytics", "boom");
        let corrupt = Error::corrupt("analytics", "not an array");
        let config = Error::config("capacity must be > 0");

        assert!(storage.is_storage_error());
        assert!(corrupt.is_storage_error());
        assert!(!config.is_storage_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_storage_error());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
