//! Type-safe identifiers.
//!
//! | Type | Wraps | Notes |
//! |------|-------|-------|
//! | [`TabId`] | `NonZeroU32` | Browser tab id, storage key `tab_<id>` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Prefix of every record key inside the tab map.
pub const TAB_KEY_PREFIX: &str = "tab_";

// ============================================================================
// TabId
// ============================================================================

/// Browser tab identifier.
///
/// Stable for the tab's lifetime within one browser session. Zero is not a
/// valid tab id (the browser never hands one out, and a tab without an id is
/// skipped by the monitor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(NonZeroU32);

impl TabId {
    /// Creates a tab id, returning `None` for zero.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Option<Self> {
        match NonZeroU32::new(id) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0.get()
    }

    /// Returns the record key inside the tab map (`tab_<id>`).
    #[inline]
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{TAB_KEY_PREFIX}{}", self.0)
    }

    /// Parses a record key of the form `tab_<id>`.
    #[must_use]
    pub fn from_storage_key(key: &str) -> Option<Self> {
        key.strip_prefix(TAB_KEY_PREFIX)?
            .parse::<u32>()
            .ok()
            .and_then(Self::new)
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
