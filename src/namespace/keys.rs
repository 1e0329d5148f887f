//! Reserved top-level namespace keys.

use std::fmt;

use serde_json::{Map, Value};

// ============================================================================
// StorageKey
// ============================================================================

/// The five reserved top-level keys.
///
/// Only [`StorageKey::TabTracker`] and [`StorageKey::Analytics`] carry logic
/// in this crate. The others are inert slots that are exported and imported
/// verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Map of `tab_<id>` to tab record.
    TabTracker,
    /// Favorites index (unused; favorite status lives on the record).
    Favorites,
    /// Tab groups (unused).
    Groups,
    /// User preferences (unused).
    Preferences,
    /// Ordered analytics event log.
    Analytics,
}

impl StorageKey {
    /// All reserved keys in declaration order.
    pub const ALL: [StorageKey; 5] = [
        Self::TabTracker,
        Self::Favorites,
        Self::Groups,
        Self::Preferences,
        Self::Analytics,
    ];

    /// Returns the key string used in the namespace.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TabTracker => "tabActivityTracker",
            Self::Favorites => "favorites",
            Self::Groups => "tabGroups",
            Self::Preferences => "userPreferences",
            Self::Analytics => "analytics",
        }
    }

    /// Value used when the key has never been written.
    #[must_use]
    pub fn empty_value(&self) -> Value {
        match self {
            Self::Analytics => Value::Array(Vec::new()),
            _ => Value::Object(Map::new()),
        }
    }

    /// Looks up a reserved key by its string form.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
