//! Filtered, sorted views over a record set.
//!
//! Everything here is a pure function of its inputs: no namespace access,
//! no mutation of the records passed in.
//!
//! # Example
//!
//! ```ignore
//! use tab_tracker::query::{Category, TabFilter};
//!
//! let records = store.get_all().await?;
//! let view = TabFilter::new()
//!     .search("docs")
//!     .category(Category::Recent)
//!     .apply(&records, clock.now_ms());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::clock::{DAY_MS, HOUR_MS, MINUTE_MS};
use crate::config::DEFAULT_RECENT_WINDOW_MS;
use crate::error::{Error, Result};
use crate::store::TabRecord;

// ============================================================================
// Category
// ============================================================================

/// Category tab of the inspection view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Every record.
    #[default]
    All,
    /// Records marked favorite.
    Favorites,
    /// Records visited within the recent window.
    Recent,
}

impl Category {
    /// Returns the wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Favorites => "favorites",
            Self::Recent => "recent",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Self::All),
            "favorites" => Ok(Self::Favorites),
            "recent" => Ok(Self::Recent),
            other => Err(Error::parse(format!("unknown category: {other}"))),
        }
    }
}

// ============================================================================
// TabFilter
// ============================================================================

/// Search text plus category, applied to a full record set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabFilter {
    /// Case-insensitive substring; empty matches everything.
    pub search: String,
    /// Category restriction.
    pub category: Category,
    /// Width of the recent window in milliseconds.
    pub recent_window_ms: u64,
}

impl Default for TabFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl TabFilter {
    /// Creates a filter that keeps everything.
    #[must_use]
    pub fn new() -> Self {
        Self {
            search: String::new(),
            category: Category::All,
            recent_window_ms: DEFAULT_RECENT_WINDOW_MS,
        }
    }

    /// Sets the search text.
    #[inline]
    #[must_use]
    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = query.into();
        self
    }

    /// Sets the category.
    #[inline]
    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Sets the recent window.
    #[inline]
    #[must_use]
    pub fn recent_window_ms(mut self, window_ms: u64) -> Self {
        self.recent_window_ms = window_ms;
        self
    }

    /// Returns `true` if `record` passes the search and category.
    #[must_use]
    pub fn accepts(&self, record: &TabRecord, now_ms: u64) -> bool {
        if !self.search.is_empty() && !record.matches(&self.search) {
            return false;
        }
        match self.category {
            Category::All => true,
            Category::Favorites => record.is_favorite,
            Category::Recent => record.last_visit > now_ms.saturating_sub(self.recent_window_ms),
        }
    }

    /// Returns matching records, most recently visited first.
    #[must_use]
    pub fn apply(&self, records: &[TabRecord], now_ms: u64) -> Vec<TabRecord> {
        let needle = self.search.to_lowercase();
        let cutoff = now_ms.saturating_sub(self.recent_window_ms);

        let mut view: Vec<TabRecord> = records
            .iter()
            .filter(|record| needle.is_empty() || record.matches_lowercase(&needle))
            .filter(|record| match self.category {
                Category::All => true,
                Category::Favorites => record.is_favorite,
                Category::Recent => record.last_visit > cutoff,
            })
            .cloned()
            .collect();

        sort_by_recent(&mut view);
        view
    }
}

/// Shorthand for [`TabFilter::apply`] with the default recent window.
#[must_use]
pub fn filter_tabs(
    records: &[TabRecord],
    search: &str,
    category: Category,
    now_ms: u64,
) -> Vec<TabRecord> {
    TabFilter::new()
        .search(search)
        .category(category)
        .apply(records, now_ms)
}

// ============================================================================
// Helpers
// ============================================================================

/// Sorts by `last_visit`, newest first. Ties keep their input order.
pub fn sort_by_recent(records: &mut [TabRecord]) {
    records.sort_by_key(|record| Reverse(record.last_visit));
}

/// Groups records by domain.
#[must_use]
pub fn group_by_domain(
    records: impl IntoIterator<Item = TabRecord>,
) -> BTreeMap<String, Vec<TabRecord>> {
    let mut groups: BTreeMap<String, Vec<TabRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.domain.clone()).or_default().push(record);
    }
    groups
}

/// Human-readable age of `timestamp_ms` relative to `now_ms`.
///
/// `just now`, `5m ago`, `3h ago`, `2d ago`.
#[must_use]
pub fn format_time_ago(timestamp_ms: u64, now_ms: u64) -> String {
    let elapsed = now_ms.saturating_sub(timestamp_ms);
    if elapsed < MINUTE_MS {
        return "just now".to_string();
    }
    if elapsed < HOUR_MS {
        return format!("{}m ago", elapsed / MINUTE_MS);
    }
    if elapsed < DAY_MS {
        return format!("{}h ago", elapsed / HOUR_MS);
    }
    format!("{}d ago", elapsed / DAY_MS)
}

// ============================================================================
// Tests
// ============================================================================
