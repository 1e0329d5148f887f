//! Tab record types and merge rules.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use url::Url;

use crate::identifiers::TabId;

// ============================================================================
// Constants
// ============================================================================

/// Title used when the browser reports none.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Domain used when the url cannot be parsed.
pub const UNKNOWN_DOMAIN: &str = "unknown";

// ============================================================================
// TabRecord
// ============================================================================

/// Persisted descriptor of an observed browser tab.
///
/// # Format
///
/// ```json
/// {
///   "id": 7,
///   "url": "https://a.com/x",
///   "title": "A",
///   "favIconUrl": "https://a.com/favicon.ico",
///   "lastUpdated": 1700000000000,
///   "domain": "a.com",
///   "isFavorite": false,
///   "tags": [],
///   "visitCount": 1,
///   "lastVisit": 1700000000000
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRecord {
    /// Tab identifier.
    pub id: TabId,

    /// Page url.
    pub url: String,

    /// Page title.
    pub title: String,

    /// Favicon url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,

    /// Last metadata refresh (ms since epoch).
    pub last_updated: u64,

    /// Host of `url`, or [`UNKNOWN_DOMAIN`].
    pub domain: String,

    /// User-set favorite flag.
    #[serde(default)]
    pub is_favorite: bool,

    /// User-set tags.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Number of observations, starting at 1.
    pub visit_count: u64,

    /// Last observed activity (ms since epoch).
    pub last_visit: u64,
}

impl TabRecord {
    /// Builds the record for `observation`, merging with `existing`.
    ///
    /// Browser-owned fields are refreshed; `is_favorite` and `tags` carry
    /// over from `existing` and `visit_count` increments by one.
    #[must_use]
    pub fn observe(
        observation: &TabObservation,
        existing: Option<&TabRecord>,
        now_ms: u64,
    ) -> Self {
        Self {
            id: observation.id,
            url: observation.url.clone(),
            title: observation
                .title
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            fav_icon_url: observation.fav_icon_url.clone(),
            last_updated: now_ms,
            domain: extract_domain(&observation.url),
            is_favorite: existing.is_some_and(|e| e.is_favorite),
            tags: existing.map(|e| e.tags.clone()).unwrap_or_default(),
            visit_count: existing.map_or(1, |e| e.visit_count.saturating_add(1)),
            last_visit: now_ms,
        }
    }

    /// Returns `true` if title, url or domain contains `needle`.
    ///
    /// `needle` must already be lowercase.
    #[must_use]
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.url.to_lowercase().contains(needle)
            || self.domain.to_lowercase().contains(needle)
    }

    /// Case-insensitive substring match against title, url or domain.
    #[inline]
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        self.matches_lowercase(&query.to_lowercase())
    }

    /// Returns `true` if the record carries `tag`.
    #[inline]
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

// ============================================================================
// TabObservation
// ============================================================================

/// One sighting of an open tab reported by the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabObservation {
    /// Tab identifier.
    pub id: TabId,
    /// Current url.
    pub url: String,
    /// Current title, if any.
    pub title: Option<String>,
    /// Current favicon url, if any.
    pub fav_icon_url: Option<String>,
}

impl TabObservation {
    /// Creates an observation with no title or favicon.
    #[inline]
    #[must_use]
    pub fn new(id: TabId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            title: None,
            fav_icon_url: None,
        }
    }

    /// Sets the title.
    #[inline]
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the favicon url.
    #[inline]
    #[must_use]
    pub fn with_fav_icon_url(mut self, url: impl Into<String>) -> Self {
        self.fav_icon_url = Some(url.into());
        self
    }
}

// ============================================================================
// TabPatch
// ============================================================================

/// Partial update applied by [`TabStore::update`](super::TabStore::update).
///
/// Every `Some` field replaces the record's value; `None` leaves it alone.
/// The id is not patchable since it is tied to the storage key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TabPatch {
    /// New url.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New favicon; `Some(None)` clears it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<Option<String>>,
    /// New last-updated timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<u64>,
    /// New domain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// New favorite flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    /// New tag list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// New visit count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit_count: Option<u64>,
    /// New last-visit timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_visit: Option<u64>,
}

impl TabPatch {
    /// Creates an empty patch.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title.
    #[inline]
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the favorite flag.
    #[inline]
    #[must_use]
    pub fn favorite(mut self, is_favorite: bool) -> Self {
        self.is_favorite = Some(is_favorite);
        self
    }

    /// Replaces the tag list.
    #[inline]
    #[must_use]
    pub fn tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Returns `true` if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the patch to `record`.
    pub fn apply(&self, record: &mut TabRecord) {
        if let Some(url) = &self.url {
            record.url.clone_from(url);
        }
        if let Some(title) = &self.title {
            record.title.clone_from(title);
        }
        if let Some(fav_icon_url) = &self.fav_icon_url {
            record.fav_icon_url.clone_from(fav_icon_url);
        }
        if let Some(last_updated) = self.last_updated {
            record.last_updated = last_updated;
        }
        if let Some(domain) = &self.domain {
            record.domain.clone_from(domain);
        }
        if let Some(is_favorite) = self.is_favorite {
            record.is_favorite = is_favorite;
        }
        if let Some(tags) = &self.tags {
            record.tags.clone_from(tags);
        }
        if let Some(visit_count) = self.visit_count {
            record.visit_count = visit_count;
        }
        if let Some(last_visit) = self.last_visit {
            record.last_visit = last_visit;
        }
    }
}

// ============================================================================
// Domain Extraction
// ============================================================================

/// Returns the host of `url`, or [`UNKNOWN_DOMAIN`] if it does not parse.
///
/// Urls that parse but carry no host (`file:///x`, `mailto:a@b`) yield an
/// empty string.
#[must_use]
pub fn extract_domain(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.host_str().unwrap_or_default().to_string(),
        Err(_) => UNKNOWN_DOMAIN.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
