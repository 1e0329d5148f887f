//! Enumeration of currently open browser tabs.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::error::Result;
use crate::identifiers::TabId;
use crate::store::TabObservation;

// ============================================================================
// BrowserTab
// ============================================================================

/// Snapshot of one open tab as the browser reports it.
///
/// Every field is optional: tabs without an id or url are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserTab {
    /// Browser tab id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    /// Current url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Current title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Favicon url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
}

impl BrowserTab {
    /// Creates a tab with an id and url.
    #[must_use]
    pub fn new(id: u32, url: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            url: Some(url.into()),
            ..Self::default()
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

    /// Tab id, if present and non-zero.
    #[inline]
    #[must_use]
    pub fn tab_id(&self) -> Option<TabId> {
        self.id.and_then(TabId::new)
    }

    /// Converts into an observation, or `None` if the tab must be skipped.
    ///
    /// A tab is skipped when it has no id, has an empty or missing url, or
    /// its url starts with a privileged prefix.
    #[must_use]
    pub fn to_observation(&self, config: &TrackerConfig) -> Option<TabObservation> {
        let id = self.tab_id()?;
        let url = self.url.as_deref().filter(|url| !url.is_empty())?;
        if config.is_privileged(url) {
            return None;
        }

        let mut observation = TabObservation::new(id, url);
        observation.title = self.title.clone();
        observation.fav_icon_url = self.fav_icon_url.clone();
        Some(observation)
    }
}

// ============================================================================
// TabSource
// ============================================================================

/// Source of the browser's open tabs.
#[async_trait]
pub trait TabSource: Send + Sync {
    /// Returns every open tab.
    async fn query(&self) -> Result<Vec<BrowserTab>>;

    /// Returns the open tab with `id`, if any.
    async fn get(&self, id: TabId) -> Result<Option<BrowserTab>> {
        Ok(self
            .query()
            .await?
            .into_iter()
            .find(|tab| tab.tab_id() == Some(id)))
    }
}

// ============================================================================
// StaticTabSource
// ============================================================================

/// In-memory tab list, replaced wholesale by the embedder.
///
/// Cloning shares the same list.
#[derive(Debug, Clone, Default)]
pub struct StaticTabSource {
    tabs: Arc<RwLock<Vec<BrowserTab>>>,
}

impl StaticTabSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source with an initial tab list.
    #[must_use]
    pub fn with_tabs(tabs: Vec<BrowserTab>) -> Self {
        Self {
            tabs: Arc::new(RwLock::new(tabs)),
        }
    }

    /// Replaces the tab list.
    pub fn set_tabs(&self, tabs: Vec<BrowserTab>) {
        *self.tabs.write() = tabs;
    }

    /// Adds or replaces a tab by id.
    pub fn open(&self, tab: BrowserTab) {
        let mut tabs = self.tabs.write();
        match tabs.iter_mut().find(|t| t.id.is_some() && t.id == tab.id) {
            Some(existing) => *existing = tab,
            None => tabs.push(tab),
        }
    }

    /// Removes the tab with `id`.
    pub fn close(&self, id: u32) {
        self.tabs.write().retain(|tab| tab.id != Some(id));
    }
}

#[async_trait]
impl TabSource for StaticTabSource {
    async fn query(&self) -> Result<Vec<BrowserTab>> {
        Ok(self.tabs.read().clone())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_observation_skips() {
        let config = TrackerConfig::new();

        assert!(BrowserTab::default().to_observation(&config).is_none());
        assert!(
            BrowserTab {
                id: Some(1),
                ..BrowserTab::default()
            }
            .to_observation(&config)
            .is_none()
        );
        assert!(BrowserTab::new(0, "https://a.com").to_observation(&config).is_none());
        assert!(BrowserTab::new(1, "").to_observation(&config).is_none());
        assert!(
            BrowserTab::new(1, "chrome://settings")
                .to_observation(&config)
                .is_none()
        );
    }

    #[test]
    fn test_to_observation_custom_prefix() {
        let config = TrackerConfig::new().with_privileged_prefix("about:");
        assert!(BrowserTab::new(1, "about:blank").to_observation(&config).is_none());

        let obs = BrowserTab::new(2, "https://a.com")
            .with_title("A")
            .to_observation(&config)
            .unwrap();
        assert_eq!(obs.id.as_u32(), 2);
        assert_eq!(obs.title.as_deref(), Some("A"));
        assert!(obs.fav_icon_url.is_none());
    }

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticTabSource::new();
        source.open(BrowserTab::new(1, "https://a.com"));
        source.open(BrowserTab::new(2, "https://b.com"));
        source.open(BrowserTab::new(1, "https://c.com"));

        let tabs = source.query().await.unwrap();
        assert_eq!(tabs.len(), 2);

        let first = source.get(TabId::new(1).unwrap()).await.unwrap().unwrap();
        assert_eq!(first.url.as_deref(), Some("https://c.com"));

        source.close(2);
        assert!(source.get(TabId::new(2).unwrap()).await.unwrap().is_none());
    }
}
