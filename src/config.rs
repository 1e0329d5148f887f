//! Tracker configuration.
//!
//! # Example
//!
//! ```ignore
//! use tab_tracker::{RescanPolicy, TrackerConfig};
//!
//! let config = TrackerConfig::new()
//!     .with_analytics_capacity(500)
//!     .with_rescan_policy(RescanPolicy::AffectedOnly)
//!     .with_privileged_prefix("about:");
//!
//! config.validate()?;
//! ```
//!
//! Configuration can also be loaded from JSON; any field left out keeps
//! its default:
//!
//! ```json
//! { "analyticsCapacity": 250, "rescanPolicy": "affected_only" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::clock::DAY_MS;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of analytics events retained.
pub const DEFAULT_ANALYTICS_CAPACITY: usize = 1000;

/// Window for the "recent" category.
pub const DEFAULT_RECENT_WINDOW_MS: u64 = DAY_MS;

/// Buffered change notifications per subscriber before it lags.
pub const DEFAULT_CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Url prefixes the monitor never records.
pub const DEFAULT_PRIVILEGED_PREFIXES: &[&str] = &["chrome://"];

// ============================================================================
// RescanPolicy
// ============================================================================

/// Which tabs the monitor upserts when a lifecycle signal arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescanPolicy {
    /// Re-enumerate and upsert every open tab on each qualifying signal.
    #[default]
    FullRescan,

    /// Upsert only the tab named by the signal. Signals that name no tab
    /// (install, create) still trigger a full rescan.
    AffectedOnly,
}

// ============================================================================
// TrackerConfig
// ============================================================================

/// Tracker configuration shared by the store, log and monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackerConfig {
    /// Maximum number of analytics events retained (FIFO eviction).
    pub analytics_capacity: usize,

    /// Width of the "recent" category window in milliseconds.
    pub recent_window_ms: u64,

    /// Url prefixes identifying privileged/internal pages.
    pub privileged_prefixes: Vec<String>,

    /// Rescan policy for lifecycle signals.
    pub rescan_policy: RescanPolicy,

    /// Serialize mutations issued through one store handle.
    pub serialize_writes: bool,

    /// Per-subscriber buffer for namespace change notifications.
    pub change_channel_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl TrackerConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            analytics_capacity: DEFAULT_ANALYTICS_CAPACITY,
            recent_window_ms: DEFAULT_RECENT_WINDOW_MS,
            privileged_prefixes: DEFAULT_PRIVILEGED_PREFIXES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            rescan_policy: RescanPolicy::FullRescan,
            serialize_writes: true,
            change_channel_capacity: DEFAULT_CHANGE_CHANNEL_CAPACITY,
        }
    }

    /// Parses a configuration from JSON and validates it.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the text is not a valid configuration object
    /// - [`Error::Config`] if a value is out of range
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl TrackerConfig {
    /// Sets the analytics log capacity.
    #[inline]
    #[must_use]
    pub fn with_analytics_capacity(mut self, capacity: usize) -> Self {
        self.analytics_capacity = capacity;
        self
    }

    /// Sets the "recent" window in milliseconds.
    #[inline]
    #[must_use]
    pub fn with_recent_window_ms(mut self, window_ms: u64) -> Self {
        self.recent_window_ms = window_ms;
        self
    }

    /// Adds a privileged url prefix.
    #[inline]
    #[must_use]
    pub fn with_privileged_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.privileged_prefixes.push(prefix.into());
        self
    }

    /// Replaces the privileged url prefixes.
    #[inline]
    #[must_use]
    pub fn with_privileged_prefixes(
        mut self,
        prefixes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.privileged_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the rescan policy.
    #[inline]
    #[must_use]
    pub fn with_rescan_policy(mut self, policy: RescanPolicy) -> Self {
        self.rescan_policy = policy;
        self
    }

    /// Enables or disables per-handle write serialization.
    #[inline]
    #[must_use]
    pub fn with_serialize_writes(mut self, serialize: bool) -> Self {
        self.serialize_writes = serialize;
        self
    }

    /// Sets the change notification buffer size.
    #[inline]
    #[must_use]
    pub fn with_change_channel_capacity(mut self, capacity: usize) -> Self {
        self.change_channel_capacity = capacity;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl TrackerConfig {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.analytics_capacity == 0 {
            return Err(Error::config("analyticsCapacity must be greater than 0"));
        }
        if self.recent_window_ms == 0 {
            return Err(Error::config("recentWindowMs must be greater than 0"));
        }
        if self.change_channel_capacity == 0 {
            return Err(Error::config(
                "changeChannelCapacity must be greater than 0",
            ));
        }
        if self.privileged_prefixes.iter().any(String::is_empty) {
            return Err(Error::config(
                "privilegedPrefixes must not contain an empty prefix",
            ));
        }
        Ok(())
    }

    /// Returns `true` if `url` starts with a privileged prefix.
    #[must_use]
    pub fn is_privileged(&self, url: &str) -> bool {
        self.privileged_prefixes
            .iter()
            .any(|prefix| url.starts_with(prefix.as_str()))
    }
}

// ============================================================================
// Tests
// ============================================================================
