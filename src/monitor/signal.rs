//! Browser lifecycle signals.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identifiers::TabId;

// ============================================================================
// TabStatus
// ============================================================================

/// Load status reported with an update signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    /// Navigation in progress.
    Loading,
    /// Page finished loading.
    Complete,
}

// ============================================================================
// LifecycleSignal
// ============================================================================

/// A browser lifecycle event the monitor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LifecycleSignal {
    /// Extension installed or updated.
    Installed,

    /// A tab was opened.
    Created,

    /// A tab changed state.
    #[serde(rename_all = "camelCase")]
    Updated {
        /// Tab that changed.
        tab_id: TabId,
        /// Load status after the change.
        status: TabStatus,
    },

    /// A tab became the active tab of its window.
    #[serde(rename_all = "camelCase")]
    Activated {
        /// Tab that was activated.
        tab_id: TabId,
    },

    /// A tab was closed.
    #[serde(rename_all = "camelCase")]
    Removed {
        /// Tab that was closed.
        tab_id: TabId,
    },
}

impl LifecycleSignal {
    /// Returns `true` if this signal triggers an upsert pass.
    ///
    /// Updates only qualify once the page has finished loading. Removal is
    /// handled separately.
    #[inline]
    #[must_use]
    pub const fn triggers_rescan(&self) -> bool {
        match self {
            Self::Installed | Self::Created | Self::Activated { .. } => true,
            Self::Updated { status, .. } => matches!(status, TabStatus::Complete),
            Self::Removed { .. } => false,
        }
    }

    /// Tab named by the signal, if any.
    #[inline]
    #[must_use]
    pub const fn tab_id(&self) -> Option<TabId> {
        match self {
            Self::Installed | Self::Created => None,
            Self::Updated { tab_id, .. }
            | Self::Activated { tab_id }
            | Self::Removed { tab_id } => Some(*tab_id),
        }
    }

    /// Short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::Created => "created",
            Self::Updated { .. } => "updated",
            Self::Activated { .. } => "activated",
            Self::Removed { .. } => "removed",
        }
    }
}

impl fmt::Display for LifecycleSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tab_id() {
            Some(id) => write!(f, "{}({id})", self.name()),
            None => f.write_str(self.name()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> TabId {
        TabId::new(n).unwrap()
    }

    #[test]
    fn test_triggers_rescan() {
        assert!(LifecycleSignal::Installed.triggers_rescan());
        assert!(LifecycleSignal::Created.triggers_rescan());
        assert!(LifecycleSignal::Activated { tab_id: id(1) }.triggers_rescan());
        assert!(
            LifecycleSignal::Updated {
                tab_id: id(1),
                status: TabStatus::Complete
            }
            .triggers_rescan()
        );
        assert!(
            !LifecycleSignal::Updated {
                tab_id: id(1),
                status: TabStatus::Loading
            }
            .triggers_rescan()
        );
        assert!(!LifecycleSignal::Removed { tab_id: id(1) }.triggers_rescan());
    }

    #[test]
    fn test_display() {
        assert_eq!(LifecycleSignal::Created.to_string(), "created");
        assert_eq!(
            LifecycleSignal::Removed { tab_id: id(7) }.to_string(),
            "removed(7)"
        );
    }

    #[test]
    fn test_serde_shape() {
        let signal: LifecycleSignal =
            serde_json::from_str(r#"{"type":"updated","tabId":3,"status":"complete"}"#).unwrap();
        assert_eq!(
            signal,
            LifecycleSignal::Updated {
                tab_id: id(3),
                status: TabStatus::Complete
            }
        );
    }
}
