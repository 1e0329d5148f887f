//! TabMonitor: lifecycle signal handling.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::{RescanPolicy, TrackerConfig};
use crate::error::Result;
use crate::identifiers::TabId;
use crate::store::{TabObservation, TabRecord, TabStore};

use super::signal::LifecycleSignal;
use super::source::TabSource;

// ============================================================================
// SignalOutcome
// ============================================================================

/// What handling a signal did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalOutcome {
    /// Signal did not qualify.
    Ignored,
    /// Records written by an upsert pass.
    Upserted(Vec<TabRecord>),
    /// Removal handled; `true` if a record was deleted.
    Removed(bool),
}

impl SignalOutcome {
    /// Number of records written or deleted.
    #[must_use]
    pub fn affected(&self) -> usize {
        match self {
            Self::Ignored | Self::Removed(false) => 0,
            Self::Upserted(records) => records.len(),
            Self::Removed(true) => 1,
        }
    }
}

// ============================================================================
// TabMonitor
// ============================================================================

/// Reacts to browser lifecycle signals by upserting or removing records.
///
/// Cloning is cheap; clones share the store, source and configuration.
#[derive(Clone)]
pub struct TabMonitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    store: TabStore,
    source: Arc<dyn TabSource>,
    config: TrackerConfig,
}

impl fmt::Debug for TabMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabMonitor")
            .field("rescan_policy", &self.inner.config.rescan_policy)
            .field("privileged_prefixes", &self.inner.config.privileged_prefixes)
            .finish_non_exhaustive()
    }
}

impl TabMonitor {
    /// Creates a monitor over `store`, enumerating tabs from `source`.
    #[must_use]
    pub fn new(store: TabStore, source: Arc<dyn TabSource>, config: TrackerConfig) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                store,
                source,
                config,
            }),
        }
    }

    /// Returns the store this monitor writes to.
    #[inline]
    #[must_use]
    pub fn store(&self) -> &TabStore {
        &self.inner.store
    }

    /// Returns the active rescan policy.
    #[inline]
    #[must_use]
    pub fn rescan_policy(&self) -> RescanPolicy {
        self.inner.config.rescan_policy
    }
}

// ============================================================================
// TabMonitor - Signal Handling
// ============================================================================

impl TabMonitor {
    /// Handles one lifecycle signal.
    ///
    /// # Errors
    ///
    /// Returns an error if enumerating tabs or writing the store fails.
    pub async fn handle(&self, signal: LifecycleSignal) -> Result<SignalOutcome> {
        trace!(%signal, "Handling lifecycle signal");

        if let LifecycleSignal::Removed { tab_id } = signal {
            return self.inner.store.remove(tab_id).await.map(SignalOutcome::Removed);
        }

        if !signal.triggers_rescan() {
            trace!(%signal, "Signal does not qualify");
            return Ok(SignalOutcome::Ignored);
        }

        let records = match (self.rescan_policy(), signal.tab_id()) {
            (RescanPolicy::AffectedOnly, Some(tab_id)) => self.refresh(tab_id).await?,
            _ => self.rescan().await?,
        };

        debug!(%signal, count = records.len(), "Lifecycle signal handled");
        Ok(SignalOutcome::Upserted(records))
    }

    /// Upserts every qualifying open tab in one store write.
    ///
    /// # Errors
    ///
    /// Returns an error if enumerating tabs or writing the store fails.
    pub async fn rescan(&self) -> Result<Vec<TabRecord>> {
        let tabs = self.inner.source.query().await?;
        let total = tabs.len();
        let observations: Vec<TabObservation> = tabs
            .iter()
            .filter_map(|tab| tab.to_observation(&self.inner.config))
            .collect();

        debug!(
            total,
            tracked = observations.len(),
            skipped = total - observations.len(),
            "Rescanning open tabs"
        );
        self.inner.store.upsert_batch(&observations).await
    }

    /// Upserts the single tab `tab_id`, if it is open and qualifies.
    ///
    /// # Errors
    ///
    /// Returns an error if enumerating tabs or writing the store fails.
    pub async fn refresh(&self, tab_id: TabId) -> Result<Vec<TabRecord>> {
        let Some(tab) = self.inner.source.get(tab_id).await? else {
            trace!(%tab_id, "Tab no longer open");
            return Ok(Vec::new());
        };
        let Some(observation) = tab.to_observation(&self.inner.config) else {
            trace!(%tab_id, "Tab skipped");
            return Ok(Vec::new());
        };
        let record = self.inner.store.upsert(&observation).await?;
        Ok(vec![record])
    }
}

// ============================================================================
// TabMonitor - Background Task
// ============================================================================

impl TabMonitor {
    /// Consumes signals from `signals` until the sender side closes.
    ///
    /// Each signal is handled in its own task, so handlers for distinct
    /// signals may interleave. Failures are logged and do not stop the loop.
    pub fn spawn(&self, mut signals: mpsc::Receiver<LifecycleSignal>) -> JoinHandle<()> {
        let monitor = self.clone();

        tokio::spawn(async move {
            info!("Tab monitor started");

            while let Some(signal) = signals.recv().await {
                let monitor = monitor.clone();
                tokio::spawn(async move {
                    if let Err(e) = monitor.handle(signal).await {
                        warn!(error = %e, %signal, "Lifecycle handler failed");
                    }
                });
            }

            info!("Tab monitor stopped");
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
