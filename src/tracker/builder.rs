//! Builder pattern for tracker configuration.
//!
//! # Example
//!
//! ```ignore
//! use tab_tracker::{Tracker, TrackerConfig};
//!
//! let tracker = Tracker::builder()
//!     .file("./tab-tracker.json")
//!     .source(browser_tabs)
//!     .config(TrackerConfig::new().with_analytics_capacity(500))
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::TrackerConfig;
use crate::error::{Error, Result};
use crate::monitor::{StaticTabSource, TabSource};
use crate::namespace::{FileNamespace, MemoryNamespace, Namespace};

use super::core::Tracker;

// ============================================================================
// NamespaceChoice
// ============================================================================

/// Where the tracker keeps its state.
#[derive(Clone)]
enum NamespaceChoice {
    /// Fresh in-memory namespace.
    Memory,
    /// JSON file at the given path.
    File(PathBuf),
    /// Caller-provided backend.
    Custom(Arc<dyn Namespace>),
}

impl fmt::Debug for NamespaceChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("Memory"),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

// ============================================================================
// TrackerBuilder
// ============================================================================

/// Builder for configuring a [`Tracker`] instance.
///
/// Use [`Tracker::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct TrackerBuilder {
    /// Namespace backend.
    namespace: Option<NamespaceChoice>,
    /// Open-tab source for the monitor.
    source: Option<Arc<dyn TabSource>>,
    /// Timestamp source.
    clock: Option<Arc<dyn Clock>>,
    /// Tracker configuration.
    config: TrackerConfig,
}

impl fmt::Debug for TrackerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerBuilder")
            .field("namespace", &self.namespace)
            .field("source", &self.source.is_some())
            .field("clock", &self.clock.is_some())
            .field("config", &self.config)
            .finish()
    }
}

// ============================================================================
// TrackerBuilder Implementation
// ============================================================================

impl TrackerBuilder {
    /// Creates a new builder with no namespace and default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a fresh in-memory namespace.
    #[inline]
    #[must_use]
    pub fn in_memory(mut self) -> Self {
        self.namespace = Some(NamespaceChoice::Memory);
        self
    }

    /// Uses a JSON file namespace at `path`.
    #[inline]
    #[must_use]
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.namespace = Some(NamespaceChoice::File(path.into()));
        self
    }

    /// Uses a caller-provided namespace.
    #[inline]
    #[must_use]
    pub fn namespace(mut self, namespace: Arc<dyn Namespace>) -> Self {
        self.namespace = Some(NamespaceChoice::Custom(namespace));
        self
    }

    /// Sets the open-tab source. Defaults to an empty [`StaticTabSource`].
    #[inline]
    #[must_use]
    pub fn source(mut self, source: Arc<dyn TabSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the clock. Defaults to [`SystemClock`].
    #[inline]
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replaces the configuration.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the tracker with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no namespace was chosen
    /// - [`Error::Config`] if the configuration is out of range
    pub fn build(self) -> Result<Tracker> {
        self.config.validate()?;
        let namespace = self.resolve_namespace()?;
        let source = self
            .source
            .unwrap_or_else(|| Arc::new(StaticTabSource::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        Ok(Tracker::new(namespace, source, clock, self.config))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl TrackerBuilder {
    /// Turns the namespace choice into a backend.
    fn resolve_namespace(&self) -> Result<Arc<dyn Namespace>> {
        let choice = self.namespace.clone().ok_or_else(|| {
            Error::config(
                "A namespace is required. Use .in_memory(), .file() or .namespace() to set it.\n\
                 Example: Tracker::builder().file(\"./tab-tracker.json\")",
            )
        })?;

        Ok(match choice {
            NamespaceChoice::Memory => Arc::new(MemoryNamespace::with_channel_capacity(
                self.config.change_channel_capacity,
            )),
            NamespaceChoice::File(path) => {
                if path.as_os_str().is_empty() {
                    return Err(Error::config("Namespace file path must not be empty"));
                }
                Arc::new(FileNamespace::with_channel_capacity(
                    path,
                    self.config.change_channel_capacity,
                ))
            }
            NamespaceChoice::Custom(namespace) => namespace,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
