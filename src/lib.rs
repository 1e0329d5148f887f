//! Tab Tracker - browser tab activity history and analytics.
//!
//! This library persists a record of every open browser tab in a shared
//! key-value namespace and keeps it current as the browser reports
//! lifecycle events.
//!
//! # Architecture
//!
//! Every component talks to the same [`Namespace`]:
//!
//! - **Monitor**: turns lifecycle signals into record upserts and removals
//! - **Store**: owns the `tab_<id>` record map and user-curated fields
//! - **Analytics**: bounded FIFO log of page interaction reports
//! - **Sync**: republishes the record set on every namespace change
//! - **Snapshot**: whole-namespace JSON export and key-level import
//!
//! Key design principles:
//!
//! - The namespace is the only shared state; there is no in-process cache
//! - Every mutation is read-whole-map, modify, write-whole-map
//! - Browser-owned fields are refreshed on every sighting; favorites and
//!   tags survive
//! - Undecodable entries are skipped on read and carried through on write
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tab_tracker::{BrowserTab, Category, LifecycleSignal, Result, StaticTabSource, Tracker};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let tabs = StaticTabSource::with_tabs(vec![
//!         BrowserTab::new(7, "https://example.com").with_title("Example"),
//!     ]);
//!
//!     let tracker = Tracker::builder()
//!         .file("./tab-tracker.json")
//!         .source(Arc::new(tabs))
//!         .build()?;
//!
//!     tracker.monitor().handle(LifecycleSignal::Installed).await?;
//!
//!     for tab in tracker.view("example", Category::All).await? {
//!         println!("{} ({} visits)", tab.title, tab.visit_count);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`analytics`] | Bounded event log, observer messages |
//! | [`clock`] | Wall clock abstraction |
//! | [`config`] | [`TrackerConfig`] and defaults |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe tab id |
//! | [`monitor`] | Lifecycle signal handling |
//! | [`namespace`] | Persisted key-value backends |
//! | [`query`] | Filtering, sorting, grouping |
//! | [`snapshot`] | Import and export |
//! | [`store`] | Tab record store |
//! | [`sync`] | Reactive sync bridge |
//! | [`tracker`] | [`Tracker`] facade and builder |

// ============================================================================
// Modules
// ============================================================================

/// Analytics event log.
///
/// - [`AnalyticsLog`] - bounded FIFO log under the `analytics` key
/// - [`InboundMessage`] - observer message contract
pub mod analytics;

/// Wall clock abstraction.
pub mod clock;

/// Tracker configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Tab lifecycle monitor.
pub mod monitor;

/// Persisted namespace backends.
pub mod namespace;

/// Pure filtering and formatting over record sets.
pub mod query;

/// Whole-namespace snapshot import and export.
pub mod snapshot;

/// Tab record store.
///
/// Use [`TabStore::upsert`] for browser sightings and the edit operations
/// for user-curated fields.
pub mod store;

/// Reactive sync bridge.
pub mod sync;

/// Tracker facade.
///
/// Use [`Tracker::builder()`] to create a configured tracker.
pub mod tracker;

// ============================================================================
// Re-exports
// ============================================================================

// Analytics types
pub use analytics::{AnalyticsEvent, AnalyticsLog, InboundMessage, TAB_ANALYTICS, TabAnalytics};

// Clock types
pub use clock::{Clock, ManualClock, SystemClock};

// Configuration types
pub use config::{RescanPolicy, TrackerConfig};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::TabId;

// Monitor types
pub use monitor::{
    BrowserTab, LifecycleSignal, SignalOutcome, StaticTabSource, TabMonitor, TabSource, TabStatus,
};

// Namespace types
pub use namespace::{FileNamespace, MemoryNamespace, Namespace, NamespaceChange, StorageKey};

// Query types
pub use query::{Category, TabFilter};

// Store types
pub use store::{TabObservation, TabPatch, TabRecord, TabStore};

// Sync types
pub use sync::{SyncBridge, SyncView};

// Tracker types
pub use tracker::{Tracker, TrackerBuilder};
