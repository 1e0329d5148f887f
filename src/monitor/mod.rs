//! Tab lifecycle monitor.
//!
//! Translates browser lifecycle signals into store upserts and removals.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | TabMonitor, signal handling, background task |
//! | `signal` | Lifecycle signal types |
//! | `source` | Open-tab enumeration |
//!
//! # Example
//!
//! ```ignore
//! let monitor = TabMonitor::new(store, Arc::new(source), TrackerConfig::new());
//! let (tx, rx) = tokio::sync::mpsc::channel(64);
//! let task = monitor.spawn(rx);
//!
//! tx.send(LifecycleSignal::Installed).await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod core;
mod signal;
mod source;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::{SignalOutcome, TabMonitor};
pub use signal::{LifecycleSignal, TabStatus};
pub use source::{BrowserTab, StaticTabSource, TabSource};
