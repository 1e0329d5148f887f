//! Tracker facade and builder.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Tracker`] | Store, analytics log and monitor over one namespace |
//! | [`TrackerBuilder`] | Fluent configuration builder |
//!
//! # Example
//!
//! ```ignore
//! use tab_tracker::{Category, LifecycleSignal, Tracker};
//!
//! let tracker = Tracker::builder().in_memory().source(tabs).build()?;
//!
//! let (signals, _task) = tracker.spawn_monitor(64);
//! signals.send(LifecycleSignal::Installed).await?;
//!
//! let favorites = tracker.view("", Category::Favorites).await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for tracker configuration.
pub mod builder;

/// Core tracker implementation.
pub mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::TrackerBuilder;
pub use core::Tracker;
