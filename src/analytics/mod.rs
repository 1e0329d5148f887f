//! Analytics event log and observer messages.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `log` | Bounded FIFO event log |
//! | `message` | Inbound `TAB_ANALYTICS` contract |

// ============================================================================
// Submodules
// ============================================================================

/// Bounded event log.
pub mod log;

/// Inbound observer messages.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use log::{AnalyticsEvent, AnalyticsLog};
pub use message::{InboundMessage, TAB_ANALYTICS, TabAnalytics};
