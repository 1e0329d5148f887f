//! Wall clock abstraction.
//!
//! All timestamps in the namespace are milliseconds since the Unix epoch.
//! Components take an `Arc<dyn Clock>` so tests can pin time.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// ============================================================================
// Constants
// ============================================================================

/// Milliseconds per second.
pub const SECOND_MS: u64 = 1_000;

/// Milliseconds per minute.
pub const MINUTE_MS: u64 = 60 * SECOND_MS;

/// Milliseconds per hour.
pub const HOUR_MS: u64 = 60 * MINUTE_MS;

/// Milliseconds per day.
pub const DAY_MS: u64 = 24 * HOUR_MS;

// ============================================================================
// Clock
// ============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

// ============================================================================
// SystemClock
// ============================================================================

/// Clock backed by the system wall time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

// ============================================================================
// ManualClock
// ============================================================================

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    /// Creates a clock pinned at `now_ms`.
    #[inline]
    #[must_use]
    pub const fn new(now_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
        }
    }

    /// Sets the current time.
    #[inline]
    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    /// Advances the clock by `delta_ms`.
    #[inline]
    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Tests
// ============================================================================
