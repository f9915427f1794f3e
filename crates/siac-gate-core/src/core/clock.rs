// crates/siac-gate-core/src/core/clock.rs
// ============================================================================
// Module: SIAC Gate Clock
// Description: Injectable wall-clock abstraction.
// Purpose: Keep expiry checks and widget-state stamping testable.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Token expiry and widget-state timestamps read the current instant through
//! [`Clock`] rather than the system clock directly. [`ManualClock`] lets tests
//! pin and advance time deterministically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use time::Duration;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// Returns the current UTC instant.
    fn now(&self) -> OffsetDateTime;
}

/// Clock backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Settable clock for tests and replay.
#[derive(Debug)]
pub struct ManualClock {
    /// Current instant.
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    /// Creates a clock pinned at `now`.
    #[must_use]
    pub const fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Creates a clock pinned at a unix timestamp (seconds).
    #[must_use]
    pub fn at_unix(seconds: i64) -> Self {
        Self::new(OffsetDateTime::from_unix_timestamp(seconds).unwrap_or(OffsetDateTime::UNIX_EPOCH))
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: OffsetDateTime) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    /// Advances the clock by `delta`.
    pub fn advance(&self, delta: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += delta;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        self.now.lock().map_or(OffsetDateTime::UNIX_EPOCH, |guard| *guard)
    }
}
