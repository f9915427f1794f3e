// crates/siac-gate-mcp/src/retry.rs
// ============================================================================
// Module: Verifier Retry Policy
// Description: Bounded exponential backoff for transient verifier errors.
// Purpose: Retry upstream verification without unbounded waiting.
// Dependencies: async-trait, siac-gate-config, tokio
// ============================================================================

//! ## Overview
//! [`RetryPolicy`] computes capped exponential delays. Sleeping goes through
//! [`Sleeper`] so tests can observe delays without waiting on them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use siac_gate_config::RetryConfig;

// ============================================================================
// SECTION: Retry Policy
// ============================================================================

/// Exponential backoff settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_backoff: Duration,
    /// Growth factor per failed attempt.
    pub multiplier: u32,
    /// Cap on any single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            multiplier: 2,
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            multiplier: 1,
            max_backoff: Duration::ZERO,
        }
    }

    /// Builds the policy from `[auth.retry]`.
    #[must_use]
    pub const fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            multiplier: config.multiplier,
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Delay to wait after `failed_attempts` consecutive failures (1-based).
    #[must_use]
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1);
        self.multiplier
            .checked_pow(exponent)
            .and_then(|factor| self.initial_backoff.checked_mul(factor))
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }
}

// ============================================================================
// SECTION: Sleeper
// ============================================================================

/// Suspends the current task between retries.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Waits for `delay`.
    async fn sleep(&self, delay: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
