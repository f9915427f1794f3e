// crates/siac-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: SIAC Gate Interfaces
// Description: Backend-agnostic seams implemented by storage crates.
// Purpose: Let the gateway persist widget state without naming a backend.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`WidgetStateStore`] is the only durable seam in the gateway. Implementations
//! must make the read-merge-write of [`WidgetStateStore::set`] atomic per
//! subject; ordering between concurrent writers is decided by update
//! timestamps, never by which call arrives first.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::SubjectId;
use crate::core::WidgetState;
use crate::core::WidgetStateUpdate;

// ============================================================================
// SECTION: Widget State Store
// ============================================================================

/// Widget state storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WidgetStoreError {
    /// Backend I/O failure.
    #[error("widget state store io error: {0}")]
    Io(String),
    /// Stored data could not be decoded.
    #[error("widget state store corrupted: {0}")]
    Corrupted(String),
    /// Backend-specific failure.
    #[error("widget state store error: {0}")]
    Store(String),
}

/// Per-subject widget preference storage.
pub trait WidgetStateStore: Send + Sync {
    /// Returns the subject's state, or defaults when never written.
    ///
    /// # Errors
    ///
    /// Returns [`WidgetStoreError`] when the backend fails.
    fn get(&self, subject_id: &SubjectId) -> Result<WidgetState, WidgetStoreError>;

    /// Merges `update` into the subject's state and returns the result.
    ///
    /// # Errors
    ///
    /// Returns [`WidgetStoreError`] when the backend fails.
    fn set(
        &self,
        subject_id: &SubjectId,
        update: &WidgetStateUpdate,
    ) -> Result<WidgetState, WidgetStoreError>;
}
