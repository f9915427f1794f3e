// crates/siac-gate-core/src/runtime/store.rs
// ============================================================================
// Module: SIAC Gate In-Memory Widget Store
// Description: Process-local widget state store.
// Purpose: Provide a store for tests and single-instance deployments.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides an in-memory implementation of [`WidgetStateStore`].
//! The merge runs while the map lock is held, so concurrent `set` calls for a
//! subject never interleave. State is lost on restart.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::SubjectId;
use crate::core::WidgetState;
use crate::core::WidgetStateRecord;
use crate::core::WidgetStateUpdate;
use crate::interfaces::WidgetStateStore;
use crate::interfaces::WidgetStoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory widget state store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryWidgetStateStore {
    /// Records keyed by subject, protected by a mutex.
    records: Arc<Mutex<BTreeMap<SubjectId, WidgetStateRecord>>>,
}

impl InMemoryWidgetStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl WidgetStateStore for InMemoryWidgetStateStore {
    fn get(&self, subject_id: &SubjectId) -> Result<WidgetState, WidgetStoreError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| WidgetStoreError::Store("widget state store mutex poisoned".to_string()))?;
        Ok(guard.get(subject_id).map_or_else(
            || WidgetState::default_for(subject_id.clone()),
            |record| record.to_state(subject_id.clone()),
        ))
    }

    fn set(
        &self,
        subject_id: &SubjectId,
        update: &WidgetStateUpdate,
    ) -> Result<WidgetState, WidgetStoreError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| WidgetStoreError::Store("widget state store mutex poisoned".to_string()))?;
        let mut record = guard.get(subject_id).copied().unwrap_or_default();
        if record.merge(update) {
            guard.insert(subject_id.clone(), record);
        }
        drop(guard);
        Ok(record.to_state(subject_id.clone()))
    }
}
