// crates/siac-gate-store-sqlite/src/lib.rs
// ============================================================================
// Module: SIAC Gate SQLite Store
// Description: SQLite-backed widget state persistence.
// Purpose: Re-export the durable WidgetStateStore implementation.
// Dependencies: crate::store
// ============================================================================

//! ## Overview
//! Durable [`siac_gate_core::WidgetStateStore`] backed by a single `SQLite`
//! database file.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::SqliteWidgetStateStore;
