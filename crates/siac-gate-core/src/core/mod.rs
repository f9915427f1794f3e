// crates/siac-gate-core/src/core/mod.rs
// ============================================================================
// Module: SIAC Gate Core Types
// Description: Identifiers, time, and widget state data model.
// Purpose: Group the plain data types shared by every gateway crate.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Plain data types with no I/O. Runtime behavior lives in
//! [`crate::runtime`]; pluggable seams live in [`crate::interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod identifiers;
pub mod clock;
pub mod widget;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::IdentifierError;
pub use identifiers::SubjectId;
pub use identifiers::ToolName;
pub use clock::Clock;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use widget::SelectedMetric;
pub use widget::Stamped;
pub use widget::TimeFilter;
pub use widget::WidgetState;
pub use widget::WidgetStatePatch;
pub use widget::WidgetStateRecord;
pub use widget::WidgetStateUpdate;
