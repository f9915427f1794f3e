// crates/siac-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: SIAC Gate Runtime
// Description: Response composition and in-memory widget storage.
// Purpose: Provide the request-path behavior shared by every transport.
// Dependencies: crate::core, crate::interfaces, crate::tooling
// ============================================================================

//! ## Overview
//! Runtime helpers that operate on the core data model.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod composer;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use composer::BusinessFailure;
pub use composer::ChannelProjection;
pub use composer::ComposeError;
pub use composer::ContentBlock;
pub use composer::ProjectionError;
pub use composer::StructuredContent;
pub use composer::SummaryFn;
pub use composer::ToolInvocationResult;
pub use composer::ToolOutput;
pub use composer::compose;
pub use composer::compose_failure;
pub use store::InMemoryWidgetStateStore;
