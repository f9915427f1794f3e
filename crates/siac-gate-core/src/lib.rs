// crates/siac-gate-core/src/lib.rs
// ============================================================================
// Module: SIAC Gate Core Library
// Description: Public API surface for the SIAC Gate core.
// Purpose: Expose tool definitions, channel composition, and widget state.
// Dependencies: crate::{core, interfaces, runtime, tooling}
// ============================================================================

//! ## Overview
//! SIAC Gate core holds the transport-independent pieces of the tool
//! gateway: immutable tool descriptors, the three-channel response composer,
//! and the widget preference model with its timestamped merge. It performs no
//! network I/O and knows nothing about tokens.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;
pub mod tooling;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::WidgetStateStore;
pub use interfaces::WidgetStoreError;
pub use runtime::BusinessFailure;
pub use runtime::ChannelProjection;
pub use runtime::ComposeError;
pub use runtime::ContentBlock;
pub use runtime::InMemoryWidgetStateStore;
pub use runtime::ProjectionError;
pub use runtime::StructuredContent;
pub use runtime::ToolInvocationResult;
pub use runtime::ToolOutput;
pub use runtime::compose;
pub use runtime::compose_failure;
pub use tooling::OUTPUT_TEMPLATE_META_KEY;
pub use tooling::ToolAccess;
pub use tooling::ToolDefinition;
pub use tooling::ToolDefinitionError;
pub use tooling::ToolDescriptor;
