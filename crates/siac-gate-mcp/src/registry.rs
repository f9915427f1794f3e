// crates/siac-gate-mcp/src/registry.rs
// ============================================================================
// Module: Tool Registry
// Description: Static mapping from tool name to definition, projection, handler.
// Purpose: Provide the single lookup every tool call is dispatched through.
// Dependencies: async-trait, serde_json, siac-gate-core, thiserror
// ============================================================================

//! ## Overview
//! A [`RegisteredTool`] bundles the immutable [`ToolDefinition`], the
//! [`ChannelProjection`] used to compose its output, and its
//! [`ToolHandler`]. The [`ToolRegistry`] is built once at startup, rejects
//! duplicate names, and lists tools in insertion order.
//!
//! Handlers receive their capabilities through [`ToolContext`]: the verified
//! identity (protected tools only), the clock, and the widget state store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use siac_gate_core::BusinessFailure;
use siac_gate_core::ChannelProjection;
use siac_gate_core::Clock;
use siac_gate_core::IdentifierError;
use siac_gate_core::ProjectionError;
use siac_gate_core::ToolDefinition;
use siac_gate_core::ToolDefinitionError;
use siac_gate_core::ToolDescriptor;
use siac_gate_core::ToolOutput;
use siac_gate_core::WidgetStateStore;
use thiserror::Error;

use crate::verifier::VerifiedClaims;

// ============================================================================
// SECTION: Handler Interface
// ============================================================================

/// Capabilities handed to a tool handler for one call.
#[derive(Clone)]
pub struct ToolContext {
    /// Verified caller; `None` for read-only tools.
    pub identity: Option<VerifiedClaims>,
    /// Clock for timestamps.
    pub clock: Arc<dyn Clock>,
    /// Widget preference store.
    pub widget_state: Arc<dyn WidgetStateStore>,
    /// Request identifier, when the transport supplied one.
    pub request_id: Option<String>,
}

impl ToolContext {
    /// Verified subject, when present.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.identity.as_ref().map(|claims| claims.subject.as_str())
    }
}

/// Handler failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolCallError {
    /// Arguments do not match the tool's input schema.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// Domain-level failure reported to the caller as an error result.
    #[error("{}: {}", .0.code, .0.message)]
    Business(BusinessFailure),
    /// Unexpected failure; never shown to the caller.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Business logic behind one tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Runs the tool and returns its flat raw output.
    async fn call(&self, context: &ToolContext, arguments: Value)
    -> Result<ToolOutput, ToolCallError>;
}

/// Parses handler arguments, mapping failures to invalid params.
///
/// # Errors
///
/// Returns [`ToolCallError::InvalidParams`] when `arguments` does not decode.
pub fn parse_arguments<T: serde::de::DeserializeOwned>(
    arguments: Value,
) -> Result<T, ToolCallError> {
    let arguments = if arguments.is_null() { Value::Object(serde_json::Map::new()) } else { arguments };
    serde_json::from_value(arguments).map_err(|err| ToolCallError::InvalidParams(err.to_string()))
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registry construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two tools share a name.
    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),
    /// Tool name is invalid.
    #[error(transparent)]
    Name(#[from] IdentifierError),
    /// Tool definition is invalid.
    #[error(transparent)]
    Definition(#[from] ToolDefinitionError),
    /// Channel projection is invalid.
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// A tool as dispatched by the router.
#[derive(Clone)]
pub struct RegisteredTool {
    /// Immutable descriptor.
    definition: ToolDefinition,
    /// Output channel assignment.
    projection: ChannelProjection,
    /// Business logic.
    handler: Arc<dyn ToolHandler>,
}

impl RegisteredTool {
    /// Bundles a tool.
    #[must_use]
    pub fn new(
        definition: ToolDefinition,
        projection: ChannelProjection,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            definition,
            projection,
            handler,
        }
    }

    /// Tool descriptor.
    #[must_use]
    pub const fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    /// Output channel assignment.
    #[must_use]
    pub const fn projection(&self) -> &ChannelProjection {
        &self.projection
    }

    /// Business logic.
    #[must_use]
    pub fn handler(&self) -> &dyn ToolHandler {
        self.handler.as_ref()
    }
}

/// Static tool lookup.
pub struct ToolRegistry {
    /// Tools in insertion order.
    tools: Vec<RegisteredTool>,
    /// Name to position in `tools`.
    index: BTreeMap<String, usize>,
}

impl ToolRegistry {
    /// Builds the registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateTool`] when two tools share a name.
    pub fn new(tools: Vec<RegisteredTool>) -> Result<Self, RegistryError> {
        let mut index = BTreeMap::new();
        for (position, tool) in tools.iter().enumerate() {
            let name = tool.definition.name().to_string();
            if index.insert(name.clone(), position).is_some() {
                return Err(RegistryError::DuplicateTool(name));
            }
        }
        Ok(Self {
            tools,
            index,
        })
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).and_then(|position| self.tools.get(*position))
    }

    /// Tools in insertion order.
    #[must_use]
    pub fn list(&self) -> &[RegisteredTool] {
        &self.tools
    }

    /// Discovery descriptors in insertion order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|tool| tool.definition.descriptor()).collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// True when no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
