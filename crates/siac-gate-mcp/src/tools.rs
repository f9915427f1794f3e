// crates/siac-gate-mcp/src/tools.rs
// ============================================================================
// Module: Tool Router
// Description: Authorized dispatch of tool calls and widget state access.
// Purpose: Run every call through the gate, the handler, and the composer.
// Dependencies: siac-gate-core, time, tokio, tracing
// ============================================================================

//! ## Overview
//! [`ToolRouter`] is the single entry point for tool calls on every
//! transport. A call is authorized by [`AuthorizationGate`], executed by the
//! tool's [`ToolHandler`](crate::registry::ToolHandler), and composed into the
//! three-channel [`ToolInvocationResult`]. Handler business failures become
//! error-shaped results; invalid arguments and internal failures become
//! [`ToolError`]s.
//!
//! [`siac_registry`] builds the SIAC tool set.
//!
//! ## Invariants
//! - No handler runs for a protected tool unless the gate allowed the call.
//! - Render-only fields never reach `structuredContent` or `content`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use siac_gate_core::Clock;
use siac_gate_core::StructuredContent;
use siac_gate_core::SubjectId;
use siac_gate_core::ToolDescriptor;
use siac_gate_core::ToolInvocationResult;
use siac_gate_core::WidgetState;
use siac_gate_core::WidgetStatePatch;
use siac_gate_core::WidgetStateStore;
use siac_gate_core::compose;
use siac_gate_core::compose_failure;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::auth::RequestContext;
use crate::gate::AuthChallenge;
use crate::gate::AuthorizationGate;
use crate::gate::AuthorizationOutcome;
use crate::registry::RegistryError;
use crate::registry::ToolCallError;
use crate::registry::ToolContext;
use crate::registry::ToolRegistry;

pub mod campaign_metrics;
pub mod register_template;
pub mod send_broadcast;
pub mod validate_template;

// ============================================================================
// SECTION: Tool Set
// ============================================================================

/// Builds the SIAC tool registry; protected tools require `required_scope`.
///
/// # Errors
///
/// Returns [`RegistryError`] when a definition or projection is invalid.
pub fn siac_registry(required_scope: &str) -> Result<ToolRegistry, RegistryError> {
    ToolRegistry::new(vec![
        validate_template::tool()?,
        campaign_metrics::tool()?,
        register_template::tool(required_scope)?,
        send_broadcast::tool(required_scope)?,
    ])
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tool routing errors surfaced as JSON-RPC errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// Tool name not registered.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// Protected tool rejected by the gate.
    #[error("unauthorized: {}", .0.detail())]
    Unauthorized(AuthChallenge),
    /// Arguments rejected.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// Unexpected failure.
    #[error("internal error: {0}")]
    Internal(String),
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Router construction inputs.
pub struct ToolRouterConfig {
    /// Registered tools.
    pub registry: Arc<ToolRegistry>,
    /// Authorization gate over the same registry.
    pub gate: Arc<AuthorizationGate>,
    /// Widget preference store.
    pub widget_state: Arc<dyn WidgetStateStore>,
    /// Clock handed to handlers.
    pub clock: Arc<dyn Clock>,
}

/// Dispatches tool calls and widget state operations.
#[derive(Clone)]
pub struct ToolRouter {
    /// Registered tools.
    registry: Arc<ToolRegistry>,
    /// Authorization gate.
    gate: Arc<AuthorizationGate>,
    /// Widget preference store.
    widget_state: Arc<dyn WidgetStateStore>,
    /// Clock handed to handlers.
    clock: Arc<dyn Clock>,
}

impl ToolRouter {
    /// Creates a router.
    #[must_use]
    pub fn new(config: ToolRouterConfig) -> Self {
        Self {
            registry: config.registry,
            gate: config.gate,
            widget_state: config.widget_state,
            clock: config.clock,
        }
    }

    /// Discovery listing in registration order.
    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.registry.descriptors()
    }

    /// Authorizes, executes, and composes one tool call.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when the tool is unknown, the caller is not
    /// authorized, the arguments are invalid, or composition fails.
    pub async fn call_tool(
        &self,
        context: &RequestContext,
        name: &str,
        arguments: Value,
    ) -> Result<ToolInvocationResult, ToolError> {
        let outcome = self
            .gate
            .authorize(name, context)
            .await
            .map_err(|err| ToolError::UnknownTool(err.0))?;
        let (tool, identity) = match outcome {
            AuthorizationOutcome::Allowed {
                tool,
                identity,
            } => (tool, identity),
            AuthorizationOutcome::Denied(challenge) => {
                return Err(ToolError::Unauthorized(challenge));
            }
        };

        let tool_context = ToolContext {
            identity,
            clock: Arc::clone(&self.clock),
            widget_state: Arc::clone(&self.widget_state),
            request_id: context.request_id.clone(),
        };
        let definition = tool.definition();
        let result = match tool.handler().call(&tool_context, arguments).await {
            Ok(raw) => compose(definition, tool.projection(), raw).map_err(|err| {
                tracing::error!(tool = name, error = %err, "tool output could not be composed");
                ToolError::Internal("tool output could not be composed".to_string())
            })?,
            Err(ToolCallError::Business(failure)) => {
                tracing::info!(tool = name, code = %failure.code, "tool reported business failure");
                compose_failure(definition, &failure)
            }
            Err(ToolCallError::InvalidParams(message)) => {
                return Err(ToolError::InvalidParams(message));
            }
            Err(ToolCallError::Internal(message)) => {
                tracing::error!(tool = name, error = %message, "tool execution failed");
                return Err(ToolError::Internal("tool execution failed".to_string()));
            }
        };
        tracing::debug!(
            tool = name,
            structured_fields = result.structured_content.len(),
            meta_fields = result.meta.len(),
            is_error = result.is_error,
            "tool result composed"
        );
        Ok(result)
    }

    /// Reads a subject's widget state.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidParams`] for an invalid subject id and
    /// [`ToolError::Internal`] when the store fails.
    pub fn widget_state_get(&self, subject_id: &str) -> Result<WidgetState, ToolError> {
        let subject = parse_subject(subject_id)?;
        run_blocking(|| self.widget_state.get(&subject)).map_err(|err| {
            tracing::error!(error = %err, "widget state read failed");
            ToolError::Internal("widget state read failed".to_string())
        })
    }

    /// Merges a patch into a subject's widget state.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidParams`] for an invalid subject id and
    /// [`ToolError::Internal`] when the store fails.
    pub fn widget_state_set(
        &self,
        subject_id: &str,
        patch: WidgetStatePatch,
    ) -> Result<WidgetState, ToolError> {
        let subject = parse_subject(subject_id)?;
        if patch.is_empty() {
            return Err(ToolError::InvalidParams(
                "widget state update must set timeFilter or selectedMetric".to_string(),
            ));
        }
        let update = patch.stamp(self.clock.as_ref());
        run_blocking(|| self.widget_state.set(&subject, &update)).map_err(|err| {
            tracing::error!(error = %err, "widget state write failed");
            ToolError::Internal("widget state write failed".to_string())
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a subject id from a request.
fn parse_subject(subject_id: &str) -> Result<SubjectId, ToolError> {
    SubjectId::parse(subject_id).map_err(|err| ToolError::InvalidParams(err.to_string()))
}

/// Runs blocking store work, shifting off the async worker when possible.
pub(crate) fn run_blocking<T>(work: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}

/// Rejects strings longer than `max_chars`.
pub(crate) fn bounded(field: &str, value: &str, max_chars: usize) -> Result<(), ToolCallError> {
    if value.chars().count() > max_chars {
        return Err(ToolCallError::InvalidParams(format!(
            "{field} exceeds {max_chars} characters"
        )));
    }
    Ok(())
}

/// Escapes text for inclusion in HTML.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Formats a timestamp as RFC 3339.
pub(crate) fn rfc3339(at: OffsetDateTime) -> Result<String, ToolCallError> {
    at.format(&Rfc3339).map_err(|err| ToolCallError::Internal(err.to_string()))
}

/// String field of a structured result, empty when absent.
pub(crate) fn text_field<'a>(structured: &'a StructuredContent, key: &str) -> &'a str {
    structured.get(key).and_then(Value::as_str).unwrap_or_default()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap for clarity."
    )]

    use super::*;

    #[test]
    fn registry_lists_the_four_siac_tools_in_order() {
        let registry = siac_registry("siac.user.full_access").unwrap();
        let names: Vec<String> =
            registry.descriptors().into_iter().map(|descriptor| descriptor.name).collect();
        assert_eq!(names, vec![
            validate_template::NAME,
            campaign_metrics::NAME,
            register_template::NAME,
            send_broadcast::NAME,
        ]);
    }

    #[test]
    fn protected_tools_carry_the_configured_scope() {
        let registry = siac_registry("custom.scope").unwrap();
        let register = registry.get(register_template::NAME).unwrap();
        assert_eq!(register.definition().required_scope(), Some("custom.scope"));
        assert!(registry.get(validate_template::NAME).unwrap().definition().is_read_only());
    }

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(escape_html("<a href=\"x\">&'</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn bounded_counts_characters() {
        assert!(bounded("name", "ññññ", 4).is_ok());
        assert!(matches!(bounded("name", "ñññññ", 4), Err(ToolCallError::InvalidParams(_))));
    }
}
