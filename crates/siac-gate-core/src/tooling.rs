// crates/siac-gate-core/src/tooling.rs
// ============================================================================
// Module: SIAC Gate Tool Definitions
// Description: Immutable descriptors for the tools exposed by the gateway.
// Purpose: Tie each tool name to its access class and rendering hints.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`ToolDefinition`] is either read-only (callable without a token) or
//! protected by exactly one OAuth scope. The pairing is carried by
//! [`ToolAccess`] so a read-only tool can never hold a scope and a protected
//! tool can never lack one. [`ToolDescriptor`] is the discovery-listing shape.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::core::ToolName;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of an OAuth scope token.
const MAX_SCOPE_LENGTH: usize = 256;
/// Meta key carrying the rendering template pointer.
pub const OUTPUT_TEMPLATE_META_KEY: &str = "openai/outputTemplate";
/// Meta key flagging tools callable from the rendered widget.
const WIDGET_ACCESSIBLE_META_KEY: &str = "openai/widgetAccessible";
/// Meta key for the in-progress status string.
const INVOKING_META_KEY: &str = "openai/toolInvocation/invoking";
/// Meta key for the completed status string.
const INVOKED_META_KEY: &str = "openai/toolInvocation/invoked";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tool definition construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolDefinitionError {
    /// Scope is not a valid RFC 6749 scope token.
    #[error("invalid scope for {tool}: {reason}")]
    InvalidScope {
        /// Tool being defined.
        tool: String,
        /// Why the scope was rejected.
        reason: &'static str,
    },
    /// Input schema is not a JSON object.
    #[error("input schema for {0} must be a JSON object")]
    InvalidSchema(String),
}

// ============================================================================
// SECTION: Access
// ============================================================================

/// Authorization class of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolAccess {
    /// Callable without a token.
    ReadOnly,
    /// Requires a verified token carrying `scope`.
    Protected {
        /// Required OAuth scope.
        scope: String,
    },
}

// ============================================================================
// SECTION: Definition
// ============================================================================

/// Immutable tool descriptor registered at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    /// Unique tool name.
    name: ToolName,
    /// Human description shown in discovery.
    description: String,
    /// JSON Schema for call arguments.
    input_schema: Value,
    /// Authorization class.
    access: ToolAccess,
    /// Optional rendering template identifier.
    output_template: Option<String>,
    /// Whether the rendered widget may call this tool.
    widget_accessible: bool,
    /// Status string while the call runs.
    invoking_message: Option<String>,
    /// Status string after the call completes.
    invoked_message: Option<String>,
}

impl ToolDefinition {
    /// Defines a read-only tool.
    ///
    /// # Errors
    ///
    /// Returns [`ToolDefinitionError::InvalidSchema`] when `input_schema` is
    /// not an object.
    pub fn read_only(
        name: ToolName,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Result<Self, ToolDefinitionError> {
        Self::build(name, description.into(), input_schema, ToolAccess::ReadOnly)
    }

    /// Defines a tool protected by `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolDefinitionError`] when the scope is not a single scope
    /// token or the schema is not an object.
    pub fn protected(
        name: ToolName,
        description: impl Into<String>,
        input_schema: Value,
        scope: impl Into<String>,
    ) -> Result<Self, ToolDefinitionError> {
        let scope = scope.into();
        validate_scope(&name, &scope)?;
        Self::build(name, description.into(), input_schema, ToolAccess::Protected {
            scope,
        })
    }

    /// Shared constructor.
    fn build(
        name: ToolName,
        description: String,
        input_schema: Value,
        access: ToolAccess,
    ) -> Result<Self, ToolDefinitionError> {
        if !input_schema.is_object() {
            return Err(ToolDefinitionError::InvalidSchema(name.to_string()));
        }
        Ok(Self {
            name,
            description,
            input_schema,
            access,
            output_template: None,
            widget_accessible: false,
            invoking_message: None,
            invoked_message: None,
        })
    }

    /// Attaches a rendering template identifier.
    #[must_use]
    pub fn with_output_template(mut self, template: impl Into<String>) -> Self {
        self.output_template = Some(template.into());
        self
    }

    /// Marks the tool as callable from the rendered widget.
    #[must_use]
    pub const fn with_widget_accessible(mut self, accessible: bool) -> Self {
        self.widget_accessible = accessible;
        self
    }

    /// Sets the host status strings shown during and after a call.
    #[must_use]
    pub fn with_status_messages(
        mut self,
        invoking: impl Into<String>,
        invoked: impl Into<String>,
    ) -> Self {
        self.invoking_message = Some(invoking.into());
        self.invoked_message = Some(invoked.into());
        self
    }

    /// Tool name.
    #[must_use]
    pub const fn name(&self) -> &ToolName {
        &self.name
    }

    /// Human description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Argument schema.
    #[must_use]
    pub const fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Authorization class.
    #[must_use]
    pub const fn access(&self) -> &ToolAccess {
        &self.access
    }

    /// True when callable without a token.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        matches!(self.access, ToolAccess::ReadOnly)
    }

    /// Required scope; `None` exactly when the tool is read-only.
    #[must_use]
    pub fn required_scope(&self) -> Option<&str> {
        match &self.access {
            ToolAccess::ReadOnly => None,
            ToolAccess::Protected {
                scope,
            } => Some(scope),
        }
    }

    /// Rendering template identifier.
    #[must_use]
    pub fn output_template(&self) -> Option<&str> {
        self.output_template.as_deref()
    }

    /// Whether the rendered widget may call this tool.
    #[must_use]
    pub const fn widget_accessible(&self) -> bool {
        self.widget_accessible
    }

    /// Builds the discovery-listing descriptor.
    #[must_use]
    pub fn descriptor(&self) -> ToolDescriptor {
        let mut meta = Map::new();
        if let Some(template) = &self.output_template {
            meta.insert(OUTPUT_TEMPLATE_META_KEY.to_string(), Value::String(template.clone()));
        }
        meta.insert(WIDGET_ACCESSIBLE_META_KEY.to_string(), Value::Bool(self.widget_accessible));
        if let Some(message) = &self.invoking_message {
            meta.insert(INVOKING_META_KEY.to_string(), Value::String(message.clone()));
        }
        if let Some(message) = &self.invoked_message {
            meta.insert(INVOKED_META_KEY.to_string(), Value::String(message.clone()));
        }
        let security_schemes = match &self.access {
            ToolAccess::ReadOnly => vec![json!({ "type": "noauth" })],
            ToolAccess::Protected {
                scope,
            } => vec![json!({ "type": "oauth2", "scopes": [scope] })],
        };
        ToolDescriptor {
            name: self.name.to_string(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
            annotations: ToolAnnotations {
                read_only_hint: self.is_read_only(),
            },
            security_schemes,
            meta,
        }
    }
}

// ============================================================================
// SECTION: Discovery Descriptor
// ============================================================================

/// `tools/list` entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Tool name.
    pub name: String,
    /// Human description.
    pub description: String,
    /// Argument schema.
    pub input_schema: Value,
    /// Behavior hints.
    pub annotations: ToolAnnotations,
    /// Accepted security schemes.
    pub security_schemes: Vec<Value>,
    /// Host rendering hints.
    #[serde(rename = "_meta")]
    pub meta: Map<String, Value>,
}

/// Tool behavior hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    /// True when the tool does not mutate anything.
    pub read_only_hint: bool,
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates an RFC 6749 `scope-token` (`%x21 / %x23-5B / %x5D-7E`).
fn validate_scope(name: &ToolName, scope: &str) -> Result<(), ToolDefinitionError> {
    let reject = |reason| ToolDefinitionError::InvalidScope {
        tool: name.to_string(),
        reason,
    };
    if scope.is_empty() {
        return Err(reject("scope must be non-empty"));
    }
    if scope.len() > MAX_SCOPE_LENGTH {
        return Err(reject("scope exceeds max length"));
    }
    if !scope.bytes().all(|b| matches!(b, 0x21 | 0x23..=0x5B | 0x5D..=0x7E)) {
        return Err(reject("scope contains a character outside the scope-token alphabet"));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
