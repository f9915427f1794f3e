// crates/siac-gate-core/src/runtime/composer.rs
// ============================================================================
// Module: SIAC Gate Response Composer
// Description: Splits raw tool output into model-visible and render-only channels.
// Purpose: Guarantee that render-only fields never reach the reasoning model.
// Dependencies: crate::tooling, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every tool declares a [`ChannelProjection`]: the ordered list of keys that
//! form `structuredContent` and the set of keys that are meta-only. The two
//! sets are disjoint by construction. [`compose`] routes each raw field to
//! its channel and fails closed on any field the projection does not name.
//!
//! The `content` summary is produced from the composed `structuredContent`
//! alone, so nothing routed to `meta` can appear in it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::tooling::OUTPUT_TEMPLATE_META_KEY;
use crate::tooling::ToolDefinition;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum elements in a structured array field.
pub const MAX_STRUCTURED_ARRAY_LEN: usize = 16;
/// Maximum byte length of a structured string value.
pub const MAX_STRUCTURED_STRING_BYTES: usize = 512;
/// Maximum byte length of the natural-language summary.
pub const MAX_SUMMARY_BYTES: usize = 512;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Model-visible channel.
pub type StructuredContent = Map<String, Value>;

/// Builds the `content` summary from structured content only.
pub type SummaryFn = fn(&StructuredContent) -> String;

/// Errors building a projection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    /// Key listed both as structured and meta-only.
    #[error("field {0} is assigned to more than one channel")]
    Overlap(String),
    /// Key listed twice in the same channel.
    #[error("field {0} is listed twice")]
    DuplicateKey(String),
    /// Key collides with a reserved meta key.
    #[error("field {0} is reserved")]
    ReservedKey(String),
}

/// Errors composing a tool result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    /// Raw output contained a field the projection does not name.
    #[error("tool {tool} produced unclassified field {field}")]
    UnclassifiedField {
        /// Tool name.
        tool: String,
        /// Offending field.
        field: String,
    },
    /// A structured field is not a scalar or short scalar array.
    #[error("tool {tool} structured field {field} rejected: {reason}")]
    StructuredTooComplex {
        /// Tool name.
        tool: String,
        /// Offending field.
        field: String,
        /// Rejection reason.
        reason: &'static str,
    },
}

// ============================================================================
// SECTION: Projection
// ============================================================================

/// Static per-tool channel assignment.
#[derive(Debug, Clone)]
pub struct ChannelProjection {
    /// Model-visible keys in output order.
    structured: Vec<&'static str>,
    /// Render-only keys.
    meta: BTreeSet<&'static str>,
    /// Summary builder.
    summary: SummaryFn,
}

impl ChannelProjection {
    /// Builds a projection.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] when a key is repeated, assigned to both
    /// channels, or collides with the template pointer key.
    pub fn new(
        structured: &[&'static str],
        meta: &[&'static str],
        summary: SummaryFn,
    ) -> Result<Self, ProjectionError> {
        let mut seen = BTreeSet::new();
        for key in structured {
            if !seen.insert(*key) {
                return Err(ProjectionError::DuplicateKey((*key).to_string()));
            }
        }
        let mut meta_keys = BTreeSet::new();
        for key in meta {
            if *key == OUTPUT_TEMPLATE_META_KEY {
                return Err(ProjectionError::ReservedKey((*key).to_string()));
            }
            if seen.contains(key) {
                return Err(ProjectionError::Overlap((*key).to_string()));
            }
            if !meta_keys.insert(*key) {
                return Err(ProjectionError::DuplicateKey((*key).to_string()));
            }
        }
        Ok(Self {
            structured: structured.to_vec(),
            meta: meta_keys,
            summary,
        })
    }

    /// Model-visible keys in output order.
    #[must_use]
    pub fn structured_keys(&self) -> &[&'static str] {
        &self.structured
    }

    /// Render-only keys.
    #[must_use]
    pub const fn meta_keys(&self) -> &BTreeSet<&'static str> {
        &self.meta
    }

    /// True when `key` may only appear in `meta`.
    #[must_use]
    pub fn is_meta_only(&self, key: &str) -> bool {
        self.meta.contains(key)
    }
}

// ============================================================================
// SECTION: Raw Output
// ============================================================================

/// Flat raw output of a tool handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput(Map<String, Value>);

impl ToolOutput {
    /// Creates an empty output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Adds a field in place.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Field lookup.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// Business-level failure reported by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessFailure {
    /// Stable machine-readable code.
    pub code: String,
    /// Short human-readable message.
    pub message: String,
}

impl BusinessFailure {
    /// Creates a failure.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Invocation Result
// ============================================================================

/// Text block in the `content` channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentBlock {
    /// Block kind; always `text`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Summary text.
    pub text: String,
}

/// Three-channel tool result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocationResult {
    /// Model-visible summary fields.
    pub structured_content: StructuredContent,
    /// Model-visible natural-language summary.
    pub content: Vec<ContentBlock>,
    /// Render-only payload.
    #[serde(rename = "_meta")]
    pub meta: Map<String, Value>,
    /// True for business failures.
    pub is_error: bool,
}

impl ToolInvocationResult {
    /// Concatenated summary text.
    #[must_use]
    pub fn summary(&self) -> String {
        self.content.iter().map(|block| block.text.as_str()).collect::<Vec<_>>().join("\n")
    }
}

// ============================================================================
// SECTION: Composition
// ============================================================================

/// Routes `raw` into the three channels according to `projection`.
///
/// # Errors
///
/// Returns [`ComposeError`] when a raw field is unclassified or a structured
/// field is not a bounded scalar value.
pub fn compose(
    tool: &ToolDefinition,
    projection: &ChannelProjection,
    raw: ToolOutput,
) -> Result<ToolInvocationResult, ComposeError> {
    let mut fields = raw.0;
    for key in fields.keys() {
        let structured = projection.structured.iter().any(|known| *known == key.as_str());
        if !structured && !projection.is_meta_only(key) {
            return Err(ComposeError::UnclassifiedField {
                tool: tool.name().to_string(),
                field: key.clone(),
            });
        }
    }

    let mut structured = StructuredContent::new();
    for key in &projection.structured {
        if let Some(value) = fields.remove(*key) {
            check_structured_value(&value).map_err(|reason| {
                ComposeError::StructuredTooComplex {
                    tool: tool.name().to_string(),
                    field: (*key).to_string(),
                    reason,
                }
            })?;
            structured.insert((*key).to_string(), value);
        }
    }

    let mut meta = template_meta(tool);
    meta.extend(fields);

    let text = bounded_summary((projection.summary)(&structured));
    Ok(ToolInvocationResult {
        structured_content: structured,
        content: vec![ContentBlock {
            kind: "text",
            text,
        }],
        meta,
        is_error: false,
    })
}

/// Builds the error-shaped result for a business failure.
#[must_use]
pub fn compose_failure(tool: &ToolDefinition, failure: &BusinessFailure) -> ToolInvocationResult {
    let mut structured = StructuredContent::new();
    structured.insert("status".to_string(), Value::String("ERROR".to_string()));
    structured.insert("error_code".to_string(), Value::String(failure.code.clone()));
    structured.insert("message".to_string(), Value::String(failure.message.clone()));
    let text = bounded_summary(format!("{} failed: {}", tool.name(), failure.message));
    ToolInvocationResult {
        structured_content: structured,
        content: vec![ContentBlock {
            kind: "text",
            text,
        }],
        meta: template_meta(tool),
        is_error: true,
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Meta map seeded with the tool's template pointer.
fn template_meta(tool: &ToolDefinition) -> Map<String, Value> {
    let mut meta = Map::new();
    if let Some(template) = tool.output_template() {
        meta.insert(OUTPUT_TEMPLATE_META_KEY.to_string(), Value::String(template.to_string()));
    }
    meta
}

/// Accepts scalars and short arrays of scalars.
fn check_structured_value(value: &Value) -> Result<(), &'static str> {
    match value {
        Value::Array(items) => {
            if items.len() > MAX_STRUCTURED_ARRAY_LEN {
                return Err("array too long");
            }
            items.iter().try_for_each(check_scalar)
        }
        other => check_scalar(other),
    }
}

/// Accepts null, bool, number, and bounded strings.
fn check_scalar(value: &Value) -> Result<(), &'static str> {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => Ok(()),
        Value::String(text) if text.len() <= MAX_STRUCTURED_STRING_BYTES => Ok(()),
        Value::String(_) => Err("string too long"),
        Value::Array(_) | Value::Object(_) => Err("nested values are not allowed"),
    }
}

/// Truncates a summary to [`MAX_SUMMARY_BYTES`] on a char boundary.
fn bounded_summary(mut text: String) -> String {
    if text.len() > MAX_SUMMARY_BYTES {
        let mut cut = MAX_SUMMARY_BYTES;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    text
}

// ============================================================================
// SECTION: Tests
// ============================================================================
