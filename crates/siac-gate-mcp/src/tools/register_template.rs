// crates/siac-gate-mcp/src/tools/register_template.rs
// ============================================================================
// Module: Template Registration Tool
// Description: Protected registration of a validated template.
// Purpose: Record the template in SIAC and submit it for Meta review.
// Dependencies: serde, serde_json, siac-gate-core
// ============================================================================

//! ## Overview
//! Registration outcome is keyed on the template id: `invalid` fails,
//! `pending` stays in review, anything else completes. A failed registration
//! is still a successful call; the status field carries the outcome. The
//! audit trail records the verified subject.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use siac_gate_core::ChannelProjection;
use siac_gate_core::StructuredContent;
use siac_gate_core::ToolDefinition;
use siac_gate_core::ToolName;
use siac_gate_core::ToolOutput;

use super::bounded;
use super::rfc3339;
use super::text_field;
use crate::registry::RegisteredTool;
use crate::registry::RegistryError;
use crate::registry::ToolCallError;
use crate::registry::ToolContext;
use crate::registry::ToolHandler;
use crate::registry::parse_arguments;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tool name.
pub const NAME: &str = "siac.register_template";
/// Longest accepted identifier argument.
const MAX_ID_CHARS: usize = 128;

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Call arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Arguments {
    /// SIAC template identifier.
    template_id: String,
    /// Identifier assigned by Meta on upload.
    meta_template_id: String,
    /// Owning client.
    client_id: String,
}

/// Registration outcome for a template id.
fn registration_status(template_id: &str) -> &'static str {
    let id = template_id.to_lowercase();
    if id.contains("invalid") {
        "REGISTRATION_FAILED"
    } else if id.contains("pending") {
        "PENDING_META_REVIEW"
    } else {
        "REGISTRATION_COMPLETE"
    }
}

/// Registration handler.
struct RegisterTemplate;

#[async_trait]
impl ToolHandler for RegisterTemplate {
    async fn call(
        &self,
        context: &ToolContext,
        arguments: Value,
    ) -> Result<ToolOutput, ToolCallError> {
        let args: Arguments = parse_arguments(arguments)?;
        bounded("template_id", &args.template_id, MAX_ID_CHARS)?;
        bounded("meta_template_id", &args.meta_template_id, MAX_ID_CHARS)?;
        bounded("client_id", &args.client_id, MAX_ID_CHARS)?;

        let status = registration_status(&args.template_id);
        let review = if status == "REGISTRATION_COMPLETE" { "SUBMITTED" } else { "FAILED" };
        let now = rfc3339(context.clock.now())?;
        let submitted_by = context.subject().unwrap_or("system");

        Ok(ToolOutput::new()
            .with("status", status)
            .with("template_id", args.template_id.clone())
            .with("meta_template_id", args.meta_template_id.clone())
            .with("client_id", args.client_id.clone())
            .with("registration_timestamp", now.clone())
            .with("meta_review_status", review)
            .with(
                "registration_details",
                json!({
                    "template_id": args.template_id,
                    "meta_template_id": args.meta_template_id,
                    "client_id": args.client_id,
                    "registration_method": "API",
                    "submitted_by": submitted_by,
                    "estimated_meta_review_time": "24-72 hours",
                }),
            )
            .with(
                "next_steps",
                json!([
                    "Monitor Meta review status",
                    "Update template status in SIAC",
                    "Notify stakeholders of submission"
                ]),
            )
            .with(
                "audit_trail",
                json!({
                    "created_at": now,
                    "action": "template_registration",
                    "client_id": args.client_id,
                    "request_id": context.request_id,
                }),
            ))
    }
}

/// Model-visible summary.
fn summary(structured: &StructuredContent) -> String {
    let template_id = text_field(structured, "template_id");
    match text_field(structured, "status") {
        "REGISTRATION_COMPLETE" => format!(
            "Template {template_id} has been successfully registered in SIAC and submitted to \
             Meta for final review. Meta Template ID: {}",
            text_field(structured, "meta_template_id")
        ),
        "PENDING_META_REVIEW" => {
            format!("Template {template_id} registration is in progress. Meta review is pending.")
        }
        _ => format!(
            "Template {template_id} registration failed. Please check the template data and try \
             again."
        ),
    }
}

/// Registry entry.
pub(super) fn tool(required_scope: &str) -> Result<RegisteredTool, RegistryError> {
    let definition = ToolDefinition::protected(
        ToolName::parse(NAME)?,
        "Use this when you need to register a validated template in the SIAC system and submit \
         it to Meta for final approval. This action requires user confirmation.",
        json!({
            "type": "object",
            "properties": {
                "template_id": { "type": "string", "description": "Identifier of the template to register" },
                "meta_template_id": { "type": "string", "description": "Meta template ID after upload to Meta system" },
                "client_id": { "type": "string", "description": "Identifier of the client for traceability" }
            },
            "required": ["template_id", "meta_template_id", "client_id"],
            "additionalProperties": false
        }),
        required_scope,
    )?
    .with_widget_accessible(true)
    .with_status_messages(
        "Registering template in SIAC and Meta systems...",
        "Template registered and submitted for final Meta review.",
    );
    let projection = ChannelProjection::new(
        &[
            "status",
            "template_id",
            "meta_template_id",
            "client_id",
            "registration_timestamp",
            "meta_review_status",
        ],
        &["registration_details", "next_steps", "audit_trail"],
        summary,
    )?;
    Ok(RegisteredTool::new(definition, projection, Arc::new(RegisterTemplate)))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
