// crates/siac-gate-mcp/src/tools/validate_template.rs
// ============================================================================
// Module: Template Validation Tool
// Description: Read-only compliance check of a WhatsApp message template.
// Purpose: Report pass/fail to the model and the full rule report to the card.
// Dependencies: serde, serde_json, sha2, siac-gate-core
// ============================================================================

//! ## Overview
//! Rules run in a fixed order and the first failing rule decides the result:
//! minimum length, prohibited promotional words, unbalanced placeholders, and
//! a placeholder at either end of the body. A long Marketing body passes with
//! a warning. The model sees only the verdict; the rule report, preview HTML,
//! and body text are meta-only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use sha2::Digest;
use sha2::Sha256;
use siac_gate_core::ChannelProjection;
use siac_gate_core::StructuredContent;
use siac_gate_core::ToolDefinition;
use siac_gate_core::ToolName;
use siac_gate_core::ToolOutput;

use super::bounded;
use super::escape_html;
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
pub const NAME: &str = "siac.validate_template";
/// Rendering template.
const TEMPLATE: &str = "ui://widget/TemplateValidationCard.html";
/// Minimum body length in characters.
const MIN_BODY_CHARS: usize = 10;
/// Marketing body length above which a warning is added.
const MARKETING_WARN_CHARS: usize = 1000;
/// Largest accepted body.
const MAX_BODY_CHARS: usize = 4096;
/// Words rejected as promotional.
const PROHIBITED_WORDS: [&str; 2] = ["spam", "urgent"];
/// Rules reported to the card, in evaluation order.
const RULES_APPLIED: [&str; 5] = [
    "Minimum length check",
    "Spam content detection",
    "Variable syntax validation",
    "Parameter placement validation",
    "Category-specific length limits",
];

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Template category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateCategory {
    /// Promotional content.
    Marketing,
    /// Transactional updates.
    Utility,
    /// One-time codes.
    Authentication,
}

impl TemplateCategory {
    /// Wire label.
    const fn as_str(self) -> &'static str {
        match self {
            Self::Marketing => "Marketing",
            Self::Utility => "Utility",
            Self::Authentication => "Authentication",
        }
    }
}

/// Call arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Arguments {
    /// Template name.
    template_name: String,
    /// Body text.
    body_text: String,
    /// Category.
    category: TemplateCategory,
    /// Language code such as `es_ES`.
    language_code: String,
}

// ============================================================================
// SECTION: Rules
// ============================================================================

/// One finding from the rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Finding {
    /// Field the finding applies to.
    field: &'static str,
    /// What is wrong.
    message: &'static str,
    /// `error` or `warning`.
    severity: &'static str,
    /// How to fix it.
    suggestion: &'static str,
}

/// Applies the rules in order; returns whether the template passed and the findings.
fn evaluate(body: &str, category: TemplateCategory) -> (bool, Vec<Finding>) {
    let error = |message, suggestion| Finding {
        field: "body_text",
        message,
        severity: "error",
        suggestion,
    };
    let lower = body.to_lowercase();
    let length = body.chars().count();
    if length < MIN_BODY_CHARS {
        return (false, vec![error(
            "Template body too short for Meta requirements",
            "Add more descriptive content to meet minimum length requirements",
        )]);
    }
    if PROHIBITED_WORDS.iter().any(|word| lower.contains(word)) {
        return (false, vec![error(
            "Contains prohibited promotional language",
            "Remove promotional keywords and use professional tone",
        )]);
    }
    if body.matches("{{").count() != body.matches("}}").count() {
        return (false, vec![error(
            "Mismatched curly braces in template variables",
            "Ensure all {{variable}} placeholders are properly closed",
        )]);
    }
    if body.starts_with("{{") || body.ends_with("}}") {
        return (false, vec![error(
            "Template cannot start or end with a parameter",
            "Add descriptive text before the first parameter and after the last parameter",
        )]);
    }
    if category == TemplateCategory::Marketing && length > MARKETING_WARN_CHARS {
        return (true, vec![Finding {
            field: "body_text",
            message: "Marketing template exceeds recommended length",
            severity: "warning",
            suggestion: "Consider shortening the message for better engagement",
        }]);
    }
    (true, Vec::new())
}

/// Stable four-digit client reference derived from the template name.
fn client_reference(template_name: &str) -> String {
    let digest = Sha256::digest(template_name.as_bytes());
    let value = u16::from_be_bytes([digest[0], digest[1]]) % 10_000;
    format!("client_{value:04}")
}

/// Preview markup for the validation card.
fn html_mockup(name: &str, body: &str, category: &str, language: &str) -> String {
    let body = escape_html(body)
        .replace("{{1}}", "<span class=\"variable\">John</span>")
        .replace("{{2}}", "<span class=\"variable\">Premium</span>");
    format!(
        "<div class=\"whatsapp-template-preview\"><div class=\"template-header\"><span \
         class=\"template-name\">{}</span><span class=\"category-badge\">{category}</span></div><div \
         class=\"template-body\">{body}</div><div class=\"template-footer\"><span \
         class=\"language-badge\">{}</span></div></div>",
        escape_html(name),
        escape_html(language)
    )
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Validation handler.
struct ValidateTemplate;

#[async_trait]
impl ToolHandler for ValidateTemplate {
    async fn call(
        &self,
        context: &ToolContext,
        arguments: Value,
    ) -> Result<ToolOutput, ToolCallError> {
        let args: Arguments = parse_arguments(arguments)?;
        bounded("template_name", &args.template_name, 128)?;
        bounded("language_code", &args.language_code, 16)?;
        bounded("body_text", &args.body_text, MAX_BODY_CHARS)?;

        let (passed, findings) = evaluate(&args.body_text, args.category);
        let status = if passed { "SUCCESS" } else { "FAILED" };
        let category = args.category.as_str();
        let checked_at = rfc3339(context.clock.now())?;

        Ok(ToolOutput::new()
            .with("validation_status", status)
            .with("template_name", args.template_name.clone())
            .with("passed_internal_checks", passed)
            .with("category", category)
            .with("language_code", args.language_code.clone())
            .with("client_id", client_reference(&args.template_name))
            .with(
                "raw_payload_for_preview",
                json!({
                    "template_name": args.template_name,
                    "body_text": args.body_text,
                    "category": category,
                    "language_code": args.language_code,
                    "validation_rules_applied": RULES_APPLIED,
                    "validation_timestamp": checked_at,
                    "estimated_review_time": "24-48 hours",
                }),
            )
            .with(
                "template_html_mockup",
                html_mockup(&args.template_name, &args.body_text, category, &args.language_code),
            )
            .with(
                "raw_validation_errors",
                json!({ "errors": findings, "overall_status": status }),
            ))
    }
}

/// Model-visible summary.
fn summary(structured: &StructuredContent) -> String {
    let name = text_field(structured, "template_name");
    if text_field(structured, "validation_status") == "SUCCESS" {
        format!(
            "Template '{name}' validation completed successfully. The template passed all Meta \
             compliance checks and is ready for registration."
        )
    } else {
        format!(
            "Template '{name}' validation failed. The template requires corrections before it can \
             be submitted to Meta for approval."
        )
    }
}

/// Registry entry.
pub(super) fn tool() -> Result<RegisteredTool, RegistryError> {
    let definition = ToolDefinition::read_only(
        ToolName::parse(NAME)?,
        "Use this when you need to validate a WhatsApp message template for compliance, quality, \
         and approval status before sending campaigns.",
        json!({
            "type": "object",
            "properties": {
                "template_name": { "type": "string", "description": "Name of the template to validate" },
                "body_text": { "type": "string", "description": "The body text content of the template" },
                "category": {
                    "type": "string",
                    "enum": ["Marketing", "Utility", "Authentication"],
                    "description": "Template category"
                },
                "language_code": { "type": "string", "description": "Language code such as 'es_ES' or 'en_US'" }
            },
            "required": ["template_name", "body_text", "category", "language_code"],
            "additionalProperties": false
        }),
    )?
    .with_output_template(TEMPLATE);
    let projection = ChannelProjection::new(
        &[
            "validation_status",
            "template_name",
            "passed_internal_checks",
            "category",
            "language_code",
            "client_id",
        ],
        &["raw_payload_for_preview", "template_html_mockup", "raw_validation_errors"],
        summary,
    )?;
    Ok(RegisteredTool::new(definition, projection, Arc::new(ValidateTemplate)))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
