// crates/siac-gate-core/tests/composer.rs
// ============================================================================
// Module: Response Composer Tests
// Description: Channel routing and meta isolation for composed tool results.
// Purpose: Validate that meta-only fields never reach model-visible channels.
// Dependencies: siac-gate-core, serde_json
// ============================================================================

//! Response composer tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions use unwrap for clarity."
)]

use serde_json::Value;
use serde_json::json;
use siac_gate_core::ChannelProjection;
use siac_gate_core::ComposeError;
use siac_gate_core::OUTPUT_TEMPLATE_META_KEY;
use siac_gate_core::StructuredContent;
use siac_gate_core::ToolDefinition;
use siac_gate_core::ToolName;
use siac_gate_core::ToolOutput;
use siac_gate_core::compose;

fn summary(structured: &StructuredContent) -> String {
    let status = structured.get("validation_status").and_then(Value::as_str).unwrap_or("UNKNOWN");
    format!("Template validation {status}")
}

fn projection() -> ChannelProjection {
    ChannelProjection::new(
        &["validation_status", "template_name", "passed_internal_checks"],
        &["raw_validation_errors", "template_html_mockup"],
        summary,
    )
    .unwrap()
}

fn tool() -> ToolDefinition {
    ToolDefinition::read_only(ToolName::parse("siac.validate_template").unwrap(), "v", json!({}))
        .unwrap()
        .with_output_template("ui://widget/TemplateValidationCard.html")
}

fn raw() -> ToolOutput {
    ToolOutput::new()
        .with("validation_status", "FAILED")
        .with("template_name", "promo")
        .with("passed_internal_checks", false)
        .with(
            "raw_validation_errors",
            json!({"errors": [{"field": "body_text", "message": "secret detail"}]}),
        )
        .with("template_html_mockup", "<div>secret preview</div>")
}

#[test]
fn fields_land_in_their_declared_channels() {
    let result = compose(&tool(), &projection(), raw()).unwrap();
    let keys: Vec<&str> = result.structured_content.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["validation_status", "template_name", "passed_internal_checks"]);
    assert!(result.meta.contains_key("raw_validation_errors"));
    assert!(result.meta.contains_key("template_html_mockup"));
    assert_eq!(result.meta[OUTPUT_TEMPLATE_META_KEY], "ui://widget/TemplateValidationCard.html");
    assert!(!result.is_error);
}

#[test]
fn meta_only_values_never_reach_model_channels() {
    let projection = projection();
    let result = compose(&tool(), &projection, raw()).unwrap();
    for key in projection.meta_keys() {
        assert!(!result.structured_content.contains_key(*key));
    }
    let model_visible =
        format!("{} {}", serde_json::to_string(&result.structured_content).unwrap(), result.summary());
    assert!(!model_visible.contains("secret"));
    assert_eq!(result.summary(), "Template validation FAILED");
}

#[test]
fn unclassified_field_fails_closed() {
    let raw = raw().with("internal_debug", "stack trace");
    let err = compose(&tool(), &projection(), raw).unwrap_err();
    assert_eq!(
        err,
        ComposeError::UnclassifiedField {
            tool: "siac.validate_template".to_string(),
            field: "internal_debug".to_string(),
        }
    );
}

#[test]
fn wire_shape_uses_mcp_field_names() {
    let result = compose(&tool(), &projection(), raw()).unwrap();
    let value = serde_json::to_value(&result).unwrap();
    assert!(value.get("structuredContent").is_some());
    assert_eq!(value["content"][0]["type"], "text");
    assert!(value.get("_meta").is_some());
    assert_eq!(value["isError"], false);
}
