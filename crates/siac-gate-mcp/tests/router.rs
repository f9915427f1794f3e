// crates/siac-gate-mcp/tests/router.rs
// ============================================================================
// Module: Tool Router Tests
// Description: End-to-end tool calls through gate, handler, and composer.
// Purpose: Check channel separation, business failures, and widget state use.
// Dependencies: siac-gate-mcp, siac-gate-core
// ============================================================================

//! Tool router integration tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions use unwrap for clarity."
)]

mod common;

use std::sync::Arc;

use common::RecordingAuditSink;
use common::ScriptedSource;
use common::trusting_router;
use common::valid_claims;
use serde_json::Value;
use serde_json::json;
use siac_gate_core::InMemoryWidgetStateStore;
use siac_gate_core::SelectedMetric;
use siac_gate_core::TimeFilter;
use siac_gate_core::ToolInvocationResult;
use siac_gate_core::WidgetStatePatch;
use siac_gate_mcp::RequestContext;
use siac_gate_mcp::ToolError;
use siac_gate_mcp::ToolRouter;
use siac_gate_mcp::tools::campaign_metrics;
use siac_gate_mcp::tools::register_template;
use siac_gate_mcp::tools::send_broadcast;
use siac_gate_mcp::tools::validate_template;

fn authorized() -> RequestContext {
    RequestContext::http(Some("Bearer good-token".to_string()))
}

async fn call(router: &ToolRouter, name: &str, arguments: Value) -> ToolInvocationResult {
    router.call_tool(&authorized(), name, arguments).await.unwrap()
}

fn assert_channels_disjoint(result: &ToolInvocationResult) {
    for key in result.structured_content.keys() {
        assert!(!result.meta.contains_key(key), "{key} appears in both channels");
    }
    for value in result.structured_content.values() {
        assert!(!value.is_object(), "structured values must not be objects");
    }
}

// ============================================================================
// SECTION: Discovery
// ============================================================================

#[test]
fn listing_marks_protected_tools() {
    let tools = trusting_router().list_tools();
    let listed = serde_json::to_value(&tools).unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 4);
    let register = listed
        .as_array()
        .unwrap()
        .iter()
        .find(|tool| tool["name"] == register_template::NAME)
        .unwrap();
    assert_eq!(register["securitySchemes"][0]["type"], "oauth2");
    assert_eq!(register["securitySchemes"][0]["scopes"][0], common::SCOPE);
    let metrics = listed
        .as_array()
        .unwrap()
        .iter()
        .find(|tool| tool["name"] == campaign_metrics::NAME)
        .unwrap();
    assert_eq!(metrics["securitySchemes"][0]["type"], "noauth");
}

// ============================================================================
// SECTION: Tools
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn validate_template_reports_success_and_preview() {
    let result = call(
        &trusting_router(),
        validate_template::NAME,
        json!({
            "template_name": "welcome_offer",
            "body_text": "Hello {{1}}, welcome to our {{2}} programme. Reply STOP to opt out.",
            "category": "Marketing",
            "language_code": "es_MX"
        }),
    )
    .await;
    assert!(!result.is_error);
    assert_eq!(result.structured_content["validation_status"], "SUCCESS");
    assert_eq!(result.structured_content["passed_internal_checks"], true);
    assert!(result.meta["template_html_mockup"].as_str().unwrap().contains("class=\"variable\""));
    assert_eq!(result.meta["openai/outputTemplate"], "ui://widget/TemplateValidationCard.html");
    assert!(result.summary().contains("welcome_offer"));
    assert_channels_disjoint(&result);
}

#[tokio::test(flavor = "multi_thread")]
async fn validate_template_flags_prohibited_words() {
    let result = call(
        &trusting_router(),
        validate_template::NAME,
        json!({
            "template_name": "promo",
            "body_text": "URGENT offer for {{1}} today only",
            "category": "Marketing",
            "language_code": "en"
        }),
    )
    .await;
    assert_eq!(result.structured_content["validation_status"], "FAILED");
    assert_eq!(
        result.meta["raw_validation_errors"]["errors"][0]["message"],
        "Contains prohibited promotional language"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn campaign_metrics_reflect_saved_widget_state() {
    let router = trusting_router();
    router
        .widget_state_set("c1", WidgetStatePatch {
            time_filter: Some(TimeFilter::Last30Days),
            selected_metric: Some(SelectedMetric::Cost),
            updated_at: None,
        })
        .unwrap();

    let result = router
        .call_tool(&RequestContext::stdio(), campaign_metrics::NAME, json!({"campaign_id": "c1"}))
        .await
        .unwrap();
    assert_eq!(result.structured_content["delivered"], 1187);
    assert_eq!(result.structured_content["failed"], 63);
    assert_eq!(result.structured_content["status"], "COMPLETED");
    assert_eq!(result.meta["widget_state"]["timeFilter"], "30d");
    assert_eq!(result.meta["widget_state"]["selectedMetric"], "cost");
    assert!(result.meta["cost_analysis"].is_object());
    assert!(result.summary().contains("Delivery Rate: 95.0%"));
    assert_channels_disjoint(&result);
}

#[tokio::test(flavor = "multi_thread")]
async fn campaign_metrics_use_defaults_for_unknown_subjects() {
    let result = call(&trusting_router(), campaign_metrics::NAME, json!({"campaign_id": "error-7"}))
        .await;
    assert_eq!(result.structured_content["status"], "FAILED");
    assert_eq!(result.meta["widget_state"]["timeFilter"], "7d");
    assert_eq!(result.meta["meta_errors"].as_array().unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn register_template_records_the_subject() {
    let result = call(
        &trusting_router(),
        register_template::NAME,
        json!({"template_id": "tpl-1", "meta_template_id": "meta-1", "client_id": "client_0001"}),
    )
    .await;
    assert_eq!(result.structured_content["status"], "REGISTRATION_COMPLETE");
    assert_eq!(result.structured_content["meta_review_status"], "SUBMITTED");
    assert_eq!(result.meta["registration_details"]["submitted_by"], valid_claims().subject);
    assert_channels_disjoint(&result);
}

#[tokio::test(flavor = "multi_thread")]
async fn register_template_reports_invalid_templates_as_status() {
    let result = call(
        &trusting_router(),
        register_template::NAME,
        json!({"template_id": "tpl-invalid", "meta_template_id": "meta-1", "client_id": "c"}),
    )
    .await;
    assert!(!result.is_error);
    assert_eq!(result.structured_content["status"], "REGISTRATION_FAILED");
    assert_eq!(result.structured_content["meta_review_status"], "FAILED");
}

#[tokio::test(flavor = "multi_thread")]
async fn send_broadcast_schedules_test_segments() {
    let result = call(
        &trusting_router(),
        send_broadcast::NAME,
        json!({
            "template_id": "tpl-1",
            "segment_name": "test_users",
            "schedule_time_utc": "2024-02-01T10:00:00Z"
        }),
    )
    .await;
    assert_eq!(result.structured_content["status"], "SCHEDULED_TEST");
    assert_eq!(result.structured_content["estimated_recipients"], 50);
    assert_eq!(
        result.structured_content["campaign_id"],
        format!("campaign_tpl-1_{}", common::NOW)
    );
    assert_eq!(result.meta["monitoring"]["tracking_enabled"], true);
    assert_channels_disjoint(&result);
}

#[tokio::test(flavor = "multi_thread")]
async fn send_broadcast_invalid_segment_is_a_business_failure() {
    let result = call(
        &trusting_router(),
        send_broadcast::NAME,
        json!({
            "template_id": "tpl-1",
            "segment_name": "invalid_segment",
            "schedule_time_utc": "2024-02-01T10:00:00Z"
        }),
    )
    .await;
    assert!(result.is_error);
    assert_eq!(result.structured_content["error_code"], send_broadcast::SCHEDULING_FAILED);
    assert_eq!(result.meta["openai/outputTemplate"], "ui://widget/BroadcastConfirmationCard.html");
    assert_eq!(result.meta.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn send_broadcast_rejects_bad_timestamps() {
    let error = trusting_router()
        .call_tool(
            &authorized(),
            send_broadcast::NAME,
            json!({
                "template_id": "tpl-1",
                "segment_name": "all",
                "schedule_time_utc": "tomorrow morning"
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(error, ToolError::InvalidParams(_)));
}

// ============================================================================
// SECTION: Authorization
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn protected_tools_do_not_run_without_a_token() {
    let source = ScriptedSource::always(valid_claims());
    let router = common::router_with(
        Arc::clone(&source) as _,
        Arc::new(InMemoryWidgetStateStore::new()),
        Arc::new(RecordingAuditSink::default()),
    );
    let error = router
        .call_tool(
            &RequestContext::stdio(),
            register_template::NAME,
            json!({"template_id": "t", "meta_template_id": "m", "client_id": "c"}),
        )
        .await
        .unwrap_err();
    let ToolError::Unauthorized(challenge) = error else {
        panic!("expected a challenge");
    };
    assert_eq!(challenge.www_authenticate, common::CHALLENGE);
    assert_eq!(source.calls(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_tools_are_reported_by_name() {
    let error = trusting_router().call_tool(&authorized(), "siac.nope", json!({})).await.unwrap_err();
    assert_eq!(error, ToolError::UnknownTool("siac.nope".to_string()));
}
