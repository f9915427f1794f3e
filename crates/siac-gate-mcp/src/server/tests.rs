// crates/siac-gate-mcp/src/server/tests.rs
// ============================================================================
// Module: MCP Server Unit Tests
// Description: Unit tests for framing and JSON-RPC dispatch.
// Purpose: Validate envelopes, error codes, and auth replies without sockets.
// Dependencies: siac-gate-mcp
// ============================================================================

//! ## Overview
//! Drives the JSON-RPC dispatch path and the stdio framing helpers with an in-memory
//! claims source and widget store.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only framing assertions."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::Value;
use serde_json::json;
use siac_gate_config::AuthConfig;
use siac_gate_config::SiacGateConfig;
use siac_gate_core::InMemoryWidgetStateStore;
use siac_gate_core::ManualClock;
use time::OffsetDateTime;
use tokio::io::BufReader;

use super::RpcReply;
use super::dispatch_value;
use super::dispatch_with_timeout;
use super::parse_error;
use super::read_framed;
use super::serve_framed;
use crate::auth::AuthAuditEvent;
use crate::auth::AuthAuditSink;
use crate::auth::AuthDecision;
use crate::auth::NoopAuditSink;
use crate::auth::RequestContext;
use crate::tools::ToolRouter;
use crate::verifier::ClaimsError;
use crate::verifier::ClaimsSource;
use crate::verifier::TokenClaims;
use crate::verifier::TokenShape;
use crate::verifier::parse_scope;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Claims keyed by opaque token.
struct StaticClaims(BTreeMap<&'static str, TokenClaims>);

#[async_trait]
impl ClaimsSource for StaticClaims {
    fn token_shape(&self) -> TokenShape {
        TokenShape::Opaque
    }

    async fn claims(&self, token: &str) -> Result<TokenClaims, ClaimsError> {
        self.0.get(token).cloned().ok_or(ClaimsError::Inactive)
    }
}

fn router() -> ToolRouter {
    let auth = AuthConfig::default();
    let claims = TokenClaims {
        issuer: Some(auth.issuer.clone()),
        audiences: vec![auth.audience.clone()],
        subject: "user-1".to_string(),
        scopes: parse_scope(Some("siac.user.full_access")),
        expires_at: OffsetDateTime::from_unix_timestamp(1_800_000_000).unwrap(),
    };
    let source = StaticClaims(BTreeMap::from([("good-token", claims)]));
    super::build_router(
        &auth,
        Arc::new(source),
        Arc::new(InMemoryWidgetStateStore::new()),
        Arc::new(ManualClock::at_unix(1_700_000_000)),
        Arc::new(NoopAuditSink),
    )
    .unwrap()
}

/// Source that never answers.
struct StalledClaims;

#[async_trait]
impl ClaimsSource for StalledClaims {
    fn token_shape(&self) -> TokenShape {
        TokenShape::Opaque
    }

    async fn claims(&self, _token: &str) -> Result<TokenClaims, ClaimsError> {
        std::future::pending().await
    }
}

/// Audit sink that keeps every event.
#[derive(Default)]
struct CapturedAudit(Mutex<Vec<AuthAuditEvent>>);

impl AuthAuditSink for CapturedAudit {
    fn record(&self, event: &AuthAuditEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

fn stalled_router(auth: &AuthConfig, audit: Arc<CapturedAudit>) -> ToolRouter {
    super::build_router(
        auth,
        Arc::new(StalledClaims),
        Arc::new(InMemoryWidgetStateStore::new()),
        Arc::new(ManualClock::at_unix(1_700_000_000)),
        audit,
    )
    .unwrap()
}

fn register_request(id: i64) -> Vec<u8> {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {
            "name": "siac.register_template",
            "arguments": {"template_id": "t1", "meta_template_id": "m1", "client_id": "c1"}
        }
    })
    .to_string()
    .into_bytes()
}

/// Parses and dispatches one message without a request timeout.
async fn dispatch(router: &ToolRouter, context: &RequestContext, bytes: &[u8]) -> RpcReply {
    let Ok(value) = serde_json::from_slice::<Value>(bytes) else {
        return parse_error();
    };
    dispatch_value(router, context, value).await
}

fn frame(payload: &Value) -> String {
    let body = payload.to_string();
    format!("Content-Length: {}\r\n\r\n{body}", body.len())
}

async fn call(router: &ToolRouter, context: &RequestContext, request: &Value) -> RpcReply {
    dispatch(router, context, request.to_string().as_bytes()).await
}

fn body(reply: &RpcReply) -> Value {
    serde_json::to_value(reply.body.as_ref().expect("reply body")).unwrap()
}

// ============================================================================
// SECTION: Framing
// ============================================================================

#[tokio::test]
async fn read_framed_rejects_payload_over_limit() {
    let payload = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});
    let framed = frame(&payload);
    let mut reader = BufReader::new(Cursor::new(framed.into_bytes()));
    let result = read_framed(&mut reader, payload.to_string().len() - 1).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn read_framed_accepts_payload_at_limit() {
    let payload = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});
    let framed = frame(&payload);
    let mut reader = BufReader::new(Cursor::new(framed.into_bytes()));
    let bytes = read_framed(&mut reader, payload.to_string().len()).await.unwrap().unwrap();
    assert_eq!(bytes, payload.to_string().into_bytes());
    assert!(read_framed(&mut reader, 1024).await.unwrap().is_none());
}

#[tokio::test]
async fn read_framed_rejects_truncated_header() {
    let mut reader = BufReader::new(Cursor::new(b"Content-Length: 10\r\n".to_vec()));
    assert!(read_framed(&mut reader, 1024).await.is_err());
}

#[tokio::test]
async fn read_framed_stops_at_header_limit_without_newline() {
    let mut reader = BufReader::new(Cursor::new(vec![b'a'; 8 * 1024 * 1024]));
    let result = read_framed(&mut reader, 1024).await;
    let Err(super::McpServerError::Transport(message)) = result else {
        panic!("expected transport error");
    };
    assert_eq!(message, "frame header too long");
    assert!(reader.get_ref().position() <= 16 * 1024);
}

#[tokio::test]
async fn stdio_answers_requests_and_skips_notifications() {
    let router = router();
    let input = [
        frame(&json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}})),
        frame(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"})),
        frame(&json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})),
    ]
    .concat();
    let mut output = Vec::new();
    serve_framed(
        &router,
        Cursor::new(input.into_bytes()),
        &mut output,
        64 * 1024,
        Duration::from_secs(5),
    )
    .await
    .unwrap();
    let text = String::from_utf8(output).unwrap();
    assert_eq!(text.matches("Content-Length:").count(), 2);
    assert!(text.contains("\"protocolVersion\":\"2024-11-05\""));
    assert!(text.contains("siac.send_broadcast"));
}

// ============================================================================
// SECTION: Dispatch
// ============================================================================

#[tokio::test]
async fn parse_errors_use_null_id() {
    let reply = dispatch(&router(), &RequestContext::stdio(), b"{not json").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let body = body(&reply);
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["id"], Value::Null);
}

#[tokio::test]
async fn wrong_version_is_invalid_request() {
    let reply = call(
        &router(),
        &RequestContext::stdio(),
        &json!({"jsonrpc": "1.0", "id": 7, "method": "ping"}),
    )
    .await;
    assert_eq!(body(&reply)["error"]["code"], -32600);
    assert_eq!(body(&reply)["id"], 7);
}

#[tokio::test]
async fn notifications_are_accepted_without_body() {
    let reply = call(
        &router(),
        &RequestContext::http(None),
        &json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    )
    .await;
    assert_eq!(reply.status, StatusCode::ACCEPTED);
    assert!(reply.body.is_none());
}

#[tokio::test]
async fn unknown_method_and_unknown_tool_are_method_not_found() {
    let router = router();
    let context = RequestContext::stdio();
    let method = call(&router, &context, &json!({"jsonrpc": "2.0", "id": 1, "method": "nope"})).await;
    assert_eq!(body(&method)["error"]["code"], -32601);
    let tool = call(
        &router,
        &context,
        &json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call", "params": {"name": "siac.nope"}}),
    )
    .await;
    assert_eq!(tool.status, StatusCode::BAD_REQUEST);
    assert_eq!(body(&tool)["error"]["code"], -32601);
    assert!(tool.challenge.is_none());
}

#[tokio::test]
async fn protected_call_without_token_is_challenged() {
    let reply = call(
        &router(),
        &RequestContext::http(None),
        &json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {
                "name": "siac.register_template",
                "arguments": {"template_id": "t1", "meta_template_id": "m1", "client_id": "c1"}
            }
        }),
    )
    .await;
    let expected = "Bearer realm=\"https://api.siac-app.com/mcp\", scope=\"siac.user.full_access\"";
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.challenge.as_deref(), Some(expected));
    let body = body(&reply);
    assert_eq!(body["error"]["code"], -32001);
    assert_eq!(body["error"]["data"]["wwwAuthenticate"], expected);
    assert_eq!(body["error"]["data"]["detail"], "missing bearer token");
}

#[tokio::test]
async fn authorization_param_is_used_when_transport_has_no_header() {
    let reply = call(
        &router(),
        &RequestContext::stdio(),
        &json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": {
                "name": "siac.register_template",
                "arguments": {"template_id": "t1", "meta_template_id": "m1", "client_id": "c1"},
                "authorizationHeader": "Bearer good-token"
            }
        }),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    let body = body(&reply);
    assert_eq!(body["result"]["structuredContent"]["status"], "REGISTRATION_COMPLETE");
    assert_eq!(body["result"]["_meta"]["registration_details"]["submitted_by"], "user-1");
}

#[tokio::test]
async fn transport_header_takes_precedence_over_param() {
    let reply = call(
        &router(),
        &RequestContext::http(Some("Bearer revoked".to_string())),
        &json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "tools/call",
            "params": {
                "name": "siac.register_template",
                "arguments": {"template_id": "t1", "meta_template_id": "m1", "client_id": "c1"},
                "authorizationHeader": "Bearer good-token"
            }
        }),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_tool_arguments_are_invalid_params() {
    let reply = call(
        &router(),
        &RequestContext::stdio(),
        &json!({
            "jsonrpc": "2.0",
            "id": 6,
            "method": "tools/call",
            "params": {"name": "siac.get_campaign_metrics", "arguments": {"campaign": "c1"}}
        }),
    )
    .await;
    assert_eq!(body(&reply)["error"]["code"], -32602);
}

#[tokio::test]
async fn widget_state_methods_round_trip() {
    let router = router();
    let context = RequestContext::stdio();
    let set = call(
        &router,
        &context,
        &json!({
            "jsonrpc": "2.0",
            "id": 8,
            "method": "widget_state/set",
            "params": {"subjectId": "c1", "update": {"timeFilter": "30d"}}
        }),
    )
    .await;
    assert_eq!(body(&set)["result"]["timeFilter"], "30d");
    let get = call(
        &router,
        &context,
        &json!({"jsonrpc": "2.0", "id": 9, "method": "widget_state/get", "params": {"subjectId": "c1"}}),
    )
    .await;
    let state = body(&get);
    assert_eq!(state["result"]["timeFilter"], "30d");
    assert_eq!(state["result"]["selectedMetric"], "delivery_rate");
}

#[tokio::test]
async fn widget_state_set_without_fields_is_invalid_params() {
    let router = router();
    let reply = call(
        &router,
        &RequestContext::stdio(),
        &json!({
            "jsonrpc": "2.0",
            "id": 10,
            "method": "widget_state/set",
            "params": {"subjectId": "c1", "update": {"updatedAt": "2024-01-01T00:00:00Z"}}
        }),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(body(&reply)["error"]["code"], -32602);
    assert!(router.widget_state_get("c1").unwrap().last_updated.is_none());
}

// ============================================================================
// SECTION: Timeouts
// ============================================================================

#[tokio::test(start_paused = true)]
async fn stalled_verifier_is_challenged_before_the_request_timeout() {
    let config = SiacGateConfig::default();
    assert!(config.auth.verify_timeout_ms < config.server.request_timeout_ms);
    let audit = Arc::new(CapturedAudit::default());
    let router = stalled_router(&config.auth, Arc::clone(&audit));
    let context = RequestContext::http(Some("Bearer slow-token".to_string()));

    let reply = dispatch_with_timeout(
        &router,
        &context,
        &register_request(11),
        Duration::from_millis(config.server.request_timeout_ms),
    )
    .await;

    let expected = "Bearer realm=\"https://api.siac-app.com/mcp\", scope=\"siac.user.full_access\"";
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.challenge.as_deref(), Some(expected));
    let body = body(&reply);
    assert_eq!(body["id"], 11);
    assert_eq!(body["error"]["code"], -32001);
    let events = audit.0.lock().unwrap().clone();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].decision, AuthDecision::Deny);
    assert_eq!(events[0].cause, Some("upstream_verifier_error"));
}

#[tokio::test(start_paused = true)]
async fn request_timeout_reply_keeps_the_request_id() {
    let auth = AuthConfig::default();
    let router = stalled_router(&auth, Arc::new(CapturedAudit::default()));
    let context = RequestContext::http(Some("Bearer slow-token".to_string()));

    let reply =
        dispatch_with_timeout(&router, &context, &register_request(12), Duration::from_millis(100))
            .await;

    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    let body = body(&reply);
    assert_eq!(body["id"], 12);
    assert_eq!(body["error"]["code"], -32603);
    assert_eq!(body["error"]["message"], "request timed out");
}
