// crates/siac-gate-mcp/tests/gate.rs
// ============================================================================
// Module: Authorization Gate Tests
// Description: Check per-tool access decisions and challenges.
// Purpose: Every rejection of a protected tool yields the same challenge.
// Dependencies: siac-gate-mcp
// ============================================================================

//! Authorization gate integration tests.

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

use common::AUDIENCE;
use common::CHALLENGE;
use common::ISSUER;
use common::NOW;
use common::RESOURCE;
use common::RecordingAuditSink;
use common::ScriptedSource;
use common::valid_claims;
use siac_gate_mcp::AuthChallenge;
use siac_gate_mcp::AuthorizationGate;
use siac_gate_mcp::AuthorizationOutcome;
use siac_gate_mcp::ClaimsError;
use siac_gate_mcp::GateSettings;
use siac_gate_mcp::RequestContext;
use siac_gate_mcp::RetryPolicy;
use siac_gate_mcp::TokenClaims;
use siac_gate_mcp::TokenVerifier;
use siac_gate_mcp::UnknownTool;
use siac_gate_mcp::VerificationFailure;
use siac_gate_mcp::auth::AuthDecision;
use siac_gate_mcp::auth::token_fingerprint;
use siac_gate_mcp::siac_registry;
use time::OffsetDateTime;

const PROTECTED: &str = "siac.register_template";
const READ_ONLY: &str = "siac.get_campaign_metrics";

fn gate(
    script: Vec<Result<TokenClaims, ClaimsError>>,
    audit: Arc<RecordingAuditSink>,
) -> AuthorizationGate {
    let verifier = TokenVerifier::new(ScriptedSource::new(script), common::clock())
        .with_retry(RetryPolicy::no_retry());
    AuthorizationGate::new(
        Arc::new(siac_registry(common::SCOPE).unwrap()),
        Arc::new(verifier),
        GateSettings {
            resource: RESOURCE.to_string(),
            issuer: ISSUER.to_string(),
            audience: AUDIENCE.to_string(),
        },
        audit,
    )
}

async fn denial(gate: &AuthorizationGate, header: Option<&str>) -> AuthChallenge {
    let context = RequestContext::http(header.map(str::to_string));
    match gate.authorize(PROTECTED, &context).await.unwrap() {
        AuthorizationOutcome::Denied(challenge) => challenge,
        AuthorizationOutcome::Allowed {
            ..
        } => panic!("expected denial"),
    }
}

// ============================================================================
// SECTION: Challenges
// ============================================================================

#[tokio::test]
async fn every_failure_kind_yields_the_same_challenge() {
    let mut wrong_issuer = valid_claims();
    wrong_issuer.issuer = Some("https://evil.example".to_string());
    let mut wrong_audience = valid_claims();
    wrong_audience.audiences = vec!["other".to_string()];
    let mut expired = valid_claims();
    expired.expires_at = OffsetDateTime::from_unix_timestamp(NOW - 1).unwrap();
    let mut no_scope = valid_claims();
    no_scope.scopes.clear();
    let upstream = Err(ClaimsError::Upstream {
        retryable: true,
        message: "introspection request failed".to_string(),
    });

    let cases: Vec<(Option<&str>, Result<TokenClaims, ClaimsError>, &str)> = vec![
        (None, Ok(valid_claims()), "missing_token"),
        (Some("Basic dXNlcjpwYXNz"), Ok(valid_claims()), "malformed_token"),
        (Some("Bearer a b"), Ok(valid_claims()), "malformed_token"),
        (Some("Bearer tok"), Ok(wrong_issuer), "invalid_issuer"),
        (Some("Bearer tok"), Ok(wrong_audience), "invalid_audience"),
        (Some("Bearer tok"), Ok(expired), "expired_token"),
        (Some("Bearer tok"), Ok(no_scope), "missing_scope"),
        (Some("Bearer tok"), upstream, "upstream_verifier_error"),
    ];
    for (header, claims, cause) in cases {
        let gate = gate(vec![claims], Arc::default());
        let challenge = denial(&gate, header).await;
        assert_eq!(challenge.www_authenticate, CHALLENGE, "cause {cause}");
        assert_eq!(challenge.failure.cause(), cause);
    }
}

#[tokio::test]
async fn oversized_header_is_malformed() {
    let header = format!("Bearer {}", "a".repeat(9 * 1024));
    let challenge = denial(&gate(vec![Ok(valid_claims())], Arc::default()), Some(&header)).await;
    assert!(matches!(challenge.failure, VerificationFailure::MalformedToken(_)));
}

#[tokio::test]
async fn challenge_detail_is_human_readable() {
    let challenge = denial(&gate(vec![Ok(valid_claims())], Arc::default()), None).await;
    assert_eq!(challenge.detail(), "missing bearer token");
}

// ============================================================================
// SECTION: Admission
// ============================================================================

#[tokio::test]
async fn read_only_tool_ignores_a_bad_header() {
    let gate = gate(vec![Ok(valid_claims())], Arc::default());
    let context = RequestContext::http(Some("Garbage".to_string()));
    match gate.authorize(READ_ONLY, &context).await.unwrap() {
        AuthorizationOutcome::Allowed {
            tool,
            identity,
        } => {
            assert_eq!(tool.definition().name().as_str(), READ_ONLY);
            assert!(identity.is_none());
        }
        AuthorizationOutcome::Denied(_) => panic!("read-only tool was denied"),
    }
}

#[tokio::test]
async fn protected_tool_receives_the_identity() {
    let gate = gate(vec![Ok(valid_claims())], Arc::default());
    let context = RequestContext::http(Some("Bearer tok".to_string()));
    match gate.authorize(PROTECTED, &context).await.unwrap() {
        AuthorizationOutcome::Allowed {
            identity,
            ..
        } => assert_eq!(identity.unwrap().subject, "user-42"),
        AuthorizationOutcome::Denied(challenge) => panic!("denied: {}", challenge.detail()),
    }
}

#[tokio::test]
async fn unknown_tools_are_not_challenged() {
    let gate = gate(vec![Ok(valid_claims())], Arc::default());
    let result = gate.authorize("siac.delete_everything", &RequestContext::stdio()).await;
    assert_eq!(result.err(), Some(UnknownTool("siac.delete_everything".to_string())));
}

// ============================================================================
// SECTION: Audit
// ============================================================================

#[tokio::test]
async fn decisions_are_audited_without_raw_tokens() {
    let audit = Arc::new(RecordingAuditSink::default());
    let mut expired = valid_claims();
    expired.expires_at = OffsetDateTime::from_unix_timestamp(NOW - 1).unwrap();
    let gate = gate(vec![Ok(valid_claims()), Ok(expired)], Arc::clone(&audit));

    let allowed = RequestContext::http(Some("Bearer first".to_string())).with_request_id("r-1");
    let _ = gate.authorize(PROTECTED, &allowed).await.unwrap();
    let denied = RequestContext::http(Some("Bearer second".to_string()));
    let _ = gate.authorize(PROTECTED, &denied).await.unwrap();
    let _ = gate.authorize(READ_ONLY, &RequestContext::stdio()).await.unwrap();

    let events = audit.events();
    assert_eq!(events.len(), 3);

    assert_eq!(events[0].decision, AuthDecision::Allow);
    assert_eq!(events[0].subject.as_deref(), Some("user-42"));
    assert_eq!(events[0].request_id.as_deref(), Some("r-1"));
    assert_eq!(events[0].token_fingerprint, Some(token_fingerprint("first")));

    assert_eq!(events[1].decision, AuthDecision::Deny);
    assert_eq!(events[1].cause, Some("expired_token"));
    assert_eq!(events[1].token_fingerprint, Some(token_fingerprint("second")));
    assert!(events[1].subject.is_none());

    assert_eq!(events[2].tool, READ_ONLY);
    assert_eq!(events[2].transport, "stdio");
    assert!(events[2].token_fingerprint.is_none());

    for event in &events {
        let rendered = serde_json::to_string(event).unwrap();
        assert!(!rendered.contains("first\""));
        assert!(!rendered.contains("second\""));
    }
}
