// crates/siac-gate-mcp/src/auth.rs
// ============================================================================
// Module: Request Context and Auth Audit
// Description: Per-request auth inputs, header parsing, and audit sinks.
// Purpose: Carry caller credentials to the gate and record every decision.
// Dependencies: serde, sha2, tracing
// ============================================================================

//! ## Overview
//! [`RequestContext`] carries the caller's `Authorization` header and request
//! identifier from a transport to the [`crate::gate::AuthorizationGate`].
//! Every decision the gate makes is recorded through an [`AuthAuditSink`].
//! Audit events carry a SHA-256 fingerprint of the bearer token, never the
//! token itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use siac_gate_config::ServerTransport;

use crate::verifier::VerificationFailure;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Largest accepted `Authorization` header value.
pub const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Per-request context used for auth decisions.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Transport used by the caller.
    pub transport: ServerTransport,
    /// Raw `Authorization` header value.
    pub auth_header: Option<String>,
    /// Request identifier for auditing.
    pub request_id: Option<String>,
}

impl RequestContext {
    /// Builds a stdio request context.
    #[must_use]
    pub const fn stdio() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            auth_header: None,
            request_id: None,
        }
    }

    /// Builds an HTTP request context.
    #[must_use]
    pub const fn http(auth_header: Option<String>) -> Self {
        Self {
            transport: ServerTransport::Http,
            auth_header,
            request_id: None,
        }
    }

    /// Returns a copy with the request identifier set.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Fills the header from the JSON-RPC params when the transport supplied none.
    #[must_use]
    pub fn with_fallback_header(mut self, header: Option<String>) -> Self {
        if self.auth_header.is_none() {
            self.auth_header = header;
        }
        self
    }
}

// ============================================================================
// SECTION: Header Parsing
// ============================================================================

/// Extracts the bearer token from an `Authorization` header value.
///
/// A missing or blank header yields `Ok(None)`; the verifier reports that as
/// a missing token.
///
/// # Errors
///
/// Returns [`VerificationFailure::MalformedToken`] when the header exceeds
/// [`MAX_AUTH_HEADER_BYTES`] or does not use the `Bearer` scheme.
pub fn parse_authorization_header(
    header: Option<&str>,
) -> Result<Option<&str>, VerificationFailure> {
    let Some(header) = header else {
        return Ok(None);
    };
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(VerificationFailure::MalformedToken(
            "authorization header too large".to_string(),
        ));
    }
    let header = header.trim();
    if header.is_empty() {
        return Ok(None);
    }
    let (scheme, token) = header.split_once(' ').unwrap_or((header, ""));
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(VerificationFailure::MalformedToken(
            "authorization scheme must be Bearer".to_string(),
        ));
    }
    Ok(Some(token.trim()))
}

/// Hex SHA-256 fingerprint of a bearer token.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// Authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthDecision {
    /// Call forwarded to the handler.
    Allow,
    /// Call rejected with a challenge.
    Deny,
}

impl AuthDecision {
    /// Stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

/// Auth audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Decision outcome.
    pub decision: AuthDecision,
    /// Tool name.
    pub tool: String,
    /// Transport label.
    pub transport: &'static str,
    /// Verified subject, when known.
    pub subject: Option<String>,
    /// Bearer token fingerprint (sha256).
    pub token_fingerprint: Option<String>,
    /// Failure cause label for deny events.
    pub cause: Option<&'static str>,
    /// Request identifier, if provided.
    pub request_id: Option<String>,
}

impl AuthAuditEvent {
    /// Builds an allow event.
    #[must_use]
    pub fn allowed(
        context: &RequestContext,
        tool: &str,
        subject: Option<&str>,
        fingerprint: Option<String>,
    ) -> Self {
        Self {
            event: "tool_authz",
            decision: AuthDecision::Allow,
            tool: tool.to_string(),
            transport: transport_label(context.transport),
            subject: subject.map(str::to_string),
            token_fingerprint: fingerprint,
            cause: None,
            request_id: context.request_id.clone(),
        }
    }

    /// Builds a deny event.
    #[must_use]
    pub fn denied(
        context: &RequestContext,
        tool: &str,
        failure: &VerificationFailure,
        fingerprint: Option<String>,
    ) -> Self {
        Self {
            event: "tool_authz",
            decision: AuthDecision::Deny,
            tool: tool.to_string(),
            transport: transport_label(context.transport),
            subject: None,
            token_fingerprint: fingerprint,
            cause: Some(failure.cause()),
            request_id: context.request_id.clone(),
        }
    }
}

// ============================================================================
// SECTION: Audit Sinks
// ============================================================================

/// Audit sink for auth decisions.
pub trait AuthAuditSink: Send + Sync {
    /// Record an auth audit event.
    fn record(&self, event: &AuthAuditEvent);
}

/// Audit sink that emits structured `tracing` events on `siac_gate::audit`.
pub struct TracingAuditSink;

impl AuthAuditSink for TracingAuditSink {
    fn record(&self, event: &AuthAuditEvent) {
        tracing::info!(
            target: "siac_gate::audit",
            event = event.event,
            decision = event.decision.as_str(),
            tool = %event.tool,
            transport = event.transport,
            subject = event.subject.as_deref(),
            token_fingerprint = event.token_fingerprint.as_deref(),
            cause = event.cause,
            request_id = event.request_id.as_deref(),
            "auth decision"
        );
    }
}

/// No-op audit sink for tests.
pub struct NoopAuditSink;

impl AuthAuditSink for NoopAuditSink {
    fn record(&self, _event: &AuthAuditEvent) {}
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Transport label for audit events.
const fn transport_label(transport: ServerTransport) -> &'static str {
    match transport {
        ServerTransport::Stdio => "stdio",
        ServerTransport::Http => "http",
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
