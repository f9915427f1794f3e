// crates/siac-gate-mcp/src/gate.rs
// ============================================================================
// Module: Authorization Gate
// Description: Per-tool authorization in front of every handler.
// Purpose: Admit read-only calls, verify tokens for protected calls, and
//          shape every rejection into a uniform bearer challenge.
// Dependencies: siac-gate-core, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`AuthorizationGate::authorize`] looks the tool up in the
//! [`ToolRegistry`]. Read-only tools are admitted without looking at the
//! token. Protected tools go through [`TokenVerifier`] with the tool's
//! required scope; any failure becomes an [`AuthChallenge`] whose
//! `WWW-Authenticate` value is
//! `Bearer realm="<resource>", scope="<required scope>"` regardless of cause.
//! Every decision is logged and written to the audit sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::auth::AuthAuditEvent;
use crate::auth::AuthAuditSink;
use crate::auth::RequestContext;
use crate::auth::parse_authorization_header;
use crate::auth::token_fingerprint;
use crate::registry::RegisteredTool;
use crate::registry::ToolRegistry;
use crate::verifier::TokenVerifier;
use crate::verifier::VerificationFailure;
use crate::verifier::VerifiedClaims;

// ============================================================================
// SECTION: Types
// ============================================================================

/// The requested tool is not registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown tool: {0}")]
pub struct UnknownTool(pub String);

/// A rejected call, ready to be rendered as a 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    /// Exact `WWW-Authenticate` header value.
    pub www_authenticate: String,
    /// Why verification failed.
    pub failure: VerificationFailure,
}

impl AuthChallenge {
    /// Human-readable cause.
    #[must_use]
    pub fn detail(&self) -> String {
        self.failure.to_string()
    }
}

/// Gate decision.
pub enum AuthorizationOutcome<'a> {
    /// Forward the call.
    Allowed {
        /// Tool to dispatch to.
        tool: &'a RegisteredTool,
        /// Verified caller; `None` for read-only tools.
        identity: Option<VerifiedClaims>,
    },
    /// Reject the call.
    Denied(AuthChallenge),
}

/// Expected token properties and the advertised resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSettings {
    /// Protected resource identifier (challenge realm).
    pub resource: String,
    /// Expected issuer.
    pub issuer: String,
    /// Expected audience.
    pub audience: String,
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Per-tool authorization.
pub struct AuthorizationGate {
    /// Tool lookup.
    registry: Arc<ToolRegistry>,
    /// Token verifier for protected tools.
    verifier: Arc<TokenVerifier>,
    /// Expected token properties.
    settings: GateSettings,
    /// Decision sink.
    audit: Arc<dyn AuthAuditSink>,
}

impl AuthorizationGate {
    /// Creates a gate.
    #[must_use]
    pub fn new(
        registry: Arc<ToolRegistry>,
        verifier: Arc<TokenVerifier>,
        settings: GateSettings,
        audit: Arc<dyn AuthAuditSink>,
    ) -> Self {
        Self {
            registry,
            verifier,
            settings,
            audit,
        }
    }

    /// Challenge header for a scope.
    #[must_use]
    pub fn challenge_header(&self, scope: &str) -> String {
        format!("Bearer realm=\"{}\", scope=\"{scope}\"", self.settings.resource)
    }

    /// Decides whether `tool_name` may run for the caller in `context`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownTool`] when the tool is not registered.
    pub async fn authorize(
        &self,
        tool_name: &str,
        context: &RequestContext,
    ) -> Result<AuthorizationOutcome<'_>, UnknownTool> {
        let tool = self.registry.get(tool_name).ok_or_else(|| UnknownTool(tool_name.to_string()))?;
        let Some(scope) = tool.definition().required_scope() else {
            tracing::debug!(tool = tool_name, "read-only tool admitted without token");
            self.audit.record(&AuthAuditEvent::allowed(context, tool_name, None, None));
            return Ok(AuthorizationOutcome::Allowed {
                tool,
                identity: None,
            });
        };

        let token = match parse_authorization_header(context.auth_header.as_deref()) {
            Ok(token) => token,
            Err(failure) => return Ok(self.deny(context, tool_name, scope, failure, None)),
        };
        let fingerprint = token.filter(|value| !value.is_empty()).map(token_fingerprint);
        let verified = self
            .verifier
            .verify(token, &self.settings.issuer, &self.settings.audience, Some(scope))
            .await;
        match verified {
            Ok(claims) => {
                tracing::info!(
                    tool = tool_name,
                    subject = %claims.subject,
                    "protected tool call authorized"
                );
                self.audit.record(&AuthAuditEvent::allowed(
                    context,
                    tool_name,
                    Some(&claims.subject),
                    fingerprint,
                ));
                Ok(AuthorizationOutcome::Allowed {
                    tool,
                    identity: Some(claims),
                })
            }
            Err(failure) => Ok(self.deny(context, tool_name, scope, failure, fingerprint)),
        }
    }

    /// Builds and records a denial.
    fn deny(
        &self,
        context: &RequestContext,
        tool_name: &str,
        scope: &str,
        failure: VerificationFailure,
        fingerprint: Option<String>,
    ) -> AuthorizationOutcome<'_> {
        tracing::warn!(
            tool = tool_name,
            cause = failure.cause(),
            detail = %failure,
            "protected tool call denied"
        );
        self.audit.record(&AuthAuditEvent::denied(context, tool_name, &failure, fingerprint));
        AuthorizationOutcome::Denied(AuthChallenge {
            www_authenticate: self.challenge_header(scope),
            failure,
        })
    }
}
