// crates/siac-gate-mcp/src/verifier.rs
// ============================================================================
// Module: Token Verifier
// Description: Ordered bearer-token validation over a pluggable claims source.
// Purpose: Turn a presented token into verified claims or a typed failure.
// Dependencies: async-trait, serde, siac-gate-core, thiserror, time, tokio
// ============================================================================

//! ## Overview
//! [`TokenVerifier::verify`] checks, in order and stopping at the first
//! failure: presence, structural shape, issuer, audience, expiry, and scope.
//! Claims are produced by a [`ClaimsSource`] (local JWT or remote
//! introspection). Transient source errors are retried under
//! [`RetryPolicy`], and the whole decode runs inside one timeout budget;
//! anything left unverifiable fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use siac_gate_core::Clock;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::time::Instant;

use crate::retry::RetryPolicy;
use crate::retry::Sleeper;
use crate::retry::TokioSleeper;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Largest token accepted before any decoding.
pub const MAX_TOKEN_BYTES: usize = 8 * 1024;
/// Default verification budget, retries included.
const DEFAULT_BUDGET: Duration = Duration::from_secs(5);

// ============================================================================
// SECTION: Failures
// ============================================================================

/// Reasons a token is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationFailure {
    /// No token presented.
    #[error("missing bearer token")]
    MissingToken,
    /// Token shape, signature, or claims could not be decoded.
    #[error("malformed bearer token: {0}")]
    MalformedToken(String),
    /// Issuer does not match.
    #[error("token issuer is not trusted")]
    InvalidIssuer,
    /// Audience does not include this resource.
    #[error("token audience does not match this resource")]
    InvalidAudience,
    /// Token is past its expiry or no longer active.
    #[error("{0}")]
    ExpiredToken(String),
    /// Required scope not granted.
    #[error("token lacks required scope {0}")]
    MissingScope(String),
    /// Remote verification failed or timed out.
    #[error("token verifier unavailable: {0}")]
    UpstreamVerifierError(String),
}

impl VerificationFailure {
    /// Stable cause label for logs and audit events.
    #[must_use]
    pub const fn cause(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::MalformedToken(_) => "malformed_token",
            Self::InvalidIssuer => "invalid_issuer",
            Self::InvalidAudience => "invalid_audience",
            Self::ExpiredToken(_) => "expired_token",
            Self::MissingScope(_) => "missing_scope",
            Self::UpstreamVerifierError(_) => "upstream_verifier_error",
        }
    }
}

// ============================================================================
// SECTION: Claims
// ============================================================================

/// Claims of a token that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClaims {
    /// Token issuer.
    pub issuer: String,
    /// Audience the token was accepted for.
    pub audience: String,
    /// Token subject.
    pub subject: String,
    /// Granted scopes.
    pub scopes: BTreeSet<String>,
    /// Expiry instant.
    pub expires_at: OffsetDateTime,
}

/// Decoded, not yet checked claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// `iss`, when present.
    pub issuer: Option<String>,
    /// `aud` as a list (a single string becomes one entry).
    pub audiences: Vec<String>,
    /// `sub`.
    pub subject: String,
    /// `scope`, split on whitespace.
    pub scopes: BTreeSet<String>,
    /// `exp`.
    pub expires_at: OffsetDateTime,
}

/// Splits a space-delimited `scope` claim.
#[must_use]
pub fn parse_scope(scope: Option<&str>) -> BTreeSet<String> {
    scope.map(|value| value.split_ascii_whitespace().map(str::to_string).collect()).unwrap_or_default()
}

/// `aud` claim in either of its RFC 7519 forms.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum AudienceClaim {
    /// Single audience.
    One(String),
    /// Audience list.
    Many(Vec<String>),
}

impl AudienceClaim {
    /// Flattens into a list.
    pub(crate) fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// Converts required `sub`/`exp` plus optional claims into [`TokenClaims`].
pub(crate) fn assemble_claims(
    issuer: Option<String>,
    audience: Option<AudienceClaim>,
    subject: Option<String>,
    expires_at: Option<i64>,
    scope: Option<&str>,
) -> Result<TokenClaims, ClaimsError> {
    let subject = subject
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ClaimsError::Malformed("missing sub claim".to_string()))?;
    let expires_at = expires_at
        .ok_or_else(|| ClaimsError::Malformed("missing exp claim".to_string()))
        .and_then(|exp| {
            OffsetDateTime::from_unix_timestamp(exp)
                .map_err(|_| ClaimsError::Malformed("exp claim out of range".to_string()))
        })?;
    Ok(TokenClaims {
        issuer,
        audiences: audience.map(AudienceClaim::into_vec).unwrap_or_default(),
        subject,
        scopes: parse_scope(scope),
        expires_at,
    })
}

// ============================================================================
// SECTION: Claims Source
// ============================================================================

/// Structural form a claims source accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenShape {
    /// JWS compact serialization: three non-empty base64url segments.
    Jws,
    /// RFC 6750 `b64token`.
    Opaque,
}

impl TokenShape {
    /// True when `token` has this shape.
    #[must_use]
    pub fn accepts(self, token: &str) -> bool {
        if token.is_empty() || token.len() > MAX_TOKEN_BYTES {
            return false;
        }
        match self {
            Self::Jws => {
                let segments: Vec<&str> = token.split('.').collect();
                segments.len() == 3
                    && segments.iter().all(|segment| {
                        !segment.is_empty()
                            && segment
                                .bytes()
                                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
                    })
            }
            Self::Opaque => {
                let body = token.trim_end_matches('=');
                !body.is_empty()
                    && body.bytes().all(|b| {
                        b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~' | b'+' | b'/')
                    })
            }
        }
    }
}

/// Claims decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimsError {
    /// Signature, payload, or required claims invalid.
    #[error("malformed token: {0}")]
    Malformed(String),
    /// Authorization server reports the token inactive.
    #[error("token is not active")]
    Inactive,
    /// Authorization server could not answer.
    #[error("upstream verifier error: {message}")]
    Upstream {
        /// True for timeouts, connection failures, and 5xx responses.
        retryable: bool,
        /// Failure description without token content.
        message: String,
    },
}

/// Produces claims for a presented token.
#[async_trait]
pub trait ClaimsSource: Send + Sync {
    /// Shape checked before [`ClaimsSource::claims`] is called.
    fn token_shape(&self) -> TokenShape;

    /// Decodes and authenticates the token.
    async fn claims(&self, token: &str) -> Result<TokenClaims, ClaimsError>;
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Ordered bearer-token validation.
pub struct TokenVerifier {
    /// Claims source.
    source: Arc<dyn ClaimsSource>,
    /// Clock for expiry checks.
    clock: Arc<dyn Clock>,
    /// Retry policy for transient source errors.
    retry: RetryPolicy,
    /// Sleeper used between retries.
    sleeper: Arc<dyn Sleeper>,
    /// Overall decode budget.
    budget: Duration,
}

impl TokenVerifier {
    /// Creates a verifier with the default retry policy and budget.
    #[must_use]
    pub fn new(source: Arc<dyn ClaimsSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            retry: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            budget: DEFAULT_BUDGET,
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the overall decode budget.
    #[must_use]
    pub const fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Replaces the sleeper.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Verifies `token` against the expected issuer, audience, and scope.
    ///
    /// # Errors
    ///
    /// Returns the first [`VerificationFailure`] in check order.
    pub async fn verify(
        &self,
        token: Option<&str>,
        issuer: &str,
        audience: &str,
        required_scope: Option<&str>,
    ) -> Result<VerifiedClaims, VerificationFailure> {
        let token = token
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(VerificationFailure::MissingToken)?;
        if !self.source.token_shape().accepts(token) {
            return Err(VerificationFailure::MalformedToken(
                "token does not match the expected format".to_string(),
            ));
        }

        let claims = self.decode(token).await?;

        if claims.issuer.as_deref() != Some(issuer) {
            return Err(VerificationFailure::InvalidIssuer);
        }
        if !claims.audiences.iter().any(|candidate| candidate == audience) {
            return Err(VerificationFailure::InvalidAudience);
        }
        if self.clock.now() >= claims.expires_at {
            return Err(VerificationFailure::ExpiredToken("token has expired".to_string()));
        }
        if let Some(scope) = required_scope
            && !claims.scopes.contains(scope)
        {
            return Err(VerificationFailure::MissingScope(scope.to_string()));
        }

        Ok(VerifiedClaims {
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            subject: claims.subject,
            scopes: claims.scopes,
            expires_at: claims.expires_at,
        })
    }

    /// Runs the claims source under the budget.
    async fn decode(&self, token: &str) -> Result<TokenClaims, VerificationFailure> {
        let deadline = Instant::now() + self.budget;
        tokio::time::timeout_at(deadline, self.decode_with_retry(token, deadline))
            .await
            .unwrap_or_else(|_| {
                tracing::warn!(budget_ms = self.budget.as_millis(), "token verification timed out");
                Err(VerificationFailure::UpstreamVerifierError(
                    "verification timed out".to_string(),
                ))
            })
    }

    /// Retries transient source errors while budget remains.
    async fn decode_with_retry(
        &self,
        token: &str,
        deadline: Instant,
    ) -> Result<TokenClaims, VerificationFailure> {
        let mut attempt: u32 = 1;
        loop {
            let error = match self.source.claims(token).await {
                Ok(claims) => return Ok(claims),
                Err(ClaimsError::Malformed(message)) => {
                    return Err(VerificationFailure::MalformedToken(message));
                }
                Err(ClaimsError::Inactive) => {
                    return Err(VerificationFailure::ExpiredToken(
                        "token is not active".to_string(),
                    ));
                }
                Err(ClaimsError::Upstream {
                    retryable,
                    message,
                }) => {
                    if !retryable || attempt >= self.retry.max_attempts {
                        return Err(VerificationFailure::UpstreamVerifierError(message));
                    }
                    message
                }
            };
            let delay = self.retry.delay_for(attempt);
            if delay >= deadline.saturating_duration_since(Instant::now()) {
                return Err(VerificationFailure::UpstreamVerifierError(error));
            }
            tracing::debug!(
                attempt,
                delay_ms = delay.as_millis(),
                error = %error,
                "retrying token verification"
            );
            self.sleeper.sleep(delay).await;
            attempt = attempt.saturating_add(1);
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
