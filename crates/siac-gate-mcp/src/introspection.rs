// crates/siac-gate-mcp/src/introspection.rs
// ============================================================================
// Module: Introspection Claims Source
// Description: RFC 7662 token introspection over HTTPS.
// Purpose: Ask the authorization server whether an opaque token is active.
// Dependencies: reqwest, serde, siac-gate-config, url
// ============================================================================

//! ## Overview
//! [`IntrospectionClaimsSource`] posts `token=<t>` as a form body with HTTP
//! Basic client credentials. An inactive token is reported as
//! [`ClaimsError::Inactive`]. Connection failures, timeouts, and 5xx
//! responses are retryable; other non-success statuses and undecodable bodies
//! are not.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use siac_gate_config::IntrospectionConfig;
use thiserror::Error;
use url::Url;

use crate::verifier::AudienceClaim;
use crate::verifier::ClaimsError;
use crate::verifier::ClaimsSource;
use crate::verifier::TokenClaims;
use crate::verifier::TokenShape;
use crate::verifier::assemble_claims;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Introspection client setup errors.
#[derive(Debug, Error)]
pub enum IntrospectionError {
    /// Endpoint URL is invalid.
    #[error("invalid introspection url: {0}")]
    Url(String),
    /// Client secret environment variable is unset.
    #[error("introspection client secret unavailable: {0}")]
    Secret(String),
    /// HTTP client construction failed.
    #[error("introspection client error: {0}")]
    Client(String),
}

// ============================================================================
// SECTION: Source
// ============================================================================

/// RFC 7662 claims source.
pub struct IntrospectionClaimsSource {
    /// Shared HTTP client.
    client: reqwest::Client,
    /// Introspection endpoint.
    endpoint: Url,
    /// Client identifier.
    client_id: String,
    /// Client secret, when the server requires one.
    client_secret: Option<String>,
}

impl IntrospectionClaimsSource {
    /// Builds the source from `[auth.verifier]`.
    ///
    /// # Errors
    ///
    /// Returns [`IntrospectionError`] when the URL, secret, or client is invalid.
    pub fn from_config(config: &IntrospectionConfig) -> Result<Self, IntrospectionError> {
        let endpoint =
            Url::parse(&config.url).map_err(|err| IntrospectionError::Url(err.to_string()))?;
        let client_secret = match &config.client_secret_env {
            Some(env) => Some(
                std::env::var(env)
                    .map_err(|_| IntrospectionError::Secret(format!("{env} is not set")))?,
            ),
            None => None,
        };
        Self::new(
            endpoint,
            config.client_id.clone(),
            client_secret,
            Duration::from_millis(config.connect_timeout_ms),
        )
    }

    /// Builds the source from explicit parts.
    ///
    /// # Errors
    ///
    /// Returns [`IntrospectionError::Client`] when the HTTP client cannot be built.
    pub fn new(
        endpoint: Url,
        client_id: String,
        client_secret: Option<String>,
        connect_timeout: Duration,
    ) -> Result<Self, IntrospectionError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|err| IntrospectionError::Client(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            client_id,
            client_secret,
        })
    }
}

/// RFC 7662 response body.
#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    /// Whether the token is currently active.
    active: bool,
    /// Issuer.
    #[serde(default)]
    iss: Option<String>,
    /// Audience.
    #[serde(default)]
    aud: Option<AudienceClaim>,
    /// Subject.
    #[serde(default)]
    sub: Option<String>,
    /// Expiry.
    #[serde(default)]
    exp: Option<i64>,
    /// Space-delimited scopes.
    #[serde(default)]
    scope: Option<String>,
}

#[async_trait]
impl ClaimsSource for IntrospectionClaimsSource {
    fn token_shape(&self) -> TokenShape {
        TokenShape::Opaque
    }

    async fn claims(&self, token: &str) -> Result<TokenClaims, ClaimsError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("token", token)
            .append_pair("token_type_hint", "access_token")
            .finish();
        let response = self
            .client
            .post(self.endpoint.clone())
            .basic_auth(&self.client_id, self.client_secret.as_deref())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| ClaimsError::Upstream {
                retryable: !err.is_builder(),
                message: if err.is_timeout() {
                    "introspection request timed out".to_string()
                } else {
                    "introspection request failed".to_string()
                },
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(ClaimsError::Upstream {
                retryable: true,
                message: format!("introspection endpoint returned {}", status.as_u16()),
            });
        }
        if !status.is_success() {
            return Err(ClaimsError::Upstream {
                retryable: false,
                message: format!("introspection endpoint returned {}", status.as_u16()),
            });
        }

        let payload: IntrospectionResponse =
            response.json().await.map_err(|_| ClaimsError::Upstream {
                retryable: false,
                message: "introspection response is not decodable".to_string(),
            })?;
        if !payload.active {
            return Err(ClaimsError::Inactive);
        }
        assemble_claims(payload.iss, payload.aud, payload.sub, payload.exp, payload.scope.as_deref())
    }
}
