// crates/siac-gate-mcp/src/metadata.rs
// ============================================================================
// Module: Discovery Documents
// Description: RFC 9728 metadata plus the auth and server info documents.
// Purpose: Tell clients which authorization servers issue usable tokens.
// Dependencies: serde, siac-gate-config
// ============================================================================

//! ## Overview
//! [`ProtectedResourceMetadata`] is served at
//! `/.well-known/oauth-protected-resource`, [`AuthInfo`] at `/auth/info`, and
//! [`ServerInfo`] at `GET /mcp`. Bearer tokens are only accepted in the
//! `Authorization` header. None of these documents carry key material or
//! client secrets.

use serde::Serialize;
use siac_gate_config::AuthConfig;
use siac_gate_config::VerifierConfig;

/// Route of the health document.
pub const HEALTH_PATH: &str = "/health";
/// Route of the auth info document.
pub const AUTH_INFO_PATH: &str = "/auth/info";
/// Route of the protected resource metadata.
pub const RESOURCE_METADATA_PATH: &str = "/.well-known/oauth-protected-resource";
/// JSON-RPC route; `GET` returns [`ServerInfo`].
pub const MCP_PATH: &str = "/mcp";
/// Widget state route template.
pub const WIDGET_STATE_PATH: &str = "/widget-state/{subject_id}";

/// RFC 9728 protected resource metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtectedResourceMetadata {
    /// Resource identifier.
    pub resource: String,
    /// Issuers whose tokens are accepted.
    pub authorization_servers: Vec<String>,
    /// Scopes protected tools may require.
    pub scopes_supported: Vec<String>,
    /// Accepted bearer presentation methods.
    pub bearer_methods_supported: Vec<String>,
    /// Human-readable documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_documentation: Option<String>,
}

impl ProtectedResourceMetadata {
    /// Builds the document from `[auth]`.
    #[must_use]
    pub fn from_config(auth: &AuthConfig) -> Self {
        Self {
            resource: auth.resource.clone(),
            authorization_servers: auth.effective_authorization_servers(),
            scopes_supported: vec![auth.required_scope.clone()],
            bearer_methods_supported: vec!["header".to_string()],
            resource_documentation: auth.resource_documentation.clone(),
        }
    }
}

/// Summary of the token requirements, served at `/auth/info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthInfo {
    /// Expected token issuer.
    pub issuer: String,
    /// Protected resource identifier.
    pub resource: String,
    /// Expected token audience.
    pub audience: String,
    /// Scope required by protected tools.
    pub required_scope: String,
    /// How tokens are verified: `jwt` or `introspection`.
    pub verifier: &'static str,
}

impl AuthInfo {
    /// Builds the document from `[auth]`.
    #[must_use]
    pub fn from_config(auth: &AuthConfig) -> Self {
        let verifier = match auth.verifier {
            VerifierConfig::Jwt(_) => "jwt",
            VerifierConfig::Introspection(_) => "introspection",
        };
        Self {
            issuer: auth.issuer.clone(),
            resource: auth.resource.clone(),
            audience: auth.audience.clone(),
            required_scope: auth.required_scope.clone(),
            verifier,
        }
    }
}

/// OAuth section of [`ServerInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerOauthInfo {
    /// Expected token issuer.
    pub issuer: String,
    /// Issuers whose tokens are accepted.
    pub authorization_servers: Vec<String>,
    /// Scopes protected tools may require.
    pub scopes: Vec<String>,
}

/// Public route map of [`ServerInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerEndpoints {
    /// Health route.
    pub health: &'static str,
    /// Auth info route.
    pub auth_info: &'static str,
    /// Protected resource metadata route.
    pub protected_resource_metadata: &'static str,
    /// Widget state route template.
    pub widget_state: &'static str,
}

/// Server description served at `GET /mcp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Protocol family.
    pub protocol: &'static str,
    /// MCP revision announced by `initialize`.
    pub protocol_version: &'static str,
    /// Token requirements.
    pub oauth: ServerOauthInfo,
    /// Public routes.
    pub endpoints: ServerEndpoints,
}

impl ServerInfo {
    /// Builds the document from `[auth]`.
    #[must_use]
    pub fn from_config(
        name: &'static str,
        protocol_version: &'static str,
        auth: &AuthConfig,
    ) -> Self {
        Self {
            name,
            version: env!("CARGO_PKG_VERSION"),
            protocol: "mcp",
            protocol_version,
            oauth: ServerOauthInfo {
                issuer: auth.issuer.clone(),
                authorization_servers: auth.effective_authorization_servers(),
                scopes: vec![auth.required_scope.clone()],
            },
            endpoints: ServerEndpoints {
                health: HEALTH_PATH,
                auth_info: AUTH_INFO_PATH,
                protected_resource_metadata: RESOURCE_METADATA_PATH,
                widget_state: WIDGET_STATE_PATH,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap for clarity."
    )]

    use super::*;

    #[test]
    fn defaults_advertise_the_issuer() {
        let metadata = ProtectedResourceMetadata::from_config(&AuthConfig::default());
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["resource"], "https://api.siac-app.com/mcp");
        assert_eq!(value["authorization_servers"][0], "https://auth.siac-app.com");
        assert_eq!(value["scopes_supported"][0], "siac.user.full_access");
        assert!(value.get("resource_documentation").is_none());
    }

    #[test]
    fn auth_info_names_the_verifier_without_secrets() {
        let auth = AuthConfig::default();
        let value = serde_json::to_value(AuthInfo::from_config(&auth)).unwrap();
        assert_eq!(value["issuer"], "https://auth.siac-app.com");
        assert_eq!(value["audience"], "siac-assistant");
        assert_eq!(value["required_scope"], "siac.user.full_access");
        assert_eq!(value["verifier"], "jwt");
        assert_eq!(value.as_object().unwrap().len(), 5);
    }

    #[test]
    fn server_info_lists_public_routes() {
        let info = ServerInfo::from_config("siac-gate", "2024-11-05", &AuthConfig::default());
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["protocol"], "mcp");
        assert_eq!(value["oauth"]["scopes"][0], "siac.user.full_access");
        assert_eq!(value["endpoints"]["auth_info"], "/auth/info");
        assert_eq!(
            value["endpoints"]["protected_resource_metadata"],
            "/.well-known/oauth-protected-resource"
        );
    }
}
