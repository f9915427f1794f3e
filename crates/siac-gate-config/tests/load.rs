// crates/siac-gate-config/tests/load.rs
// ============================================================================
// Module: Config Loading Tests
// Description: File loading, defaults, and fail-closed validation.
// Purpose: Ensure malformed or inconsistent configuration is rejected.
// Dependencies: siac-gate-config, tempfile
// ============================================================================

//! Configuration loading tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions use unwrap for clarity."
)]

use std::io::Write;

use siac_gate_config::ConfigError;
use siac_gate_config::JwtAlgorithm;
use siac_gate_config::LogFormat;
use siac_gate_config::ServerTransport;
use siac_gate_config::SiacGateConfig;
use siac_gate_config::VerifierConfig;
use siac_gate_config::WidgetStoreType;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn invalid(content: &str) -> String {
    match SiacGateConfig::from_toml_str(content) {
        Err(ConfigError::Invalid(message)) => message,
        other => panic!("expected invalid config, got {other:?}"),
    }
}

#[test]
fn empty_file_uses_deployment_defaults() {
    let file = write_config("");
    let config = SiacGateConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.server.transport, ServerTransport::Http);
    assert_eq!(config.auth.issuer, "https://auth.siac-app.com");
    assert_eq!(config.auth.resource, "https://api.siac-app.com/mcp");
    assert_eq!(config.auth.audience, "siac-assistant");
    assert_eq!(config.auth.required_scope, "siac.user.full_access");
    assert_eq!(config.widget_state.store_type, WidgetStoreType::Memory);
    assert!(matches!(config.auth.verifier, VerifierConfig::Jwt(_)));
}

#[test]
fn full_introspection_config_parses() {
    let config = SiacGateConfig::from_toml_str(
        r#"
[server]
transport = "stdio"
request_timeout_ms = 2000

[auth]
issuer = "https://idp.example.com"
resource = "https://gateway.example.com/mcp"
audience = "gateway"
required_scope = "x.full_access"
verify_timeout_ms = 1500

[auth.retry]
max_attempts = 4
initial_backoff_ms = 50
multiplier = 3
max_backoff_ms = 400

[auth.verifier]
mode = "introspection"
url = "https://idp.example.com/oauth/introspect"
client_id = "gateway"
client_secret_env = "GATEWAY_SECRET"

[widget_state]
type = "sqlite"
path = "state/widget.db"
journal_mode = "delete"

[logging]
filter = "siac_gate=debug"
format = "json"
"#,
    )
    .unwrap();
    assert_eq!(config.server.transport, ServerTransport::Stdio);
    assert_eq!(config.auth.retry.max_attempts, 4);
    let VerifierConfig::Introspection(introspection) = &config.auth.verifier else {
        panic!("expected introspection verifier");
    };
    assert_eq!(introspection.client_id, "gateway");
    assert!(config.widget_state.sqlite_config().is_some());
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn jwks_verifier_parses() {
    let config = SiacGateConfig::from_toml_str(
        r#"
[auth.verifier]
mode = "jwt"
algorithms = ["RS256", "ES256"]
jwks_path = "keys/jwks.json"
"#,
    )
    .unwrap();
    let VerifierConfig::Jwt(jwt) = &config.auth.verifier else {
        panic!("expected jwt verifier");
    };
    assert_eq!(jwt.algorithms, vec![JwtAlgorithm::RS256, JwtAlgorithm::ES256]);
}

#[test]
fn mixing_hmac_and_public_key_algorithms_is_rejected() {
    let message = invalid(
        r#"
[auth.verifier]
mode = "jwt"
algorithms = ["HS256", "RS256"]
secret_env = "SECRET"
"#,
    );
    assert!(message.contains("must not mix"));
}

#[test]
fn multiple_key_sources_are_rejected() {
    let message = invalid(
        r#"
[auth.verifier]
mode = "jwt"
algorithms = ["RS256"]
public_key_path = "a.pem"
jwks_path = "b.json"
"#,
    );
    assert!(message.contains("exactly one"));
}

#[test]
fn plain_http_introspection_requires_opt_in() {
    let message = invalid(
        r#"
[auth.verifier]
mode = "introspection"
url = "http://127.0.0.1:9000/introspect"
client_id = "gateway"
"#,
    );
    assert!(message.contains("https"));
}

#[test]
fn scope_with_space_is_rejected() {
    let message = invalid(
        r#"
[auth]
required_scope = "read write"
"#,
    );
    assert!(message.contains("single scope token"));
}

#[test]
fn sqlite_store_requires_path() {
    let message = invalid(
        r#"
[widget_state]
type = "sqlite"
"#,
    );
    assert!(message.contains("widget_state.path"));
}

#[test]
fn retry_attempts_are_bounded() {
    let message = invalid(
        r#"
[auth.retry]
max_attempts = 0
"#,
    );
    assert!(message.contains("max_attempts"));
}

#[test]
fn verify_budget_must_fit_inside_request_timeout() {
    let message = invalid("[server]\nrequest_timeout_ms = 1000\n");
    assert!(message.contains("auth.verify_timeout_ms must be less than"));

    let message = invalid("[server]\nrequest_timeout_ms = 1000\n[auth]\nverify_timeout_ms = 1000\n");
    assert!(message.contains("server.request_timeout_ms"));

    let config = SiacGateConfig::from_toml_str(
        "[server]\nrequest_timeout_ms = 1000\n[auth]\nverify_timeout_ms = 999\n",
    )
    .unwrap();
    assert_eq!(config.auth.verify_timeout_ms, 999);
}

#[test]
fn unknown_fields_are_parse_errors() {
    let result = SiacGateConfig::from_toml_str("[server]\nport = 8000\n");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn oversized_file_is_rejected() {
    let padding = format!("# {}\n", "x".repeat(1024 * 1024));
    let file = write_config(&padding);
    let result = SiacGateConfig::load(Some(file.path()));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let result = SiacGateConfig::load(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}
