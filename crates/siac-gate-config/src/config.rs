// crates/siac-gate-config/src/config.rs
// ============================================================================
// Module: SIAC Gate Configuration
// Description: Configuration loading and validation for the SIAC gateway.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: siac-gate-store-sqlite, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section has defaults matching the SIAC deployment, so an empty file
//! is valid apart from the verifier key material it must name. Missing or
//! invalid configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use siac_gate_store_sqlite::SqliteStoreConfig;
use siac_gate_store_sqlite::SqliteStoreMode;
use siac_gate_store_sqlite::SqliteSyncMode;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "siac-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "SIAC_GATE_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default authorization server issuer.
const DEFAULT_ISSUER: &str = "https://auth.siac-app.com";
/// Default protected resource identifier.
const DEFAULT_RESOURCE: &str = "https://api.siac-app.com/mcp";
/// Default expected token audience.
const DEFAULT_AUDIENCE: &str = "siac-assistant";
/// Default scope required by protected tools.
const DEFAULT_REQUIRED_SCOPE: &str = "siac.user.full_access";
/// Default HTTP bind address.
const DEFAULT_BIND: &str = "127.0.0.1:8000";
/// Default environment variable holding the HMAC secret.
const DEFAULT_SECRET_ENV: &str = "SIAC_GATE_JWT_SECRET";
/// Default maximum request body size.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Smallest accepted request body limit.
const MIN_MAX_BODY_BYTES: usize = 1024;
/// Largest accepted request body limit.
const MAX_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
/// Default per-request timeout in milliseconds.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;
/// Minimum per-request timeout in milliseconds.
const MIN_REQUEST_TIMEOUT_MS: u64 = 100;
/// Maximum per-request timeout in milliseconds.
const MAX_REQUEST_TIMEOUT_MS: u64 = 120_000;
/// Default token verification budget in milliseconds.
const DEFAULT_VERIFY_TIMEOUT_MS: u64 = 5_000;
/// Minimum token verification budget in milliseconds.
const MIN_VERIFY_TIMEOUT_MS: u64 = 100;
/// Maximum token verification budget in milliseconds.
const MAX_VERIFY_TIMEOUT_MS: u64 = 30_000;
/// Default introspection connect timeout in milliseconds.
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 500;
/// Maximum retry attempts for upstream verification.
const MAX_RETRY_ATTEMPTS: u32 = 5;
/// Maximum backoff multiplier.
const MAX_BACKOFF_MULTIPLIER: u32 = 10;
/// Maximum length of a scope token.
const MAX_SCOPE_LENGTH: usize = 256;

// ============================================================================
// SECTION: Root
// ============================================================================

/// Gateway configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiacGateConfig {
    /// Transport settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Token verification settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Widget state storage settings.
    #[serde(default)]
    pub widget_state: WidgetStateConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SiacGateConfig {
    /// Loads configuration from `path`, `SIAC_GATE_CONFIG`, or the default file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the text cannot be parsed or validated.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.auth.validate()?;
        self.widget_state.validate()?;
        self.logging.validate()?;
        if self.auth.verify_timeout_ms >= self.server.request_timeout_ms {
            return Err(ConfigError::Invalid(
                "auth.verify_timeout_ms must be less than server.request_timeout_ms".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Transport used by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// Content-Length framed JSON-RPC over stdin/stdout.
    Stdio,
    /// JSON-RPC over HTTP POST plus discovery routes.
    #[default]
    Http,
}

/// Server transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Transport type.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for HTTP.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::default(),
            bind: default_bind(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl ServerConfig {
    /// Parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `bind` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid server.bind: {}", self.bind)))
    }

    /// Validates server settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.transport == ServerTransport::Http {
            self.bind_addr()?;
        }
        if !(MIN_MAX_BODY_BYTES..=MAX_MAX_BODY_BYTES).contains(&self.max_body_bytes) {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between {MIN_MAX_BODY_BYTES} and \
                 {MAX_MAX_BODY_BYTES}"
            )));
        }
        if !(MIN_REQUEST_TIMEOUT_MS..=MAX_REQUEST_TIMEOUT_MS).contains(&self.request_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "server.request_timeout_ms must be between {MIN_REQUEST_TIMEOUT_MS} and \
                 {MAX_REQUEST_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Auth
// ============================================================================

/// Token verification configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Expected token issuer.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Protected resource identifier, used as the challenge realm.
    #[serde(default = "default_resource")]
    pub resource: String,
    /// Expected token audience.
    #[serde(default = "default_audience")]
    pub audience: String,
    /// Scope required by protected tools.
    #[serde(default = "default_required_scope")]
    pub required_scope: String,
    /// Authorization servers advertised in resource metadata; defaults to the issuer.
    #[serde(default)]
    pub authorization_servers: Vec<String>,
    /// Documentation URL advertised in resource metadata.
    #[serde(default)]
    pub resource_documentation: Option<String>,
    /// Overall verification budget in milliseconds, retries included.
    #[serde(default = "default_verify_timeout_ms")]
    pub verify_timeout_ms: u64,
    /// Retry policy for transient upstream verifier errors.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Claims source.
    #[serde(default)]
    pub verifier: VerifierConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            resource: default_resource(),
            audience: default_audience(),
            required_scope: default_required_scope(),
            authorization_servers: Vec::new(),
            resource_documentation: None,
            verify_timeout_ms: DEFAULT_VERIFY_TIMEOUT_MS,
            retry: RetryConfig::default(),
            verifier: VerifierConfig::default(),
        }
    }
}

impl AuthConfig {
    /// Authorization servers to advertise.
    #[must_use]
    pub fn effective_authorization_servers(&self) -> Vec<String> {
        if self.authorization_servers.is_empty() {
            vec![self.issuer.clone()]
        } else {
            self.authorization_servers.clone()
        }
    }

    /// Validates auth settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_url("auth.issuer", &self.issuer)?;
        validate_url("auth.resource", &self.resource)?;
        for server in &self.authorization_servers {
            validate_url("auth.authorization_servers", server)?;
        }
        if let Some(docs) = &self.resource_documentation {
            validate_url("auth.resource_documentation", docs)?;
        }
        if self.audience.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.audience must be non-empty".to_string()));
        }
        validate_scope_token(&self.required_scope)?;
        if !(MIN_VERIFY_TIMEOUT_MS..=MAX_VERIFY_TIMEOUT_MS).contains(&self.verify_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "auth.verify_timeout_ms must be between {MIN_VERIFY_TIMEOUT_MS} and \
                 {MAX_VERIFY_TIMEOUT_MS}"
            )));
        }
        self.retry.validate()?;
        self.verifier.validate()
    }
}

/// Retry policy for transient upstream verifier errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Growth factor applied per retry.
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
    /// Upper bound on a single delay.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            multiplier: default_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryConfig {
    /// Validates retry settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 || self.max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(ConfigError::Invalid(format!(
                "auth.retry.max_attempts must be between 1 and {MAX_RETRY_ATTEMPTS}"
            )));
        }
        if self.multiplier == 0 || self.multiplier > MAX_BACKOFF_MULTIPLIER {
            return Err(ConfigError::Invalid(format!(
                "auth.retry.multiplier must be between 1 and {MAX_BACKOFF_MULTIPLIER}"
            )));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::Invalid(
                "auth.retry.initial_backoff_ms must not exceed max_backoff_ms".to_string(),
            ));
        }
        Ok(())
    }
}

/// Claims source selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum VerifierConfig {
    /// Local JWT signature verification.
    Jwt(JwtVerifierConfig),
    /// Remote RFC 7662 introspection.
    Introspection(IntrospectionConfig),
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self::Jwt(JwtVerifierConfig::default())
    }
}

impl VerifierConfig {
    /// Validates verifier settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Jwt(config) => config.validate(),
            Self::Introspection(config) => config.validate(),
        }
    }
}

/// JWS algorithms accepted for local verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
pub enum JwtAlgorithm {
    /// HMAC SHA-256.
    HS256,
    /// HMAC SHA-384.
    HS384,
    /// HMAC SHA-512.
    HS512,
    /// RSASSA-PKCS1-v1_5 SHA-256.
    RS256,
    /// RSASSA-PKCS1-v1_5 SHA-384.
    RS384,
    /// RSASSA-PKCS1-v1_5 SHA-512.
    RS512,
    /// ECDSA P-256 SHA-256.
    ES256,
    /// ECDSA P-384 SHA-384.
    ES384,
}

impl JwtAlgorithm {
    /// True for shared-secret algorithms.
    #[must_use]
    pub const fn is_hmac(self) -> bool {
        matches!(self, Self::HS256 | Self::HS384 | Self::HS512)
    }
}

/// Local JWT verification settings. Exactly one key source must be set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JwtVerifierConfig {
    /// Accepted header algorithms.
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<JwtAlgorithm>,
    /// Environment variable holding an HMAC secret.
    #[serde(default)]
    pub secret_env: Option<String>,
    /// PEM file holding an RSA or EC public key.
    #[serde(default)]
    pub public_key_path: Option<PathBuf>,
    /// JWKS document; keys selected by `kid`.
    #[serde(default)]
    pub jwks_path: Option<PathBuf>,
}

impl Default for JwtVerifierConfig {
    fn default() -> Self {
        Self {
            algorithms: default_algorithms(),
            secret_env: Some(DEFAULT_SECRET_ENV.to_string()),
            public_key_path: None,
            jwks_path: None,
        }
    }
}

impl JwtVerifierConfig {
    /// Validates JWT settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.algorithms.is_empty() {
            return Err(ConfigError::Invalid(
                "auth.verifier.algorithms must be non-empty".to_string(),
            ));
        }
        let sources = usize::from(self.secret_env.is_some())
            + usize::from(self.public_key_path.is_some())
            + usize::from(self.jwks_path.is_some());
        if sources != 1 {
            return Err(ConfigError::Invalid(
                "auth.verifier requires exactly one of secret_env, public_key_path, jwks_path"
                    .to_string(),
            ));
        }
        let hmac = self.algorithms.iter().any(|alg| alg.is_hmac());
        let asymmetric = self.algorithms.iter().any(|alg| !alg.is_hmac());
        if hmac && asymmetric {
            return Err(ConfigError::Invalid(
                "auth.verifier.algorithms must not mix HMAC and public-key algorithms".to_string(),
            ));
        }
        if hmac != self.secret_env.is_some() {
            return Err(ConfigError::Invalid(
                "auth.verifier secret_env is required for and only valid with HMAC algorithms"
                    .to_string(),
            ));
        }
        if let Some(name) = &self.secret_env
            && name.trim().is_empty()
        {
            return Err(ConfigError::Invalid("auth.verifier.secret_env must be non-empty".to_string()));
        }
        if let Some(path) = &self.public_key_path {
            validate_path_string("auth.verifier.public_key_path", path)?;
        }
        if let Some(path) = &self.jwks_path {
            validate_path_string("auth.verifier.jwks_path", path)?;
        }
        Ok(())
    }
}

/// Remote introspection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IntrospectionConfig {
    /// RFC 7662 endpoint.
    pub url: String,
    /// Client identifier for HTTP Basic authentication.
    pub client_id: String,
    /// Environment variable holding the client secret.
    #[serde(default)]
    pub client_secret_env: Option<String>,
    /// Connect timeout per attempt.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Allow plain `http` endpoints (loopback testing only).
    #[serde(default)]
    pub allow_http: bool,
}

impl IntrospectionConfig {
    /// Validates introspection settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let url = validate_url("auth.verifier.url", &self.url)?;
        if url.scheme() != "https" && !self.allow_http {
            return Err(ConfigError::Invalid(
                "auth.verifier.url must use https unless allow_http is set".to_string(),
            ));
        }
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.verifier.client_id must be non-empty".to_string()));
        }
        if self.connect_timeout_ms == 0 || self.connect_timeout_ms > MAX_VERIFY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "auth.verifier.connect_timeout_ms must be between 1 and {MAX_VERIFY_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Widget State
// ============================================================================

/// Widget state backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetStoreType {
    /// Process-local map.
    #[default]
    Memory,
    /// SQLite file.
    Sqlite,
}

/// Widget state storage configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WidgetStateConfig {
    /// Backend type.
    #[serde(rename = "type", default)]
    pub store_type: WidgetStoreType,
    /// SQLite database path.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// SQLite busy timeout.
    #[serde(default)]
    pub busy_timeout_ms: Option<u64>,
    /// SQLite journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// SQLite sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl WidgetStateConfig {
    /// SQLite settings when the sqlite backend is selected.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        if self.store_type != WidgetStoreType::Sqlite {
            return None;
        }
        let path = self.path.clone()?;
        let mut config = SqliteStoreConfig::at(path);
        if let Some(timeout) = self.busy_timeout_ms {
            config.busy_timeout_ms = timeout;
        }
        config.journal_mode = self.journal_mode;
        config.sync_mode = self.sync_mode;
        Some(config)
    }

    /// Validates widget state settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.store_type, &self.path) {
            (WidgetStoreType::Sqlite, None) => Err(ConfigError::Invalid(
                "widget_state.path is required for sqlite".to_string(),
            )),
            (WidgetStoreType::Sqlite, Some(path)) => {
                validate_path_string("widget_state.path", path)
            }
            (WidgetStoreType::Memory, Some(_)) => Err(ConfigError::Invalid(
                "widget_state.path is only valid for sqlite".to_string(),
            )),
            (WidgetStoreType::Memory, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing-subscriber` env-filter directive.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Validates logging settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.filter must be non-empty".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default body limit.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Default request timeout.
const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

/// Default issuer.
fn default_issuer() -> String {
    DEFAULT_ISSUER.to_string()
}

/// Default resource identifier.
fn default_resource() -> String {
    DEFAULT_RESOURCE.to_string()
}

/// Default audience.
fn default_audience() -> String {
    DEFAULT_AUDIENCE.to_string()
}

/// Default required scope.
fn default_required_scope() -> String {
    DEFAULT_REQUIRED_SCOPE.to_string()
}

/// Default verification budget.
const fn default_verify_timeout_ms() -> u64 {
    DEFAULT_VERIFY_TIMEOUT_MS
}

/// Default attempt count.
const fn default_max_attempts() -> u32 {
    3
}

/// Default first retry delay.
const fn default_initial_backoff_ms() -> u64 {
    100
}

/// Default backoff growth.
const fn default_multiplier() -> u32 {
    2
}

/// Default delay cap.
const fn default_max_backoff_ms() -> u64 {
    1_000
}

/// Default JWS algorithms.
fn default_algorithms() -> Vec<JwtAlgorithm> {
    vec![JwtAlgorithm::HS256]
}

/// Default introspection connect timeout.
const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

/// Default log filter.
fn default_log_filter() -> String {
    "info".to_string()
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI input, env var, or default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured file path.
fn validate_path_string(field: &str, path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Parses an absolute http(s) URL.
fn validate_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    let url =
        Url::parse(value).map_err(|err| ConfigError::Invalid(format!("{field} is not a url: {err}")))?;
    if !matches!(url.scheme(), "https" | "http") {
        return Err(ConfigError::Invalid(format!("{field} must be an http(s) url")));
    }
    Ok(url)
}

/// Validates an RFC 6749 scope token; it is quoted into challenge headers.
fn validate_scope_token(scope: &str) -> Result<(), ConfigError> {
    if scope.is_empty() || scope.len() > MAX_SCOPE_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "auth.required_scope must be 1..={MAX_SCOPE_LENGTH} bytes"
        )));
    }
    if !scope.bytes().all(|b| matches!(b, 0x21 | 0x23..=0x5B | 0x5D..=0x7E)) {
        return Err(ConfigError::Invalid(
            "auth.required_scope must be a single scope token".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
