// crates/siac-gate-mcp/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: JSON-RPC 2.0 over HTTP and Content-Length framed stdio.
// Purpose: Expose the tool router, resource metadata, and widget state.
// Dependencies: axum, siac-gate-config, siac-gate-store-sqlite, tokio, tracing
// ============================================================================

//! ## Overview
//! [`McpServer`] wires configuration into a [`ToolRouter`] and serves it on
//! the configured transport. Both transports share one dispatch path, so method
//! handling and error codes are identical; only the envelope differs. Over
//! HTTP an auth failure is a 401 with the gate's `WWW-Authenticate` value;
//! over stdio the same JSON-RPC error is written without the envelope.
//!
//! HTTP routes: `POST /mcp` (JSON-RPC), `GET /mcp` (server info),
//! `GET /health`, `GET /auth/info`, `GET /.well-known/oauth-protected-resource`,
//! and `GET`/`PATCH /widget-state/{subject_id}`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::WWW_AUTHENTICATE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use siac_gate_config::AuthConfig;
use siac_gate_config::ServerTransport;
use siac_gate_config::SiacGateConfig;
use siac_gate_config::VerifierConfig;
use siac_gate_config::WidgetStateConfig;
use siac_gate_config::WidgetStoreType;
use siac_gate_core::Clock;
use siac_gate_core::InMemoryWidgetStateStore;
use siac_gate_core::SystemClock;
use siac_gate_core::ToolDescriptor;
use siac_gate_core::WidgetStatePatch;
use siac_gate_core::WidgetStateStore;
use siac_gate_store_sqlite::SqliteWidgetStateStore;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;

use crate::auth::AuthAuditSink;
use crate::auth::RequestContext;
use crate::auth::TracingAuditSink;
use crate::gate::AuthorizationGate;
use crate::gate::GateSettings;
use crate::introspection::IntrospectionClaimsSource;
use crate::jwt::JwtClaimsSource;
use crate::metadata::AUTH_INFO_PATH;
use crate::metadata::AuthInfo;
use crate::metadata::HEALTH_PATH;
use crate::metadata::MCP_PATH;
use crate::metadata::ProtectedResourceMetadata;
use crate::metadata::RESOURCE_METADATA_PATH;
use crate::metadata::ServerInfo;
use crate::metadata::WIDGET_STATE_PATH;
use crate::registry::ToolRegistry;
use crate::retry::RetryPolicy;
use crate::tools::ToolError;
use crate::tools::ToolRouter;
use crate::tools::ToolRouterConfig;
use crate::tools::siac_registry;
use crate::verifier::ClaimsSource;
use crate::verifier::TokenVerifier;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// MCP protocol revision announced by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";
/// Server name announced by `initialize`.
const SERVER_NAME: &str = "siac-gate";
/// Longest accepted stdio header line.
const MAX_HEADER_LINE_BYTES: u64 = 1024;

/// JSON-RPC parse error.
const PARSE_ERROR: i64 = -32700;
/// JSON-RPC invalid request.
const INVALID_REQUEST: i64 = -32600;
/// JSON-RPC method not found.
const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC invalid params.
const INVALID_PARAMS: i64 = -32602;
/// JSON-RPC internal error.
const INTERNAL_ERROR: i64 = -32603;
/// Authorization failure.
pub const UNAUTHORIZED: i64 = -32001;

// ============================================================================
// SECTION: MCP Server
// ============================================================================

/// MCP server instance.
pub struct McpServer {
    /// Server configuration.
    config: SiacGateConfig,
    /// Tool router for request dispatch.
    router: ToolRouter,
}

impl McpServer {
    /// Builds a server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when configuration is invalid or a
    /// component cannot be initialized.
    pub fn from_config(config: SiacGateConfig) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let widget_state = build_widget_store(&config.widget_state)?;
        let source = build_claims_source(&config.auth.verifier)?;
        let router =
            build_router(&config.auth, source, widget_state, clock, Arc::new(TracingAuditSink))?;
        Ok(Self {
            config,
            router,
        })
    }

    /// Builds a server around an existing router.
    #[must_use]
    pub const fn with_router(config: SiacGateConfig, router: ToolRouter) -> Self {
        Self {
            config,
            router,
        }
    }

    /// Tool router.
    #[must_use]
    pub const fn router(&self) -> &ToolRouter {
        &self.router
    }

    /// HTTP application for this server.
    #[must_use]
    pub fn http_app(&self) -> Router {
        let state = Arc::new(ServerState {
            router: self.router.clone(),
            metadata: Arc::new(ProtectedResourceMetadata::from_config(&self.config.auth)),
            auth_info: Arc::new(AuthInfo::from_config(&self.config.auth)),
            server_info: Arc::new(ServerInfo::from_config(
                SERVER_NAME,
                PROTOCOL_VERSION,
                &self.config.auth,
            )),
            request_timeout: Duration::from_millis(self.config.server.request_timeout_ms),
        });
        Router::new()
            .route(MCP_PATH, post(handle_rpc).get(handle_server_info))
            .route(HEALTH_PATH, get(handle_health))
            .route(AUTH_INFO_PATH, get(handle_auth_info))
            .route(RESOURCE_METADATA_PATH, get(handle_resource_metadata))
            .route(WIDGET_STATE_PATH, get(handle_widget_get).patch(handle_widget_set))
            .layer(DefaultBodyLimit::max(self.config.server.max_body_bytes))
            .with_state(state)
    }

    /// Serves requests on the configured transport until it closes.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the transport fails.
    pub async fn serve(self) -> Result<(), McpServerError> {
        match self.config.server.transport {
            ServerTransport::Stdio => {
                tracing::info!("serving json-rpc on stdio");
                serve_framed(
                    &self.router,
                    tokio::io::stdin(),
                    tokio::io::stdout(),
                    self.config.server.max_body_bytes,
                    Duration::from_millis(self.config.server.request_timeout_ms),
                )
                .await
            }
            ServerTransport::Http => {
                let addr = self
                    .config
                    .server
                    .bind_addr()
                    .map_err(|err| McpServerError::Config(err.to_string()))?;
                let app = self.http_app();
                let listener = tokio::net::TcpListener::bind(addr)
                    .await
                    .map_err(|_| McpServerError::Transport("http bind failed".to_string()))?;
                tracing::info!(%addr, resource = %self.config.auth.resource, "serving json-rpc on http");
                axum::serve(listener, app)
                    .await
                    .map_err(|_| McpServerError::Transport("http server failed".to_string()))
            }
        }
    }
}

// ============================================================================
// SECTION: Construction
// ============================================================================

/// Builds the widget state store selected by `[widget_state]`.
///
/// # Errors
///
/// Returns [`McpServerError`] when the SQLite store cannot be opened.
pub fn build_widget_store(
    config: &WidgetStateConfig,
) -> Result<Arc<dyn WidgetStateStore>, McpServerError> {
    match config.store_type {
        WidgetStoreType::Memory => Ok(Arc::new(InMemoryWidgetStateStore::new())),
        WidgetStoreType::Sqlite => {
            let sqlite = config.sqlite_config().ok_or_else(|| {
                McpServerError::Config("sqlite widget_state requires path".to_string())
            })?;
            let store = SqliteWidgetStateStore::new(&sqlite)
                .map_err(|err| McpServerError::Init(err.to_string()))?;
            Ok(Arc::new(store))
        }
    }
}

/// Builds the claims source selected by `[auth.verifier]`.
///
/// # Errors
///
/// Returns [`McpServerError::Init`] when key material or the HTTP client
/// cannot be loaded.
pub fn build_claims_source(
    config: &VerifierConfig,
) -> Result<Arc<dyn ClaimsSource>, McpServerError> {
    match config {
        VerifierConfig::Jwt(jwt) => {
            let source = JwtClaimsSource::from_config(jwt)
                .map_err(|err| McpServerError::Init(err.to_string()))?;
            Ok(Arc::new(source))
        }
        VerifierConfig::Introspection(introspection) => {
            let source = IntrospectionClaimsSource::from_config(introspection)
                .map_err(|err| McpServerError::Init(err.to_string()))?;
            Ok(Arc::new(source))
        }
    }
}

/// Wires the registry, verifier, and gate into a router.
///
/// # Errors
///
/// Returns [`McpServerError::Init`] when the tool registry is invalid.
pub fn build_router(
    auth: &AuthConfig,
    source: Arc<dyn ClaimsSource>,
    widget_state: Arc<dyn WidgetStateStore>,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuthAuditSink>,
) -> Result<ToolRouter, McpServerError> {
    let registry: Arc<ToolRegistry> = Arc::new(
        siac_registry(&auth.required_scope).map_err(|err| McpServerError::Init(err.to_string()))?,
    );
    let verifier = TokenVerifier::new(source, Arc::clone(&clock))
        .with_retry(RetryPolicy::from_config(&auth.retry))
        .with_budget(Duration::from_millis(auth.verify_timeout_ms));
    let settings = GateSettings {
        resource: auth.resource.clone(),
        issuer: auth.issuer.clone(),
        audience: auth.audience.clone(),
    };
    let gate = AuthorizationGate::new(Arc::clone(&registry), Arc::new(verifier), settings, audit);
    Ok(ToolRouter::new(ToolRouterConfig {
        registry,
        gate: Arc::new(gate),
        widget_state,
        clock,
    }))
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Shared state for HTTP handlers.
struct ServerState {
    /// Tool router.
    router: ToolRouter,
    /// Discovery document.
    metadata: Arc<ProtectedResourceMetadata>,
    /// Auth info document.
    auth_info: Arc<AuthInfo>,
    /// Server info document.
    server_info: Arc<ServerInfo>,
    /// Per-request timeout.
    request_timeout: Duration,
}

/// Handles `POST /mcp`.
async fn handle_rpc(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Response {
    let auth_header = headers
        .get(AUTHORIZATION)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());
    let context = RequestContext::http(auth_header);
    dispatch_with_timeout(&state.router, &context, &bytes, state.request_timeout)
        .await
        .into_response()
}

/// Handles `GET /health`.
async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Handles `GET /.well-known/oauth-protected-resource`.
async fn handle_resource_metadata(
    State(state): State<Arc<ServerState>>,
) -> Json<ProtectedResourceMetadata> {
    Json(state.metadata.as_ref().clone())
}

/// Handles `GET /auth/info`.
async fn handle_auth_info(State(state): State<Arc<ServerState>>) -> Json<AuthInfo> {
    Json(state.auth_info.as_ref().clone())
}

/// Handles `GET /mcp`.
async fn handle_server_info(State(state): State<Arc<ServerState>>) -> Json<ServerInfo> {
    Json(state.server_info.as_ref().clone())
}

/// Handles `GET /widget-state/{subject_id}`.
async fn handle_widget_get(
    State(state): State<Arc<ServerState>>,
    Path(subject_id): Path<String>,
) -> Response {
    match state.router.widget_state_get(&subject_id) {
        Ok(widget) => Json(widget).into_response(),
        Err(err) => widget_error(&err),
    }
}

/// Handles `PATCH /widget-state/{subject_id}`.
async fn handle_widget_set(
    State(state): State<Arc<ServerState>>,
    Path(subject_id): Path<String>,
    Json(patch): Json<WidgetStatePatch>,
) -> Response {
    match state.router.widget_state_set(&subject_id, patch) {
        Ok(widget) => Json(widget).into_response(),
        Err(err) => widget_error(&err),
    }
}

/// Plain JSON error for the widget state routes.
fn widget_error(err: &ToolError) -> Response {
    let (status, message) = match err {
        ToolError::InvalidParams(message) => (StatusCode::BAD_REQUEST, message.clone()),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
}

// ============================================================================
// SECTION: Stdio Transport
// ============================================================================

/// Serves Content-Length framed JSON-RPC until `reader` reaches end of input.
///
/// # Errors
///
/// Returns [`McpServerError::Transport`] on I/O failure or an invalid frame.
pub async fn serve_framed<R, W>(
    router: &ToolRouter,
    reader: R,
    mut writer: W,
    max_body_bytes: usize,
    request_timeout: Duration,
) -> Result<(), McpServerError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let context = RequestContext::stdio();
    while let Some(bytes) = read_framed(&mut reader, max_body_bytes).await? {
        let reply = dispatch_with_timeout(router, &context, &bytes, request_timeout).await;
        if let Some(body) = reply.body {
            let payload = serde_json::to_vec(&body).map_err(|_| {
                McpServerError::Transport("json-rpc serialization failed".to_string())
            })?;
            write_framed(&mut writer, &payload).await?;
        }
    }
    tracing::info!("stdio input closed");
    Ok(())
}

/// Reads one framed payload; `None` at end of input between frames.
async fn read_framed<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max_body_bytes: usize,
) -> Result<Option<Vec<u8>>, McpServerError> {
    let mut content_length: Option<usize> = None;
    let mut in_headers = false;
    let mut line = String::new();
    loop {
        line.clear();
        let mut limited = (&mut *reader).take(MAX_HEADER_LINE_BYTES + 1);
        let bytes = limited
            .read_line(&mut line)
            .await
            .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
        if limited.limit() == 0 {
            return Err(McpServerError::Transport("frame header too long".to_string()));
        }
        if bytes == 0 {
            if in_headers {
                return Err(McpServerError::Transport("stdio closed mid-frame".to_string()));
            }
            return Ok(None);
        }
        if line.trim().is_empty() {
            if in_headers {
                break;
            }
            continue;
        }
        in_headers = true;
        if let Some((name, value)) = line.split_once(':')
            && name.trim().eq_ignore_ascii_case("content-length")
        {
            let parsed = value
                .trim()
                .parse::<usize>()
                .map_err(|_| McpServerError::Transport("invalid content length".to_string()))?;
            content_length = Some(parsed);
        }
    }
    let len = content_length
        .ok_or_else(|| McpServerError::Transport("missing content length".to_string()))?;
    if len > max_body_bytes {
        return Err(McpServerError::Transport("payload too large".to_string()));
    }
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
    Ok(Some(buf))
}

/// Writes one framed payload.
async fn write_framed<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), McpServerError> {
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer
        .write_all(header.as_bytes())
        .await
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))?;
    writer
        .write_all(payload)
        .await
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))?;
    writer.flush().await.map_err(|_| McpServerError::Transport("stdio write failed".to_string()))
}

// ============================================================================
// SECTION: JSON-RPC Types
// ============================================================================

/// Incoming JSON-RPC message.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// Protocol version.
    jsonrpc: String,
    /// Request identifier; absent for notifications.
    #[serde(default)]
    id: Option<Value>,
    /// Method name.
    method: String,
    /// Parameters.
    #[serde(default)]
    params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    /// Protocol version.
    jsonrpc: &'static str,
    /// Request identifier.
    id: Value,
    /// Success payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    /// Error payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error payload.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    /// Error code.
    code: i64,
    /// Message safe to show callers.
    message: String,
    /// Structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

/// `tools/call` parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Tool arguments.
    #[serde(default)]
    arguments: Value,
    /// `Authorization` value for transports without headers.
    #[serde(default)]
    authorization_header: Option<String>,
}

/// `widget_state/get` parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WidgetStateGetParams {
    /// Subject to read.
    subject_id: String,
}

/// `widget_state/set` parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WidgetStateSetParams {
    /// Subject to update.
    subject_id: String,
    /// Partial update.
    update: WidgetStatePatch,
}

/// Transport-neutral reply.
#[derive(Debug)]
struct RpcReply {
    /// HTTP status.
    status: StatusCode,
    /// `WWW-Authenticate` value for auth failures.
    challenge: Option<String>,
    /// Response body; `None` for notifications.
    body: Option<JsonRpcResponse>,
}

impl RpcReply {
    /// Successful result.
    const fn ok(id: Value, result: Value) -> Self {
        Self {
            status: StatusCode::OK,
            challenge: None,
            body: Some(JsonRpcResponse {
                jsonrpc: "2.0",
                id,
                result: Some(result),
                error: None,
            }),
        }
    }

    /// Error result.
    fn error(status: StatusCode, id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            status,
            challenge: None,
            body: Some(JsonRpcResponse {
                jsonrpc: "2.0",
                id,
                result: None,
                error: Some(JsonRpcError {
                    code,
                    message: message.into(),
                    data: None,
                }),
            }),
        }
    }

    /// Notification acknowledgement.
    const fn accepted() -> Self {
        Self {
            status: StatusCode::ACCEPTED,
            challenge: None,
            body: None,
        }
    }
}

impl IntoResponse for RpcReply {
    fn into_response(self) -> Response {
        let mut response = match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        };
        if let Some(challenge) = self.challenge
            && let Ok(value) = HeaderValue::from_str(&challenge)
        {
            response.headers_mut().insert(WWW_AUTHENTICATE, value);
        }
        response
    }
}

// ============================================================================
// SECTION: JSON-RPC Handling
// ============================================================================

/// Dispatches under the request timeout.
///
/// A timed-out request keeps its id; a timed-out notification still gets no
/// body.
async fn dispatch_with_timeout(
    router: &ToolRouter,
    context: &RequestContext,
    bytes: &[u8],
    request_timeout: Duration,
) -> RpcReply {
    let Ok(value) = serde_json::from_slice::<Value>(bytes) else {
        return parse_error();
    };
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let notification = is_notification(&value);
    match tokio::time::timeout(request_timeout, dispatch_value(router, context, value)).await {
        Ok(reply) => reply,
        Err(_) => {
            tracing::warn!(timeout_ms = request_timeout.as_millis(), "request timed out");
            if notification {
                return RpcReply::accepted();
            }
            RpcReply::error(StatusCode::SERVICE_UNAVAILABLE, id, INTERNAL_ERROR, "request timed out")
        }
    }
}

/// Dispatches one decoded JSON-RPC message.
async fn dispatch_value(router: &ToolRouter, context: &RequestContext, value: Value) -> RpcReply {
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let Ok(request) = serde_json::from_value::<JsonRpcRequest>(value) else {
        return RpcReply::error(StatusCode::BAD_REQUEST, id, INVALID_REQUEST, "invalid request");
    };
    if request.jsonrpc != "2.0" {
        return RpcReply::error(
            StatusCode::BAD_REQUEST,
            id,
            INVALID_REQUEST,
            "invalid json-rpc version",
        );
    }
    handle_request(router, context, request).await
}

/// Parse error reply; the id is unknown.
fn parse_error() -> RpcReply {
    RpcReply::error(StatusCode::BAD_REQUEST, Value::Null, PARSE_ERROR, "parse error")
}

/// True when the message expects no response.
fn is_notification(value: &Value) -> bool {
    let method = value.get("method").and_then(Value::as_str).unwrap_or_default();
    value.get("id").is_none_or(Value::is_null) || method.starts_with("notifications/")
}

/// Routes a parsed request by method.
async fn handle_request(
    router: &ToolRouter,
    base_context: &RequestContext,
    request: JsonRpcRequest,
) -> RpcReply {
    let id = match request.id {
        Some(id) if !request.method.starts_with("notifications/") => id,
        _ => {
            tracing::debug!(method = %request.method, "notification accepted");
            return RpcReply::accepted();
        }
    };
    let context = base_context.clone().with_request_id(id.to_string());
    let params = request.params.unwrap_or(Value::Null);
    match request.method.as_str() {
        "initialize" => RpcReply::ok(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": { "listChanged": false } },
                "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
            }),
        ),
        "ping" => RpcReply::ok(id, json!({})),
        "tools/list" => to_result(id, &ToolList {
            tools: router.list_tools(),
        }),
        "tools/call" => {
            let call = match serde_json::from_value::<ToolCallParams>(params) {
                Ok(call) => call,
                Err(err) => return invalid_params(id, &err),
            };
            let context = context.with_fallback_header(call.authorization_header);
            match router.call_tool(&context, &call.name, call.arguments).await {
                Ok(result) => to_result(id, &result),
                Err(err) => tool_error_reply(id, err),
            }
        }
        "widget_state/get" => {
            let params = match serde_json::from_value::<WidgetStateGetParams>(params) {
                Ok(params) => params,
                Err(err) => return invalid_params(id, &err),
            };
            match router.widget_state_get(&params.subject_id) {
                Ok(widget) => to_result(id, &widget),
                Err(err) => tool_error_reply(id, err),
            }
        }
        "widget_state/set" => {
            let params = match serde_json::from_value::<WidgetStateSetParams>(params) {
                Ok(params) => params,
                Err(err) => return invalid_params(id, &err),
            };
            match router.widget_state_set(&params.subject_id, params.update) {
                Ok(widget) => to_result(id, &widget),
                Err(err) => tool_error_reply(id, err),
            }
        }
        other => {
            tracing::debug!(method = other, "unknown json-rpc method");
            RpcReply::error(StatusCode::BAD_REQUEST, id, METHOD_NOT_FOUND, "method not found")
        }
    }
}

/// `tools/list` result.
#[derive(Serialize)]
struct ToolList {
    /// Tool descriptors.
    tools: Vec<ToolDescriptor>,
}

/// Serializes a success payload.
fn to_result<T: Serialize>(id: Value, payload: &T) -> RpcReply {
    match serde_json::to_value(payload) {
        Ok(value) => RpcReply::ok(id, value),
        Err(err) => {
            tracing::error!(error = %err, "json-rpc result serialization failed");
            RpcReply::error(StatusCode::INTERNAL_SERVER_ERROR, id, INTERNAL_ERROR, "internal error")
        }
    }
}

/// Invalid params reply.
fn invalid_params(id: Value, err: &serde_json::Error) -> RpcReply {
    RpcReply::error(StatusCode::BAD_REQUEST, id, INVALID_PARAMS, format!("invalid params: {err}"))
}

/// Maps a router error to a JSON-RPC reply.
fn tool_error_reply(id: Value, error: ToolError) -> RpcReply {
    match error {
        ToolError::UnknownTool(name) => RpcReply::error(
            StatusCode::BAD_REQUEST,
            id,
            METHOD_NOT_FOUND,
            format!("unknown tool: {name}"),
        ),
        ToolError::Unauthorized(challenge) => {
            let mut reply =
                RpcReply::error(StatusCode::UNAUTHORIZED, id, UNAUTHORIZED, "unauthorized");
            if let Some(body) = reply.body.as_mut()
                && let Some(error) = body.error.as_mut()
            {
                error.data = Some(json!({
                    "detail": challenge.detail(),
                    "wwwAuthenticate": challenge.www_authenticate,
                }));
            }
            reply.challenge = Some(challenge.www_authenticate);
            reply
        }
        ToolError::InvalidParams(message) => {
            RpcReply::error(StatusCode::BAD_REQUEST, id, INVALID_PARAMS, message)
        }
        ToolError::Internal(_) => {
            RpcReply::error(StatusCode::INTERNAL_SERVER_ERROR, id, INTERNAL_ERROR, "internal error")
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP server errors.
#[derive(Debug, thiserror::Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
