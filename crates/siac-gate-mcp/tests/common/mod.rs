// crates/siac-gate-mcp/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared claims sources, audit sinks, and router builders.
// Purpose: Provide deterministic collaborators for gate and router tests.
// Dependencies: siac-gate-core, siac-gate-mcp
// ============================================================================

//! ## Overview
//! Fixtures script the claims source so each test controls exactly what the
//! trust collaborator returns, and record audit events and retry delays.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test fixtures.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use siac_gate_config::AuthConfig;
use siac_gate_core::InMemoryWidgetStateStore;
use siac_gate_core::ManualClock;
use siac_gate_core::WidgetStateStore;
use siac_gate_mcp::AuthAuditEvent;
use siac_gate_mcp::AuthAuditSink;
use siac_gate_mcp::ClaimsError;
use siac_gate_mcp::ClaimsSource;
use siac_gate_mcp::TokenClaims;
use siac_gate_mcp::ToolRouter;
use siac_gate_mcp::retry::Sleeper;
use siac_gate_mcp::server::build_router;
use siac_gate_mcp::verifier::TokenShape;
use siac_gate_mcp::verifier::parse_scope;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Expected issuer.
pub const ISSUER: &str = "https://auth.siac-app.com";
/// Expected audience.
pub const AUDIENCE: &str = "siac-assistant";
/// Protected resource (challenge realm).
pub const RESOURCE: &str = "https://api.siac-app.com/mcp";
/// Scope required by protected tools.
pub const SCOPE: &str = "siac.user.full_access";
/// Fixed "now" for every test clock.
pub const NOW: i64 = 1_700_000_000;
/// Challenge expected for every protected tool rejection.
pub const CHALLENGE: &str =
    "Bearer realm=\"https://api.siac-app.com/mcp\", scope=\"siac.user.full_access\"";

// ============================================================================
// SECTION: Claims
// ============================================================================

/// Claims that pass every check at [`NOW`].
#[must_use]
pub fn valid_claims() -> TokenClaims {
    TokenClaims {
        issuer: Some(ISSUER.to_string()),
        audiences: vec![AUDIENCE.to_string()],
        subject: "user-42".to_string(),
        scopes: parse_scope(Some("openid siac.user.full_access")),
        expires_at: OffsetDateTime::from_unix_timestamp(NOW + 3600).unwrap(),
    }
}

/// Clock pinned at [`NOW`].
#[must_use]
pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at_unix(NOW))
}

// ============================================================================
// SECTION: Claims Sources
// ============================================================================

/// Returns scripted results in order, repeating the last one.
pub struct ScriptedSource {
    /// Accepted token shape.
    shape: TokenShape,
    /// Remaining results.
    script: Mutex<VecDeque<Result<TokenClaims, ClaimsError>>>,
    /// Number of `claims` calls.
    calls: AtomicUsize,
}

impl ScriptedSource {
    /// Opaque-token source with a script.
    #[must_use]
    pub fn new(script: Vec<Result<TokenClaims, ClaimsError>>) -> Arc<Self> {
        Arc::new(Self {
            shape: TokenShape::Opaque,
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Source that always returns `claims`.
    #[must_use]
    pub fn always(claims: TokenClaims) -> Arc<Self> {
        Self::new(vec![Ok(claims)])
    }

    /// Transient upstream failure.
    #[must_use]
    pub fn transient() -> Result<TokenClaims, ClaimsError> {
        Err(ClaimsError::Upstream {
            retryable: true,
            message: "introspection endpoint returned 503".to_string(),
        })
    }

    /// Calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClaimsSource for ScriptedSource {
    fn token_shape(&self) -> TokenShape {
        self.shape
    }

    async fn claims(&self, _token: &str) -> Result<TokenClaims, ClaimsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            return script.pop_front().unwrap();
        }
        script.front().cloned().unwrap_or(Err(ClaimsError::Inactive))
    }
}

/// Source that never answers.
pub struct HangingSource;

#[async_trait]
impl ClaimsSource for HangingSource {
    fn token_shape(&self) -> TokenShape {
        TokenShape::Opaque
    }

    async fn claims(&self, _token: &str) -> Result<TokenClaims, ClaimsError> {
        std::future::pending().await
    }
}

// ============================================================================
// SECTION: Recorders
// ============================================================================

/// Audit sink that keeps every event.
#[derive(Default)]
pub struct RecordingAuditSink {
    /// Recorded events.
    events: Mutex<Vec<AuthAuditEvent>>,
}

impl RecordingAuditSink {
    /// Recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<AuthAuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl AuthAuditSink for RecordingAuditSink {
    fn record(&self, event: &AuthAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Sleeper that records delays without waiting.
#[derive(Default)]
pub struct RecordingSleeper {
    /// Requested delays.
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Requested delays.
    #[must_use]
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}

// ============================================================================
// SECTION: Routers
// ============================================================================

/// Router over the SIAC tools with default auth settings.
#[must_use]
pub fn router_with(
    source: Arc<dyn ClaimsSource>,
    widget_state: Arc<dyn WidgetStateStore>,
    audit: Arc<dyn AuthAuditSink>,
) -> ToolRouter {
    build_router(&AuthConfig::default(), source, widget_state, clock(), audit).unwrap()
}

/// Router whose source accepts every token as [`valid_claims`].
#[must_use]
pub fn trusting_router() -> ToolRouter {
    router_with(
        ScriptedSource::always(valid_claims()),
        Arc::new(InMemoryWidgetStateStore::new()),
        Arc::new(RecordingAuditSink::default()),
    )
}
