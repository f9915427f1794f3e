// crates/siac-gate-mcp/src/lib.rs
// ============================================================================
// Module: SIAC Gate MCP
// Description: MCP server, token verification, and tool authorization.
// Purpose: Serve the SIAC tools behind a per-tool bearer-token gate.
// Dependencies: siac-gate-core, siac-gate-config, axum, jsonwebtoken, reqwest, tokio
// ============================================================================

//! ## Overview
//! A tool call flows through three stages: the [`AuthorizationGate`] decides
//! whether the caller may run the tool (verifying the bearer token with
//! [`TokenVerifier`] for protected tools), the tool's handler produces a flat
//! raw output, and the composer splits that output into model-visible and
//! render-only channels. [`McpServer`] exposes the [`ToolRouter`] over HTTP
//! and stdio.
//!
//! Tokens are verified locally ([`JwtClaimsSource`]) or by RFC 7662
//! introspection ([`IntrospectionClaimsSource`]). Every rejection produces
//! the same `WWW-Authenticate` challenge.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod auth;
pub mod gate;
pub mod introspection;
pub mod jwt;
pub mod metadata;
pub mod registry;
pub mod retry;
pub mod server;
pub mod tools;
pub mod verifier;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use auth::AuthAuditEvent;
pub use auth::AuthAuditSink;
pub use auth::NoopAuditSink;
pub use auth::RequestContext;
pub use auth::TracingAuditSink;
pub use gate::AuthChallenge;
pub use gate::AuthorizationGate;
pub use gate::AuthorizationOutcome;
pub use gate::GateSettings;
pub use gate::UnknownTool;
pub use introspection::IntrospectionClaimsSource;
pub use jwt::JwtClaimsSource;
pub use metadata::AuthInfo;
pub use metadata::ProtectedResourceMetadata;
pub use metadata::ServerInfo;
pub use registry::RegisteredTool;
pub use registry::ToolRegistry;
pub use retry::RetryPolicy;
pub use server::McpServer;
pub use server::McpServerError;
pub use tools::ToolError;
pub use tools::ToolRouter;
pub use tools::ToolRouterConfig;
pub use tools::siac_registry;
pub use verifier::ClaimsError;
pub use verifier::ClaimsSource;
pub use verifier::TokenClaims;
pub use verifier::TokenVerifier;
pub use verifier::VerificationFailure;
pub use verifier::VerifiedClaims;
