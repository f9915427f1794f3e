// crates/siac-gate-config/src/lib.rs
// ============================================================================
// Module: SIAC Gate Config Library
// Description: Public API surface for gateway configuration.
// Purpose: Expose the config model and its loader.
// Dependencies: crate::config
// ============================================================================

//! ## Overview
//! Canonical configuration model for the SIAC gateway, loaded from TOML and
//! validated fail-closed before any server component is built.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuthConfig;
pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::IntrospectionConfig;
pub use config::JwtAlgorithm;
pub use config::JwtVerifierConfig;
pub use config::LogFormat;
pub use config::LoggingConfig;
pub use config::RetryConfig;
pub use config::ServerConfig;
pub use config::ServerTransport;
pub use config::SiacGateConfig;
pub use config::VerifierConfig;
pub use config::WidgetStateConfig;
pub use config::WidgetStoreType;
