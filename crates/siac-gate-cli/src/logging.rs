// crates/siac-gate-cli/src/logging.rs
// ============================================================================
// Module: CLI Logging
// Description: Global tracing subscriber setup from the [logging] table.
// Purpose: Route structured logs to stderr so stdout stays free for output.
// Dependencies: siac-gate-config, tracing-subscriber
// ============================================================================

//! ## Overview
//! `RUST_LOG` overrides the configured filter when set and non-blank. Logs
//! always go to stderr; the stdio transport owns stdout.

use siac_gate_config::LogFormat;
use siac_gate_config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the configured filter.
pub(crate) const LOG_ENV: &str = "RUST_LOG";

/// Picks the filter directive, preferring a non-blank environment override.
pub(crate) fn resolve_filter(configured: &str, env_override: Option<&str>) -> String {
    env_override
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(configured)
        .to_string()
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns a message when the filter does not parse or a subscriber is
/// already installed.
pub(crate) fn init(config: &LoggingConfig) -> Result<(), String> {
    let env_override = std::env::var(LOG_ENV).ok();
    let directive = resolve_filter(&config.filter, env_override.as_deref());
    let filter = EnvFilter::try_new(&directive)
        .map_err(|err| format!("invalid log filter {directive}: {err}"))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| format!("logging init failed: {err}"))
}
