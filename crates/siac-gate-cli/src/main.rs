// crates/siac-gate-cli/src/main.rs
// ============================================================================
// Module: SIAC Gate CLI Entry Point
// Description: Command dispatcher for the SIAC tool gateway.
// Purpose: Start the MCP server, check configuration, and list tools.
// Dependencies: clap, siac-gate-config, siac-gate-mcp, thiserror, tokio, tracing
// ============================================================================

//! ## Overview
//! `siac-gate serve` runs the gateway on the configured transport,
//! `siac-gate config check` loads and validates a config file, and
//! `siac-gate tools list` prints the tool catalog as JSON. Logs go to stderr.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod logging;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde_json::json;
use siac_gate_config::AuthConfig;
use siac_gate_config::ServerTransport;
use siac_gate_config::SiacGateConfig;
use siac_gate_config::VerifierConfig;
use siac_gate_config::WidgetStoreType;
use siac_gate_mcp::McpServer;
use siac_gate_mcp::siac_registry;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "siac-gate", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the SIAC gateway.
    Serve(ConfigArgs),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Tool catalog utilities.
    Tools {
        /// Selected tools subcommand.
        #[command(subcommand)]
        command: ToolsCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a configuration file.
    Check(ConfigArgs),
}

/// Tools subcommands.
#[derive(Subcommand, Debug)]
enum ToolsCommand {
    /// Print tool descriptors as JSON.
    List(ToolsListCommand),
}

/// Config file selection shared by several commands.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Config file path (defaults to siac-gate.toml or `SIAC_GATE_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `tools list`.
#[derive(Args, Debug)]
struct ToolsListCommand {
    /// Config file whose required scope is advertised (built-in defaults otherwise).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the parsed command.
async fn run(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Commands::Serve(args) => command_serve(args).await,
        Commands::Config {
            command: ConfigCommand::Check(args),
        } => command_config_check(&args),
        Commands::Tools {
            command: ToolsCommand::List(command),
        } => command_tools_list(&command),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes `serve`.
async fn command_serve(args: ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(&args)?;
    logging::init(&config.logging).map_err(CliError::new)?;
    tracing::info!(summary = %describe_config(&config), "starting siac gateway");

    let server = tokio::task::spawn_blocking(move || McpServer::from_config(config))
        .await
        .map_err(|err| CliError::new(format!("server init failed: init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `config check`.
fn command_config_check(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    write_stdout_line(&format!("config ok: {}", describe_config(&config)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `tools list`.
fn command_tools_list(command: &ToolsListCommand) -> CliResult<ExitCode> {
    let auth = match &command.config {
        Some(path) => {
            SiacGateConfig::load(Some(path))
                .map_err(|err| CliError::new(format!("config load failed: {err}")))?
                .auth
        }
        None => AuthConfig::default(),
    };
    let registry = siac_registry(&auth.required_scope)
        .map_err(|err| CliError::new(format!("tool registry invalid: {err}")))?;
    let rendered = serde_json::to_string_pretty(&json!({ "tools": registry.descriptors() }))
        .map_err(|err| CliError::new(format!("tool listing failed: {err}")))?;
    write_stdout_line(&rendered)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates configuration.
fn load_config(args: &ConfigArgs) -> CliResult<SiacGateConfig> {
    SiacGateConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// One-line configuration summary without secrets.
fn describe_config(config: &SiacGateConfig) -> String {
    let transport = match config.server.transport {
        ServerTransport::Http => format!("http {}", config.server.bind),
        ServerTransport::Stdio => "stdio".to_string(),
    };
    let verifier = match &config.auth.verifier {
        VerifierConfig::Jwt(_) => "jwt",
        VerifierConfig::Introspection(_) => "introspection",
    };
    let widget_state = match config.widget_state.store_type {
        WidgetStoreType::Memory => "memory",
        WidgetStoreType::Sqlite => "sqlite",
    };
    format!(
        "transport={transport} resource={} verifier={verifier} widget_state={widget_state}",
        config.auth.resource
    )
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write to stdout: {err}")))
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
