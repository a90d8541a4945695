// Evalbot snippet evaluation engine
// Main entry point for the evalbot binary

use clap::Parser;
use evalbot_engine::cli::{Cli, Command};
use evalbot_engine::config::Config;
use evalbot_engine::handlers::{
    handle_doctor, handle_eval, handle_serve, handle_sweep, OutputFormat,
};
use evalbot_engine::telemetry::{init_telemetry, init_telemetry_with_level, resolve_log_level};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config = match &cli.config {
        Some(config_path) => Config::load_from_path(config_path),
        None => Config::load_or_create(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            init_telemetry();
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // RUST_LOG still wins over both
    init_telemetry_with_level(resolve_log_level(
        cli.log.as_deref(),
        &config.core.log_level,
    ));

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Evalbot Engine v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Command::Serve => {
            tracing::info!("Starting chat bot...");
            handle_serve(&config, format).await
        }

        Command::Eval {
            packages,
            imports,
            expressions,
        } => handle_eval(packages, imports, expressions, &config, format).await,

        Command::Sweep => {
            tracing::info!("Sweeping leftover environments...");
            handle_sweep(&config, format).await
        }

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }
    }
}
