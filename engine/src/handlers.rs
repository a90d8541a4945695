//! Command handlers for CLI operations
//!
//! - serve: run the chat bot until SIGINT/SIGTERM, then sweep
//! - eval: run one snippet through the pipeline and print the response
//! - sweep: delete leftover environment directories
//! - doctor: check toolchain programs and the temp root

use anyhow::{Context, Result};
use sdk::types::SnippetRequest;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use crate::bot::render::render;
use crate::bot::TelegramBot;
use crate::config::{Config, BOT_TOKEN_ENV};
use crate::lifecycle::{self, ShutdownSignal, SweepReport};
use crate::message_bus::{Event, MessageBus};
use crate::pipeline::{PipelineOutcome, SnippetPipeline};
use crate::toolchain::CommandToolchain;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

fn build_pipeline(config: &Config) -> Arc<SnippetPipeline> {
    let toolchain = Arc::new(CommandToolchain::from_config(&config.toolchain));
    Arc::new(SnippetPipeline::with_root(
        config.core.temp_root.clone(),
        toolchain,
    ))
}

/// Run the chat bot until interrupted
///
/// The template is provisioned before polling starts. On shutdown the sweep
/// always runs, even when the bot loop failed.
pub async fn handle_serve(config: &Config, format: OutputFormat) -> Result<()> {
    let token = config.chat.resolve_token().with_context(|| {
        format!(
            "No bot token configured. Set {} or chat.bot_token in config.toml",
            BOT_TOKEN_ENV
        )
    })?;

    let shutdown = ShutdownSignal::new();
    let _signal_handle = shutdown.install_handlers();
    tracing::info!("Signal handlers installed");

    let pipeline = build_pipeline(config);
    let bus = MessageBus::new();

    let result = tokio::select! {
        _ = shutdown.wait() => Ok(()),
        ready = pipeline.provision() => {
            if !ready {
                tracing::warn!("Serving without a template; /eval will report an infrastructure error");
            }
            let bot = TelegramBot::new(&config.chat, token, pipeline.clone(), bus.clone());
            bot.run(shutdown.clone()).await
        }
    };

    bus.publish(Event::ShutdownRequested).await;
    tracing::info!("Shutting down, sweeping environments");
    let report = lifecycle::sweep(&config.core.temp_root).await;
    print_sweep(&report, format)?;

    result
}

/// Evaluate a single snippet locally
///
/// Only this run's own template is removed afterwards, so a concurrently
/// running `serve` keeps its directories. Unlike `serve`, an interrupt here
/// does not run the prefix sweep; `evalbot sweep` clears any leftovers.
pub async fn handle_eval(
    packages: Vec<String>,
    imports: Vec<String>,
    expressions: Vec<String>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let request = SnippetRequest {
        conversation_id: "cli".into(),
        packages,
        imports,
        expressions,
    };

    let shutdown = ShutdownSignal::new();
    let _signal_handle = shutdown.install_handlers();
    let pipeline = build_pipeline(config);

    let outcome = tokio::select! {
        outcome = pipeline.run(request) => Some(outcome),
        _ = shutdown.wait() => None,
    };

    if let Err(e) = pipeline.provisioner().teardown().await {
        tracing::warn!("Failed to remove template: {}", e);
    }

    match outcome {
        Some(outcome) => print_outcome(&outcome, format),
        None => anyhow::bail!("Interrupted"),
    }
}

/// Delete every leftover template and snippet directory
pub async fn handle_sweep(config: &Config, format: OutputFormat) -> Result<()> {
    let report = lifecycle::sweep(&config.core.temp_root).await;
    print_sweep(&report, format)?;

    if !report.is_clean() {
        anyhow::bail!("{} director(ies) could not be removed", report.failed.len());
    }
    Ok(())
}

/// Check the configured toolchain and the temp root
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks = Vec::new();

    // Config is already validated when loaded
    checks.push(("Configuration".to_string(), "Valid".to_string()));

    let toolchain = CommandToolchain::from_config(&config.toolchain);
    for program in toolchain.programs() {
        match which::which(program) {
            Ok(path) => checks.push((program.to_string(), path.display().to_string())),
            Err(_) => {
                checks.push((program.to_string(), "Not found".to_string()));
                issues.push(format!("'{}' is not on PATH", program));
            }
        }
    }

    match probe_writable(&config.core.temp_root).await {
        Ok(()) => checks.push(("Temp root".to_string(), "Writable".to_string())),
        Err(e) => {
            checks.push(("Temp root".to_string(), "Not writable".to_string()));
            issues.push(format!(
                "Cannot write to {}: {}",
                config.core.temp_root.display(),
                e
            ));
        }
    }

    let token = if config.chat.resolve_token().is_some() {
        "Configured"
    } else {
        "Not configured"
    };
    checks.push(("Bot token".to_string(), token.to_string()));

    match format {
        OutputFormat::Text => {
            println!("Evalbot System Diagnostics");
            println!("============================");
            println!();

            println!("System Checks:");
            for (check, status) in &checks {
                println!("  {:<25} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    if !issues.is_empty() {
        anyhow::bail!("{} check(s) failed", issues.len());
    }
    Ok(())
}

async fn probe_writable(root: &Path) -> std::io::Result<()> {
    let probe = root.join(format!(".evalbot_probe_{}", uuid::Uuid::new_v4().simple()));
    tokio::fs::write(&probe, b"ok").await?;
    tokio::fs::remove_file(&probe).await
}

fn print_outcome(outcome: &PipelineOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{}", render(&outcome.response.kind));
            if let Some(cleanup) = &outcome.cleanup_error {
                eprintln!("{}", render(&cleanup.kind));
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "response": outcome.response,
                "cleanup_error": outcome.cleanup_error,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn print_sweep(report: &SweepReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("Removed {} environment director(ies)", report.removed.len());
            for (path, error) in &report.failed {
                eprintln!("  Could not remove {}: {}", path.display(), error);
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "removed": report.removed.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
                "failed": report.failed.iter().map(|(p, e)| json!({
                    "path": p.display().to_string(),
                    "error": e,
                })).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}
