//! Evalbot Engine Library
//!
//! Snippet evaluation pipeline and its chat front end. Used by the `evalbot`
//! binary and by integration tests.

/// Configuration management module
pub mod config;

/// Disk-backed template and snippet environments
pub mod environment;

/// Subprocess-backed toolchain
pub mod toolchain;

/// Snippet execution pipeline
pub mod pipeline;

/// Shutdown signalling and the leftover sweep
pub mod lifecycle;

/// Message bus for inter-component communication
pub mod message_bus;

/// Telegram bot module
pub mod bot;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
