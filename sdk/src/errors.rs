//! Error types and handling
//!
//! This module provides the error types used throughout the evalbot engine.
//! All errors implement the `EvalbotErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Error hints are what a chat user sees when a request fails for reasons
//! unrelated to their snippet. They never include:
//! - Secrets (bot tokens)
//! - File paths of the temp root or environments
//! - Raw subprocess output

use thiserror::Error;

/// Trait for evalbot error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait EvalbotErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is the text of an `infrastructure_error` response and is safe
    /// to post into any conversation.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors affect a single request. Non-recoverable errors
    /// persist until the process is restarted or reconfigured.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// Every variant describes an infrastructure fault: something that went wrong
/// for reasons unrelated to the user's snippet. Snippet-caused failures (a
/// package that cannot be installed, an expression that does not evaluate)
/// are ordinary outcomes, not errors.
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Environment**: Template provisioning, cloning and deletion
/// - **Subprocess**: Spawn failures, deadlines, malformed evaluator output
/// - **Chat**: Platform API failures
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, EvalbotErrorExt};
///
/// let error = EngineError::EnvironmentCopy("disk full".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::TemplateUnavailable("init failed".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Environment errors
    #[error("Template provisioning failed: {0}")]
    TemplateProvisioning(String),

    #[error("Template environment unavailable: {0}")]
    TemplateUnavailable(String),

    #[error("Environment copy failed: {0}")]
    EnvironmentCopy(String),

    #[error("Environment cleanup failed: {0}")]
    Cleanup(String),

    // Subprocess errors
    #[error("Failed to spawn '{command}': {reason}")]
    Spawn { command: String, reason: String },

    #[error("{stage} exceeded its deadline of {secs} seconds")]
    StageTimeout { stage: String, secs: u64 },

    #[error("Malformed evaluator output: {0}")]
    MalformedEvaluatorOutput(String),

    // Chat platform errors
    #[error("Chat platform error: {0}")]
    ChatPlatform(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EvalbotErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            // Configuration errors
            Self::Config(_) => "The evaluator is misconfigured. Ask the bot operator to check config.toml",

            // Environment errors
            Self::TemplateProvisioning(_) | Self::TemplateUnavailable(_) => {
                "Couldn't prepare the base project for snippets. Ask the bot operator about it"
            }
            Self::EnvironmentCopy(_) => "Couldn't create a working directory for the snippet",
            Self::Cleanup(_) => "Couldn't delete the temp directory",

            // Subprocess errors
            Self::Spawn { .. } => "Couldn't start the language toolchain",
            Self::StageTimeout { .. } => "The snippet took too long and was stopped",
            Self::MalformedEvaluatorOutput(_) => "The evaluator returned something unexpected",

            // Chat platform errors
            Self::ChatPlatform(_) => "Chat platform request failed",

            // Generic IO error
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::Config(_) | Self::TemplateUnavailable(_) => false,

            // All other errors are scoped to one request
            _ => true,
        }
    }
}
