//! Configuration management
//!
//! This module handles loading, validation, and management of the evalbot configuration.
//! Configuration is stored in TOML format at ~/.evalbot/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, temp root for environments
//! - **toolchain**: Init, install and evaluator commands, per-stage deadline
//! - **chat**: Chat platform API settings
//!
//! # Command Templates
//!
//! Toolchain commands are argument vectors, never shell strings. In
//! `install_command` every `{package}` placeholder is replaced with the package
//! name being installed.
//!
//! # Examples
//!
//! ```no_run
//! use evalbot_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration from default location
//! let config = Config::load_or_create()?;
//!
//! println!("Temp root: {:?}", config.core.temp_root);
//! println!("Evaluator: {:?}", config.toolchain.evaluator_command);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `chat.bot_token`
pub const BOT_TOKEN_ENV: &str = "EVALBOT_BOT_TOKEN";

/// Placeholder substituted with the package name in `install_command`
pub const PACKAGE_PLACEHOLDER: &str = "{package}";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// External toolchain commands
    #[serde(default)]
    pub toolchain: ToolchainConfig,

    /// Chat platform settings
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory under which template and snippet environments are created
    /// (supports ~ expansion, defaults to the system temp dir)
    #[serde(default = "std::env::temp_dir")]
    pub temp_root: PathBuf,
}

/// Toolchain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Non-interactive project initialization, run once in the template
    #[serde(default = "default_init_command")]
    pub init_command: Vec<String>,

    /// Non-interactive package install, run once per package
    #[serde(default = "default_install_command")]
    pub install_command: Vec<String>,

    /// Evaluator reading `{"imports", "expressions"}` JSON on stdin
    #[serde(default = "default_evaluator_command")]
    pub evaluator_command: Vec<String>,

    /// Deadline for each subprocess stage in seconds; 0 waits indefinitely
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,
}

/// Chat platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Base URL of the Bot API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Bot token (prefer the EVALBOT_BOT_TOKEN environment variable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    /// Long-polling timeout in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Send a follow-up message when deleting a snippet environment fails
    #[serde(default = "default_true")]
    pub report_cleanup_failures: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            temp_root: std::env::temp_dir(),
        }
    }
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            init_command: default_init_command(),
            install_command: default_install_command(),
            evaluator_command: default_evaluator_command(),
            stage_timeout_secs: default_stage_timeout_secs(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            bot_token: None,
            poll_timeout_secs: default_poll_timeout(),
            report_cleanup_failures: true,
        }
    }
}

impl ToolchainConfig {
    /// Per-stage deadline as a `Duration`
    pub fn stage_timeout(&self) -> Option<Duration> {
        (self.stage_timeout_secs > 0).then(|| Duration::from_secs(self.stage_timeout_secs))
    }
}

impl ChatConfig {
    /// Resolve the bot token, environment variable first
    pub fn resolve_token(&self) -> Option<String> {
        std::env::var(BOT_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.bot_token.clone())
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_init_command() -> Vec<String> {
    vec!["elm-make".to_string(), "--yes".to_string()]
}

fn default_install_command() -> Vec<String> {
    vec![
        "elm-package".to_string(),
        "install".to_string(),
        "--yes".to_string(),
        PACKAGE_PLACEHOLDER.to_string(),
    ]
}

fn default_evaluator_command() -> Vec<String> {
    vec!["elm-eval".to_string()]
}

fn default_stage_timeout_secs() -> u64 {
    120
}

fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from the default location (~/.evalbot/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails (unknown log level, empty commands)
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default();
        config.validate_and_process()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.evalbot/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".evalbot").join("config.toml"))
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates the log level
    /// - Rejects empty toolchain commands
    /// - Requires `{package}` in the install command
    /// - Expands ~ in the temp root and creates it if missing
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        for (name, command) in [
            ("init_command", &self.toolchain.init_command),
            ("install_command", &self.toolchain.install_command),
            ("evaluator_command", &self.toolchain.evaluator_command),
        ] {
            if command.first().map_or(true, |program| program.trim().is_empty()) {
                return Err(EngineError::Config(format!(
                    "toolchain.{} must name a program",
                    name
                )));
            }
        }

        if !self
            .toolchain
            .install_command
            .iter()
            .any(|arg| arg.contains(PACKAGE_PLACEHOLDER))
        {
            return Err(EngineError::Config(format!(
                "toolchain.install_command must contain the {} placeholder",
                PACKAGE_PLACEHOLDER
            )));
        }

        self.core.temp_root = expand_path(&self.core.temp_root)?;
        if !self.core.temp_root.exists() {
            fs::create_dir_all(&self.core.temp_root).map_err(|e| {
                EngineError::Config(format!("Failed to create temp root: {}", e))
            })?;
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
