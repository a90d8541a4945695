//! Integration tests for configuration management
//!
//! These tests verify that the Config struct can be loaded from disk,
//! validated, and processed with path expansion.

use evalbot_engine::config::Config;
use proptest::prelude::*;
use tempfile::TempDir;

fn toml_for(temp_root: &std::path::Path) -> String {
    format!(
        r#"
[core]
log_level = "debug"
temp_root = "{}"

[toolchain]
init_command = ["elm", "init", "--yes"]
install_command = ["elm", "install", "{{package}}"]
evaluator_command = ["node", "eval.js"]
stage_timeout_secs = 45

[chat]
api_base_url = "http://localhost:8081"
bot_token = "123:abc"
poll_timeout_secs = 10
report_cleanup_failures = false
"#,
        temp_root.display()
    )
}

#[test]
fn test_load_full_config_from_path() {
    let dir = TempDir::new().unwrap();
    let temp_root = dir.path().join("snippets");
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, toml_for(&temp_root)).unwrap();

    let config = Config::load_from_path(&config_path).unwrap();

    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.core.temp_root, temp_root);
    assert!(temp_root.is_dir(), "temp root should be created");
    assert_eq!(config.toolchain.init_command, vec!["elm", "init", "--yes"]);
    assert_eq!(
        config.toolchain.install_command,
        vec!["elm", "install", "{package}"]
    );
    assert_eq!(config.toolchain.evaluator_command, vec!["node", "eval.js"]);
    assert_eq!(
        config.toolchain.stage_timeout(),
        Some(std::time::Duration::from_secs(45))
    );
    assert_eq!(config.chat.api_base_url, "http://localhost:8081");
    assert_eq!(config.chat.bot_token.as_deref(), Some("123:abc"));
    assert_eq!(config.chat.poll_timeout_secs, 10);
    assert!(!config.chat.report_cleanup_failures);
}

#[test]
fn test_missing_sections_use_defaults() {
    let config = Config::from_toml_str("").unwrap();

    assert_eq!(config.core.log_level, "info");
    assert_eq!(config.toolchain.init_command, vec!["elm-make", "--yes"]);
    assert_eq!(
        config.toolchain.install_command,
        vec!["elm-package", "install", "--yes", "{package}"]
    );
    assert_eq!(config.toolchain.stage_timeout_secs, 120);
    assert_eq!(config.chat.api_base_url, "https://api.telegram.org");
    assert!(config.chat.report_cleanup_failures);
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let result = Config::load_from_path(&dir.path().join("nope.toml"));
    assert!(matches!(result, Err(sdk::errors::EngineError::Config(_))));
}

#[test]
fn test_install_command_without_placeholder_rejected() {
    let result = Config::from_toml_str(
        r#"
[toolchain]
install_command = ["elm-package", "install"]
"#,
    );
    assert!(result.is_err());
}

#[test]
fn test_empty_evaluator_command_rejected() {
    let result = Config::from_toml_str(
        r#"
[toolchain]
evaluator_command = []
"#,
    );
    assert!(result.is_err());
}

proptest! {
    #[test]
    fn test_config_parsing_round_trip(
        log_level in "error|warn|info|debug|trace",
        timeout in 0u64..=600,
        poll in 0u64..=60,
        report in any::<bool>(),
    ) {
        let mut config = Config::from_toml_str("").unwrap();
        config.core.log_level = log_level.clone();
        config.toolchain.stage_timeout_secs = timeout;
        config.chat.poll_timeout_secs = poll;
        config.chat.report_cleanup_failures = report;

        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed = Config::from_toml_str(&serialized).unwrap();

        prop_assert_eq!(parsed.core.log_level, log_level);
        prop_assert_eq!(parsed.toolchain.stage_timeout_secs, timeout);
        prop_assert_eq!(parsed.toolchain.stage_timeout().is_none(), timeout == 0);
        prop_assert_eq!(parsed.chat.poll_timeout_secs, poll);
        prop_assert_eq!(parsed.chat.report_cleanup_failures, report);
        prop_assert_eq!(parsed.core.temp_root, config.core.temp_root);
    }
}
