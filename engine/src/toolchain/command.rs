use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::toolchain::Toolchain;
use sdk::types::EvaluationOutcome;
use serde::Serialize;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::{ToolchainConfig, PACKAGE_PLACEHOLDER};

/// CommandToolchain runs the configured toolchain programs as subprocesses.
///
/// # Execution
/// - execve-style execution (no shell), arguments passed separately
/// - working directory set to the environment
/// - stdin null, except the evaluator which receives its JSON request
/// - stdout and stderr piped
/// - every stage bounded by the configured deadline; the child is killed
///   when the deadline expires
#[derive(Debug, Clone)]
pub struct CommandToolchain {
    init_command: Vec<String>,
    install_command: Vec<String>,
    evaluator_command: Vec<String>,
    timeout: Option<Duration>,
}

/// JSON document written to the evaluator's stdin
#[derive(Serialize)]
struct EvaluatorRequest<'a> {
    imports: &'a [String],
    expressions: &'a [String],
}

impl CommandToolchain {
    pub fn new(
        init_command: Vec<String>,
        install_command: Vec<String>,
        evaluator_command: Vec<String>,
    ) -> Self {
        Self {
            init_command,
            install_command,
            evaluator_command,
            timeout: None,
        }
    }

    pub fn from_config(config: &ToolchainConfig) -> Self {
        Self::new(
            config.init_command.clone(),
            config.install_command.clone(),
            config.evaluator_command.clone(),
        )
        .with_timeout(config.stage_timeout())
    }

    /// Bound every subprocess stage by `timeout` (`None` waits indefinitely)
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Programs this toolchain needs on PATH
    pub fn programs(&self) -> Vec<&str> {
        [
            &self.init_command,
            &self.install_command,
            &self.evaluator_command,
        ]
        .iter()
        .filter_map(|argv| argv.first().map(String::as_str))
        .collect()
    }

    /// Checks if a package name can be passed to the installer as one argument.
    ///
    /// Rejects empty names, names the installer would parse as a flag, and
    /// names with whitespace, control or shell metacharacters.
    pub fn is_valid_package_name(package: &str) -> bool {
        !package.is_empty()
            && !package.starts_with('-')
            && !package.chars().any(|c| {
                c.is_whitespace()
                    || c.is_control()
                    || matches!(c, '|' | '&' | ';' | '\'' | '"' | '`' | '<' | '>' | '$')
            })
    }

    fn install_argv(&self, package: &str) -> Vec<String> {
        self.install_command
            .iter()
            .map(|arg| arg.replace(PACKAGE_PLACEHOLDER, package))
            .collect()
    }

    /// Run one stage and collect its output
    async fn run(
        &self,
        stage: &str,
        argv: &[String],
        dir: &Path,
        input: Option<Vec<u8>>,
    ) -> Result<Output, EngineError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| EngineError::Config(format!("{} command is empty", stage)))?;

        debug!(stage, program = %program, "Spawning toolchain command");

        let mut child = Command::new(program)
            .args(args)
            .current_dir(dir)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Spawn {
                command: program.clone(),
                reason: e.to_string(),
            })?;

        let stdin = child.stdin.take();
        let feed = async move {
            if let (Some(mut stdin), Some(bytes)) = (stdin, input) {
                // A child that exits without reading its input is judged by
                // its exit status, not by the broken pipe.
                if let Err(e) = stdin.write_all(&bytes).await {
                    debug!("Could not write evaluator input: {}", e);
                }
            }
        };
        let collect = async move {
            let (_, output) = tokio::join!(feed, child.wait_with_output());
            output
        };

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, collect).await.map_err(|_| {
                warn!(stage, "Toolchain command timed out after {} seconds", limit.as_secs());
                EngineError::StageTimeout {
                    stage: stage.to_string(),
                    secs: limit.as_secs(),
                }
            })?,
            None => collect.await,
        }
        .map_err(|e| EngineError::Spawn {
            command: program.clone(),
            reason: e.to_string(),
        })?;

        debug!(stage, status = %output.status, "Toolchain command finished");
        Ok(output)
    }
}

#[async_trait]
impl Toolchain for CommandToolchain {
    fn name(&self) -> &str {
        self.evaluator_command
            .first()
            .map(String::as_str)
            .unwrap_or("command")
    }

    async fn initialize(&self, dir: &Path) -> Result<(), EngineError> {
        let output = self.run("initialization", &self.init_command, dir, None).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::TemplateProvisioning(format!(
                "{} exited with {}: {}",
                self.init_command.join(" "),
                output.status,
                stderr.trim()
            )));
        }

        info!("Toolchain project initialized");
        Ok(())
    }

    async fn install(&self, dir: &Path, package: &str) -> Result<bool, EngineError> {
        if !Self::is_valid_package_name(package) {
            warn!(package, "Rejected invalid package name");
            return Ok(false);
        }

        let argv = self.install_argv(package);
        let output = self.run("installation", &argv, dir, None).await?;

        if !output.status.success() {
            debug!(
                package,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Package installer reported failure"
            );
        }
        Ok(output.status.success())
    }

    async fn evaluate(
        &self,
        dir: &Path,
        imports: &[String],
        expressions: &[String],
    ) -> Result<EvaluationOutcome, EngineError> {
        let request = serde_json::to_vec(&EvaluatorRequest {
            imports,
            expressions,
        })
        .map_err(|e| EngineError::MalformedEvaluatorOutput(format!("encode request: {}", e)))?;

        let output = self
            .run("evaluation", &self.evaluator_command, dir, Some(request))
            .await?;

        if !output.status.success() {
            return Ok(EvaluationOutcome::Failed {
                diagnostic: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let values: Vec<String> = serde_json::from_slice(&output.stdout).map_err(|e| {
            EngineError::MalformedEvaluatorOutput(format!("expected a JSON array of strings: {}", e))
        })?;

        Ok(EvaluationOutcome::Values(values))
    }
}
