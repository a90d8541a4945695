//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::toolchain::Toolchain;
use sdk::types::EvaluationOutcome;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// A toolchain call as observed by `FakeToolchain`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Initialize(PathBuf),
    Install { dir: PathBuf, package: String },
    Evaluate {
        dir: PathBuf,
        imports: Vec<String>,
        expressions: Vec<String>,
        /// Package markers present in `dir` when the evaluator ran
        packages: Vec<String>,
    },
}

type EvalFn = dyn Fn(&[String]) -> Result<EvaluationOutcome, EngineError> + Send + Sync;

/// In-process toolchain that records every call
///
/// Initialization writes `elm-package.json`; each installed package leaves a
/// marker file under `elm-stuff/packages/`. The default evaluator understands
/// integer literals and `a + b` / `a / b`, reporting `division by zero` on
/// stderr the way a real evaluator would.
pub struct FakeToolchain {
    fail_init: bool,
    delete_workdir: bool,
    file_workdir: bool,
    failing_packages: HashSet<String>,
    delay: Option<Duration>,
    eval: Box<EvalFn>,
    calls: Mutex<Vec<Call>>,
}

impl Default for FakeToolchain {
    fn default() -> Self {
        Self {
            fail_init: false,
            delete_workdir: false,
            file_workdir: false,
            failing_packages: HashSet::new(),
            delay: None,
            eval: Box::new(arithmetic),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Remove the working directory during evaluation
    pub fn deleting_workdir(mut self) -> Self {
        self.delete_workdir = true;
        self
    }

    /// Replace the working directory with a regular file during evaluation,
    /// so deleting it as a directory fails
    pub fn replacing_workdir_with_file(mut self) -> Self {
        self.file_workdir = true;
        self
    }

    pub fn failing_package(mut self, package: &str) -> Self {
        self.failing_packages.insert(package.to_string());
        self
    }

    /// Sleep this long inside every install and evaluation
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_eval<F>(mut self, eval: F) -> Self
    where
        F: Fn(&[String]) -> Result<EvaluationOutcome, EngineError> + Send + Sync + 'static,
    {
        self.eval = Box::new(eval);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn installs(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Install { package, .. } => Some(package),
                _ => None,
            })
            .collect()
    }

    pub fn init_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Initialize(_)))
            .count()
    }

    pub fn eval_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Evaluate { .. }))
            .count()
    }

    /// Package markers seen by each evaluation, keyed by its directory
    pub fn evaluated_packages(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Evaluate { dir, packages, .. } => Some((dir, packages)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Toolchain for FakeToolchain {
    fn name(&self) -> &str {
        "fake"
    }

    async fn initialize(&self, dir: &Path) -> Result<(), EngineError> {
        self.record(Call::Initialize(dir.to_path_buf()));
        if self.fail_init {
            return Err(EngineError::TemplateProvisioning(
                "elm-make exited with 1".to_string(),
            ));
        }
        tokio::fs::write(dir.join("elm-package.json"), b"{}").await?;
        Ok(())
    }

    async fn install(&self, dir: &Path, package: &str) -> Result<bool, EngineError> {
        self.record(Call::Install {
            dir: dir.to_path_buf(),
            package: package.to_string(),
        });
        self.pause().await;

        if self.failing_packages.contains(package) {
            return Ok(false);
        }

        let packages = dir.join("elm-stuff").join("packages");
        tokio::fs::create_dir_all(&packages).await?;
        tokio::fs::write(packages.join(package.replace('/', "__")), b"").await?;
        Ok(true)
    }

    async fn evaluate(
        &self,
        dir: &Path,
        imports: &[String],
        expressions: &[String],
    ) -> Result<EvaluationOutcome, EngineError> {
        self.record(Call::Evaluate {
            dir: dir.to_path_buf(),
            imports: imports.to_vec(),
            expressions: expressions.to_vec(),
            packages: package_markers(dir),
        });
        self.pause().await;
        if self.delete_workdir || self.file_workdir {
            tokio::fs::remove_dir_all(dir).await?;
        }
        if self.file_workdir {
            tokio::fs::write(dir, b"not a directory").await?;
        }
        (self.eval)(expressions)
    }
}

/// Evaluate integer literals and binary `+` / `/`
pub fn arithmetic(expressions: &[String]) -> Result<EvaluationOutcome, EngineError> {
    let mut values = Vec::with_capacity(expressions.len());

    for expression in expressions {
        let tokens: Vec<&str> = expression.split_whitespace().collect();
        let value = match tokens.as_slice() {
            [n] => n.parse::<i64>().ok(),
            [a, op, b] => match (a.parse::<i64>(), b.parse::<i64>(), *op) {
                (Ok(a), Ok(b), "+") => Some(a + b),
                (Ok(_), Ok(0), "/") => {
                    return Ok(EvaluationOutcome::Failed {
                        diagnostic: "division by zero".to_string(),
                    })
                }
                (Ok(a), Ok(b), "/") => Some(a / b),
                _ => None,
            },
            _ => None,
        };

        match value {
            Some(v) => values.push(v.to_string()),
            None => values.push(format!("{:?}", expression)),
        }
    }

    Ok(EvaluationOutcome::Values(values))
}

/// Marker files under `dir/elm-stuff/packages`, sorted
fn package_markers(dir: &Path) -> Vec<String> {
    let packages = dir.join("elm-stuff").join("packages");
    if !packages.is_dir() {
        return Vec::new();
    }
    dir_names(&packages)
}

/// Directory names directly under `root`
pub fn dir_names(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
