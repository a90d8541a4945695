//! Toolchain trait
//!
//! A `Toolchain` is the external language tooling a snippet is evaluated with:
//! a project initializer, a package installer and an evaluator. The engine
//! only talks to the toolchain through this trait, so the pipeline does not
//! change when the underlying language or evaluator does.

use async_trait::async_trait;
use std::path::Path;

use crate::errors::EngineError;
use crate::types::EvaluationOutcome;

/// External language toolchain operating inside an environment directory
///
/// Every method runs with `dir` as the working directory. Implementations
/// return `Err` only for infrastructure faults (spawn failures, deadlines);
/// snippet-caused failures are reported through the `Ok` value.
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Returns the name of the toolchain, used in logs
    fn name(&self) -> &str;

    /// Initialize a fresh project in `dir`, answering yes to every prompt
    async fn initialize(&self, dir: &Path) -> Result<(), EngineError>;

    /// Install one package into the project in `dir`
    ///
    /// Returns `Ok(false)` when the installer reports failure for the package.
    async fn install(&self, dir: &Path, package: &str) -> Result<bool, EngineError>;

    /// Evaluate the expressions after the imports
    ///
    /// On success the outcome holds one value per expression.
    async fn evaluate(
        &self,
        dir: &Path,
        imports: &[String],
        expressions: &[String],
    ) -> Result<EvaluationOutcome, EngineError>;
}
