//! Evaluation engine adapter

use sdk::errors::EngineError;
use sdk::toolchain::Toolchain;
use sdk::types::EvaluationOutcome;
use tracing::debug;

use crate::environment::SnippetEnvironment;

/// Evaluate decoded expressions inside `env`.
///
/// A successful evaluation must yield exactly one value per expression;
/// anything else means the evaluator broke its contract and is reported as
/// `MalformedEvaluatorOutput`. Failure diagnostics pass through untouched.
pub async fn evaluate(
    env: &SnippetEnvironment,
    toolchain: &dyn Toolchain,
    imports: &[String],
    expressions: &[String],
) -> Result<EvaluationOutcome, EngineError> {
    debug!(
        environment = env.name(),
        imports = imports.len(),
        expressions = expressions.len(),
        "Evaluating snippet"
    );

    let outcome = env.evaluate(toolchain, imports, expressions).await?;

    if let EvaluationOutcome::Values(values) = &outcome {
        if values.len() != expressions.len() {
            return Err(EngineError::MalformedEvaluatorOutput(format!(
                "expected {} values, got {}",
                expressions.len(),
                values.len()
            )));
        }
    }

    Ok(outcome)
}
