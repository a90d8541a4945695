//! Fail-fast dependency installation

use sdk::errors::EngineError;
use sdk::toolchain::Toolchain;
use sdk::types::InstallOutcome;
use tracing::{debug, info};

use crate::environment::SnippetEnvironment;

/// Install `packages` into `env` in order, stopping at the first failure.
///
/// Packages after a failing one are never attempted. An empty list succeeds
/// without running anything. Subprocess faults (spawn errors, deadlines)
/// propagate as errors rather than as an install failure.
pub async fn install_dependencies(
    env: &SnippetEnvironment,
    toolchain: &dyn Toolchain,
    packages: &[String],
) -> Result<InstallOutcome, EngineError> {
    for (position, package) in packages.iter().enumerate() {
        debug!(environment = env.name(), package = %package, position, "Installing package");

        if !env.install_dependency(toolchain, package).await? {
            info!(environment = env.name(), package = %package, "Package installation failed");
            return Ok(InstallOutcome::Failed {
                package: package.clone(),
            });
        }
    }

    Ok(InstallOutcome::Installed)
}
