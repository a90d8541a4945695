//! Per-request snippet environments

use sdk::errors::EngineError;
use sdk::toolchain::Toolchain;
use sdk::types::EvaluationOutcome;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::remove_dir;

/// A request's private copy of the template
///
/// The environment is released with [`SnippetEnvironment::destroy`]. If it is
/// dropped without being destroyed (the owning task panicked or was
/// cancelled), `Drop` removes the directory on the blocking pool, or inline
/// when no runtime is running.
#[derive(Debug)]
pub struct SnippetEnvironment {
    name: String,
    path: PathBuf,
    released: bool,
}

impl SnippetEnvironment {
    pub(crate) fn new(name: String, path: PathBuf) -> Self {
        Self {
            name,
            path,
            released: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Install one package into this environment
    pub async fn install_dependency(
        &self,
        toolchain: &dyn Toolchain,
        package: &str,
    ) -> Result<bool, EngineError> {
        toolchain.install(&self.path, package).await
    }

    /// Run the evaluator inside this environment
    pub async fn evaluate(
        &self,
        toolchain: &dyn Toolchain,
        imports: &[String],
        expressions: &[String],
    ) -> Result<EvaluationOutcome, EngineError> {
        toolchain.evaluate(&self.path, imports, expressions).await
    }

    /// Delete the environment directory
    ///
    /// A directory that is already gone counts as deleted. The environment is
    /// considered released even when deletion fails; the shutdown sweep is the
    /// backstop for those leftovers.
    pub async fn destroy(mut self) -> Result<(), EngineError> {
        self.released = true;
        let result = remove_dir(&self.path).await;
        match &result {
            Ok(()) => debug!(environment = %self.name, "Snippet environment removed"),
            Err(e) => warn!(environment = %self.name, "Failed to remove snippet environment: {}", e),
        }
        result
    }
}

impl Drop for SnippetEnvironment {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!(environment = %self.name, "Snippet environment dropped without cleanup, removing");

        let name = std::mem::take(&mut self.name);
        let path = std::mem::take(&mut self.path);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || remove_blocking(&name, &path));
            }
            Err(_) => remove_blocking(&name, &path),
        }
    }
}

fn remove_blocking(name: &str, path: &Path) {
    if let Err(e) = std::fs::remove_dir_all(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(environment = %name, "Failed to remove snippet environment: {}", e);
        }
    }
}
