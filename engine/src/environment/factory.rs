//! Ephemeral environment factory

use sdk::errors::EngineError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{
    allocate_dir, copy_dir_contents, remove_dir, EnvironmentKind, SnippetEnvironment,
    TemplateEnvironment,
};

/// Clones the template into fresh per-request directories
#[derive(Debug, Clone)]
pub struct EnvironmentFactory {
    root: PathBuf,
}

impl EnvironmentFactory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a snippet environment holding a full copy of the template
    ///
    /// If the copy fails part way, the partial directory is removed before the
    /// error is returned.
    pub async fn create_snippet(
        &self,
        template: &TemplateEnvironment,
    ) -> Result<SnippetEnvironment, EngineError> {
        let (name, path) = allocate_dir(&self.root, EnvironmentKind::Snippet)
            .await
            .map_err(|e| EngineError::EnvironmentCopy(format!("create directory: {}", e)))?;

        if let Err(e) = copy_dir_contents(template.path(), &path).await {
            if let Err(cleanup) = remove_dir(&path).await {
                warn!(environment = %name, "Failed to remove partial environment: {}", cleanup);
            }
            return Err(EngineError::EnvironmentCopy(format!(
                "copy {} into {}: {}",
                template.name(),
                name,
                e
            )));
        }

        debug!(environment = %name, template = template.name(), "Snippet environment created");
        Ok(SnippetEnvironment::new(name, path))
    }
}
