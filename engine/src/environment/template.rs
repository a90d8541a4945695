//! Template provisioning
//!
//! The template is the one environment every snippet environment is cloned
//! from. It is initialized exactly once; concurrent callers that arrive while
//! initialization is running wait for that same attempt. A failed attempt is
//! remembered, so every later request is answered with an infrastructure error
//! instead of re-running a broken toolchain.

use sdk::errors::EngineError;
use sdk::toolchain::Toolchain;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

use super::{allocate_dir, remove_dir, EnvironmentKind};

/// The initialized, read-only base environment
///
/// Only exposes read access: requests clone it, they never write into it.
#[derive(Debug)]
pub struct TemplateEnvironment {
    name: String,
    path: PathBuf,
}

impl TemplateEnvironment {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Builds the template once and hands out shared references to it
pub struct TemplateProvisioner {
    root: PathBuf,
    toolchain: Arc<dyn Toolchain>,
    template: OnceCell<Result<TemplateEnvironment, String>>,
}

impl std::fmt::Debug for TemplateProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateProvisioner")
            .field("root", &self.root)
            .field("toolchain", &self.toolchain.name())
            .field("template", &self.template.get())
            .finish()
    }
}

impl TemplateProvisioner {
    pub fn new(root: impl Into<PathBuf>, toolchain: Arc<dyn Toolchain>) -> Self {
        Self {
            root: root.into(),
            toolchain,
            template: OnceCell::new(),
        }
    }

    /// Get the template, provisioning it on first use
    ///
    /// # Errors
    ///
    /// Returns `TemplateUnavailable` if provisioning failed, now or earlier.
    pub async fn template(&self) -> Result<&TemplateEnvironment, EngineError> {
        self.template
            .get_or_init(|| self.provision())
            .await
            .as_ref()
            .map_err(|reason| EngineError::TemplateUnavailable(reason.clone()))
    }

    /// Whether provisioning has run and succeeded
    pub fn is_ready(&self) -> bool {
        matches!(self.template.get(), Some(Ok(_)))
    }

    /// Remove the template directory if it was created
    pub async fn teardown(&self) -> Result<(), EngineError> {
        match self.template.get() {
            Some(Ok(template)) => remove_dir(&template.path).await,
            _ => Ok(()),
        }
    }

    async fn provision(&self) -> Result<TemplateEnvironment, String> {
        info!(toolchain = self.toolchain.name(), "Provisioning template environment");

        let (name, path) = allocate_dir(&self.root, EnvironmentKind::Template)
            .await
            .map_err(|e| {
                error!("Failed to create template directory: {}", e);
                format!("create template directory: {}", e)
            })?;

        // A failed initialization leaves the directory behind for the sweep.
        if let Err(e) = self.toolchain.initialize(&path).await {
            error!(environment = %name, "Template initialization failed: {}", e);
            return Err(e.to_string());
        }

        info!(environment = %name, "Template environment ready");
        Ok(TemplateEnvironment { name, path })
    }
}
