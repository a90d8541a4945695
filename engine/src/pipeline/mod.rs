//! Snippet execution pipeline
//!
//! One pass per request: clone the template, install packages, evaluate,
//! classify, clean up. Stages run strictly in order and each one
//! short-circuits to a classified response on failure. Exactly one primary
//! response is produced per request; a failed cleanup adds an optional
//! follow-up notice that is always emitted after the primary response.

pub mod classifier;
pub mod evaluation;
pub mod installer;

use sdk::toolchain::Toolchain;
use sdk::types::{InstallOutcome, ResponseMessage, SnippetRequest};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, Instrument};

use crate::environment::{EnvironmentFactory, SnippetEnvironment, TemplateProvisioner};
pub use classifier::{classify, StageOutcome};

/// What a pipeline run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    /// The one response for the request
    pub response: ResponseMessage,
    /// Set when the snippet environment could not be deleted
    pub cleanup_error: Option<ResponseMessage>,
}

/// Runs snippet requests against a shared template
pub struct SnippetPipeline {
    provisioner: Arc<TemplateProvisioner>,
    factory: EnvironmentFactory,
    toolchain: Arc<dyn Toolchain>,
}

impl std::fmt::Debug for SnippetPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnippetPipeline")
            .field("provisioner", &self.provisioner)
            .field("factory", &self.factory)
            .field("toolchain", &self.toolchain.name())
            .finish()
    }
}

impl SnippetPipeline {
    pub fn new(
        provisioner: Arc<TemplateProvisioner>,
        factory: EnvironmentFactory,
        toolchain: Arc<dyn Toolchain>,
    ) -> Self {
        Self {
            provisioner,
            factory,
            toolchain,
        }
    }

    /// Build a pipeline whose template and snippet directories live under `root`
    pub fn with_root(root: impl Into<PathBuf>, toolchain: Arc<dyn Toolchain>) -> Self {
        let root = root.into();
        let provisioner = Arc::new(TemplateProvisioner::new(root.clone(), toolchain.clone()));
        Self::new(provisioner, EnvironmentFactory::new(root), toolchain)
    }

    pub fn provisioner(&self) -> &Arc<TemplateProvisioner> {
        &self.provisioner
    }

    /// Provision the template ahead of the first request
    ///
    /// Returns whether the template is usable. A failure is logged and kept;
    /// requests will then be answered with an infrastructure error.
    pub async fn provision(&self) -> bool {
        match self.provisioner.template().await {
            Ok(template) => {
                info!(environment = template.name(), "Template provisioned");
                true
            }
            Err(e) => {
                error!("Template unavailable, requests will fail: {}", e);
                false
            }
        }
    }

    /// Run one request to completion
    pub async fn run(&self, request: SnippetRequest) -> PipelineOutcome {
        let span = info_span!(
            "pipeline",
            conversation = %request.conversation_id,
            environment = tracing::field::Empty
        );
        self.run_inner(request).instrument(span).await
    }

    async fn run_inner(&self, request: SnippetRequest) -> PipelineOutcome {
        let conversation_id = request.conversation_id.clone();

        if !request.has_expressions() {
            info!("Request has no expressions");
            return PipelineOutcome {
                response: classify(&conversation_id, StageOutcome::NoExpressions),
                cleanup_error: None,
            };
        }

        let env = match self.acquire().await {
            Ok(env) => env,
            Err(outcome) => {
                return PipelineOutcome {
                    response: classify(&conversation_id, outcome),
                    cleanup_error: None,
                };
            }
        };
        tracing::Span::current().record("environment", env.name());

        let outcome = self.run_stages(&env, &request).await;
        if let StageOutcome::Infrastructure(e) = &outcome {
            error!("Pipeline infrastructure fault: {}", e);
        }
        let response = classify(&conversation_id, outcome);
        info!(response = response.kind.name(), "Pipeline finished");

        let cleanup_error = env
            .destroy()
            .await
            .err()
            .map(|e| classify(&conversation_id, e.into()));

        PipelineOutcome {
            response,
            cleanup_error,
        }
    }

    async fn acquire(&self) -> Result<SnippetEnvironment, StageOutcome> {
        let template = self.provisioner.template().await?;
        let env = self.factory.create_snippet(template).await?;
        debug!(environment = env.name(), "Snippet environment acquired");
        Ok(env)
    }

    async fn run_stages(&self, env: &SnippetEnvironment, request: &SnippetRequest) -> StageOutcome {
        let toolchain = self.toolchain.as_ref();

        match installer::install_dependencies(env, toolchain, &request.packages).await {
            Ok(InstallOutcome::Installed) => {}
            Ok(InstallOutcome::Failed { package }) => return StageOutcome::InstallFailed(package),
            Err(e) => return e.into(),
        }

        let expressions = request.decoded_expressions();
        match evaluation::evaluate(env, toolchain, &request.imports, &expressions).await {
            Ok(outcome) => StageOutcome::Evaluated(outcome),
            Err(e) => e.into(),
        }
    }
}
