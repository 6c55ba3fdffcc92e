//! Generation Service - the driving port used by the CLI.
//!
//! This service coordinates a whole generation:
//! 1. Validate the configuration against the constraint table
//! 2. Resolve one plan (standalone) or three (fullstack)
//! 3. Materialise through the composer or the split orchestrator
//! 4. Summarise the result for the caller

use std::path::Path;

use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    application::{
        EngineContext,
        services::{
            composer::{Composer, MaterializedTree},
            fullstack::{BACKEND_DIR, FRONTEND_DIR, SplitOrchestrator, SplitPlans},
            resolver::{PlanScope, Resolver},
        },
    },
    domain::{
        AppConfiguration, CompositionPlan, ConfigDocument, ConfigFormat, Observability,
        PostInstallAction, ValidatedConfiguration,
    },
    error::WeaveResult,
};

/// Post-generation facts for the installer, runner and output layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationSummary {
    /// Sorted top-level entries of the destination root.
    pub generated_paths: Vec<String>,
    pub requires_external_config: bool,
    /// Tools config file relative to the root, when one was generated.
    pub config_file: Option<String>,
    /// The frontend's derived chat URL (fullstack only).
    pub custom_api_path: Option<String>,
    pub backend_port: u16,
    pub frontend_port: Option<u16>,
    pub post_install_action: PostInstallAction,
    pub observability: Observability,
    pub has_file_data_source: bool,
    /// Environment variables the user has to fill in.
    pub required_env: Vec<String>,
    pub fullstack: bool,
}

/// Resolved plans, without touching the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationPlan {
    Standalone(CompositionPlan),
    Fullstack {
        backend: CompositionPlan,
        frontend: CompositionPlan,
        aggregate: CompositionPlan,
    },
}

impl GenerationPlan {
    pub fn plans(&self) -> Vec<(&'static str, &CompositionPlan)> {
        match self {
            Self::Standalone(plan) => vec![(".", plan)],
            Self::Fullstack {
                backend,
                frontend,
                aggregate,
            } => vec![
                (BACKEND_DIR, backend),
                (FRONTEND_DIR, frontend),
                (".", aggregate),
            ],
        }
    }
}

/// Main generation service.
#[derive(Clone)]
pub struct GenerationService {
    ctx: EngineContext,
}

impl GenerationService {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn validate(&self, config: AppConfiguration) -> WeaveResult<ValidatedConfiguration> {
        Ok(self.ctx.constraints.validate(config)?)
    }

    /// Validate and resolve without writing anything (`--dry-run`).
    #[instrument(skip_all, fields(app = %config.app_name))]
    pub fn plan(&self, config: AppConfiguration) -> WeaveResult<GenerationPlan> {
        let validated = self.validate(config)?;
        let resolver = Resolver::new(&self.ctx);

        if !validated.config().is_fullstack {
            return Ok(GenerationPlan::Standalone(
                resolver.resolve(&validated, PlanScope::Standalone)?,
            ));
        }

        let SplitPlans {
            backend,
            frontend,
            aggregate,
        } = SplitOrchestrator::new(&self.ctx).resolve_split(&validated)?;

        Ok(GenerationPlan::Fullstack {
            backend,
            frontend,
            aggregate,
        })
    }

    /// Generate a project into `root`.
    ///
    /// Precondition: `root` exists and is empty (checked by the caller).
    /// Validation and resolution of every plan happen before any write.
    #[instrument(skip_all, fields(app = %config.app_name, root = %root.display()))]
    pub fn generate(&self, config: AppConfiguration, root: &Path) -> WeaveResult<GenerationSummary> {
        let validated = self.validate(config)?;
        let fullstack = validated.config().is_fullstack;

        info!(
            framework = %validated.config().framework,
            template = %validated.config().template_type,
            fullstack,
            "Generating project"
        );

        let summary = if fullstack {
            let outcome = SplitOrchestrator::new(&self.ctx).compose_fullstack(&validated, root)?;
            let mut paths: Vec<String> = outcome
                .trees
                .iter()
                .filter(|t| t.root == root)
                .flat_map(MaterializedTree::top_level_entries)
                .chain([BACKEND_DIR.to_string(), FRONTEND_DIR.to_string()])
                .collect();
            paths.sort();
            paths.dedup();

            let tools = ConfigDocument::new("tools", ConfigFormat::for_language(validated.language()));
            self.summarize(
                &validated,
                paths,
                Some(format!("{BACKEND_DIR}/{}", tools.path)),
                outcome.frontend.custom_api_path.clone(),
                outcome.backend.resolved_port,
                Some(outcome.frontend.resolved_port),
            )
        } else {
            let plan = Resolver::new(&self.ctx).resolve(&validated, PlanScope::Standalone)?;
            let tree = Composer::new(&self.ctx).materialize(&plan, root)?;
            self.summarize(
                &validated,
                tree.top_level_entries(),
                plan.tools_config().map(ToString::to_string),
                None,
                plan.derived.resolved_port,
                None,
            )
        };

        info!(
            paths = summary.generated_paths.len(),
            requires_external_config = summary.requires_external_config,
            "Generation complete"
        );
        Ok(summary)
    }

    fn summarize(
        &self,
        validated: &ValidatedConfiguration,
        generated_paths: Vec<String>,
        config_file: Option<String>,
        custom_api_path: Option<String>,
        backend_port: u16,
        frontend_port: Option<u16>,
    ) -> GenerationSummary {
        let config = validated.config();
        GenerationSummary {
            generated_paths,
            requires_external_config: validated.requires_external_config(),
            config_file: config_file.filter(|_| validated.requires_external_config()),
            custom_api_path,
            backend_port,
            frontend_port,
            post_install_action: config.post_install_action,
            observability: config.observability,
            has_file_data_source: config.has_file_data_source(),
            required_env: validated
                .required_env()
                .iter()
                .map(ToString::to_string)
                .collect(),
            fullstack: config.is_fullstack,
        }
    }
}
