//! Split Orchestrator: one configuration, two sub-projects.
//!
//! ```text
//! Init ──backend──▶ BackendComposed ──frontend──▶ FrontendComposed
//!                                                      │
//!                                Done ◀──────────── Aggregated ◀─┘ aggregate
//! ```
//!
//! The only data flowing from the backend to the frontend is the backend's
//! `DerivedBindings` (its resolved port). All three plans are resolved
//! before `Init`, so a missing fragment or unbound placeholder on either
//! side fails with nothing written.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::{
    application::{
        CompositionError, EngineContext,
        services::{
            composer::{Composer, MaterializedTree},
            resolver::{PlanScope, Resolver},
        },
    },
    domain::{CompositionPlan, DerivedBindings, ValidatedConfiguration},
};

pub const BACKEND_DIR: &str = "backend";
pub const FRONTEND_DIR: &str = "frontend";

/// Progress of a fullstack composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitState {
    Init,
    BackendComposed {
        backend: DerivedBindings,
    },
    FrontendComposed {
        backend: DerivedBindings,
        frontend: DerivedBindings,
    },
    Aggregated {
        backend: DerivedBindings,
        frontend: DerivedBindings,
    },
    Done {
        backend: DerivedBindings,
        frontend: DerivedBindings,
    },
}

impl SplitState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::BackendComposed { .. } => "backend-composed",
            Self::FrontendComposed { .. } => "frontend-composed",
            Self::Aggregated { .. } => "aggregated",
            Self::Done { .. } => "done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

/// Result of a completed split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullstackOutcome {
    pub backend: DerivedBindings,
    pub frontend: DerivedBindings,
    pub trees: Vec<MaterializedTree>,
}

/// The three plans of a split, resolved together so every fragment and
/// placeholder is checked before the first write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlans {
    pub backend: CompositionPlan,
    pub frontend: CompositionPlan,
    pub aggregate: CompositionPlan,
}

/// One in-flight split composition.
#[derive(Debug)]
pub struct SplitRun {
    root: PathBuf,
    plans: SplitPlans,
    state: SplitState,
    trees: Vec<MaterializedTree>,
}

impl SplitRun {
    pub fn new(plans: SplitPlans, root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            plans,
            state: SplitState::Init,
            trees: Vec::new(),
        }
    }

    pub fn state(&self) -> &SplitState {
        &self.state
    }

    pub fn trees(&self) -> &[MaterializedTree] {
        &self.trees
    }
}

/// Drives a [`SplitRun`] through its states.
#[derive(Clone)]
pub struct SplitOrchestrator {
    ctx: EngineContext,
    resolver: Resolver,
    composer: Composer,
}

impl SplitOrchestrator {
    pub fn new(ctx: &EngineContext) -> Self {
        Self {
            ctx: ctx.clone(),
            resolver: Resolver::new(ctx),
            composer: Composer::new(ctx),
        }
    }

    /// Resolve backend, frontend and aggregate plans without writing.
    ///
    /// The frontend is resolved against the backend's `DerivedBindings`.
    #[instrument(skip_all, fields(app = %config.config().app_name))]
    pub fn resolve_split(&self, config: &ValidatedConfiguration) -> Result<SplitPlans, CompositionError> {
        let backend = self.resolver.resolve(config, PlanScope::Backend)?;
        let frontend = self.resolver.resolve(
            config,
            PlanScope::Frontend {
                backend: &backend.derived,
            },
        )?;
        let aggregate = self
            .resolver
            .resolve_aggregate(config, &backend.derived, &frontend.derived)?;
        Ok(SplitPlans {
            backend,
            frontend,
            aggregate,
        })
    }

    /// Resolve every plan, then start a run in `Init`.
    pub fn prepare(&self, config: &ValidatedConfiguration, root: &Path) -> Result<SplitRun, CompositionError> {
        Ok(SplitRun::new(self.resolve_split(config)?, root))
    }

    /// Compose backend, frontend and aggregate under `root`.
    ///
    /// Resolution failures surface before anything is written. After that
    /// the steps are strictly sequential; the first failing step aborts the
    /// run and partially written sub-trees stay in place.
    #[instrument(skip_all, fields(app = %config.config().app_name, root = %root.display()))]
    pub fn compose_fullstack(
        &self,
        config: &ValidatedConfiguration,
        root: &Path,
    ) -> Result<FullstackOutcome, CompositionError> {
        let mut run = self.prepare(config, root)?;
        loop {
            if let SplitState::Done { backend, frontend } = &run.state {
                return Ok(FullstackOutcome {
                    backend: backend.clone(),
                    frontend: frontend.clone(),
                    trees: run.trees,
                });
            }
            self.step(&mut run)?;
        }
    }

    /// Perform exactly one transition. On error the state is unchanged.
    pub fn step(&self, run: &mut SplitRun) -> Result<(), CompositionError> {
        let next = match &run.state {
            SplitState::Init => {
                let dir = run.root.join(BACKEND_DIR);
                self.ctx.filesystem.create_dir_all(&dir)?;
                run.trees.push(self.composer.materialize(&run.plans.backend, &dir)?);
                SplitState::BackendComposed {
                    backend: run.plans.backend.derived.clone(),
                }
            }
            SplitState::BackendComposed { backend } => {
                let dir = run.root.join(FRONTEND_DIR);
                self.ctx.filesystem.create_dir_all(&dir)?;
                run.trees.push(self.composer.materialize(&run.plans.frontend, &dir)?);
                SplitState::FrontendComposed {
                    backend: backend.clone(),
                    frontend: run.plans.frontend.derived.clone(),
                }
            }
            SplitState::FrontendComposed { backend, frontend } => {
                run.trees
                    .push(self.composer.materialize(&run.plans.aggregate, &run.root)?);
                SplitState::Aggregated {
                    backend: backend.clone(),
                    frontend: frontend.clone(),
                }
            }
            SplitState::Aggregated { backend, frontend } => SplitState::Done {
                backend: backend.clone(),
                frontend: frontend.clone(),
            },
            SplitState::Done { .. } => return Ok(()),
        };

        info!(from = run.state.name(), to = next.name(), "Split state transition");
        run.state = next;
        Ok(())
    }
}
