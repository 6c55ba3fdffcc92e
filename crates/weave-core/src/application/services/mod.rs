//! Application services - orchestrate use cases.
//!
//! Services coordinate the domain layer and ports: resolve a configuration
//! into plans, materialise plans into trees, and drive fullstack splits.

pub mod composer;
pub mod fullstack;
pub mod generation;
pub mod resolver;

pub use composer::{Composer, MaterializedTree};
pub use fullstack::{FullstackOutcome, SplitOrchestrator, SplitPlans, SplitRun, SplitState};
pub use generation::{GenerationPlan, GenerationService, GenerationSummary};
pub use resolver::{PlanScope, Resolver};
