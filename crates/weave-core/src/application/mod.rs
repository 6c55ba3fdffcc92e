//! Application layer for weave.
//!
//! This layer contains:
//! - **Services**: Resolver, Composer, SplitOrchestrator, GenerationService
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Context**: the explicitly constructed tables and adapters a run uses
//! - **Errors**: Composition error types
//!
//! Business rules (validation, substitution, merge semantics) live in
//! `crate::domain`.

pub mod context;
pub mod error;
pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;

pub use context::EngineContext;
pub use error::CompositionError;
pub use ports::{Filesystem, FragmentLibrary, ManifestEditor};
pub use services::{
    Composer, GenerationPlan, GenerationService, GenerationSummary, MaterializedTree, PlanScope,
    Resolver, SplitOrchestrator, SplitState,
};
