//! Infrastructure adapters for Weave.
//!
//! This crate implements the ports defined in `weave_core::application::ports`.
//! It contains all external dependencies and I/O operations.

pub mod builtin_fragments;
pub mod filesystem;
pub mod fragment_library;
pub mod fragment_loader;
pub mod manifest;

// Re-export commonly used adapters
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use fragment_library::InMemoryLibrary;
pub use fragment_loader::FragmentLoader;
pub use manifest::StructuredManifestEditor;

use std::sync::Arc;

use weave_core::{application::EngineContext, domain::ConstraintTable};

/// Wire an [`EngineContext`] with the production adapters.
pub fn local_context(library: InMemoryLibrary) -> EngineContext {
    EngineContext::new(
        ConstraintTable::builtin(),
        Arc::new(library),
        Arc::new(LocalFilesystem::new()),
        Arc::new(StructuredManifestEditor::new()),
    )
}
