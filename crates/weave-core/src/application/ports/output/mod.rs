//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the engine needs from external systems.
//! The `weave-adapters` crate provides implementations.

use std::path::Path;
use std::sync::Arc;

use crate::application::CompositionError;
use crate::domain::{ConfigDocument, Dependency, Fragment, FragmentKey, ManifestFile};

/// Port for filesystem operations.
///
/// Implemented by:
/// - `weave_adapters::filesystem::LocalFilesystem` (production)
/// - `weave_adapters::filesystem::MemoryFilesystem` (testing)
#[cfg_attr(test, mockall::automock)]
pub trait Filesystem: Send + Sync {
    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> Result<(), CompositionError>;

    /// Write bytes to a file, replacing any previous content.
    fn write_file(&self, path: &Path, content: &[u8]) -> Result<(), CompositionError>;

    /// Read a whole file.
    fn read_file(&self, path: &Path) -> Result<Vec<u8>, CompositionError>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;
}

/// Port for the read-only fragment catalog.
///
/// Implemented by `weave_adapters::fragment_library::InMemoryLibrary`, which
/// is filled once at startup and shared behind an `Arc`.
pub trait FragmentLibrary: Send + Sync {
    /// Exact-key lookup.
    fn get(&self, key: &FragmentKey) -> Option<Arc<Fragment>>;

    /// Every key in the library, sorted.
    fn keys(&self) -> Vec<FragmentKey>;

    /// Lookup with language fallback: the language-specific flavour first,
    /// then the language-neutral one.
    fn lookup(&self, key: &FragmentKey) -> Option<Arc<Fragment>> {
        self.get(key).or_else(|| {
            key.language
                .is_some()
                .then(|| self.get(&key.neutral()))
                .flatten()
        })
    }

    /// Whether any flavour of `category/variant` exists.
    fn has_variant(&self, category: crate::domain::Category, variant: &str) -> bool {
        self.keys()
            .iter()
            .any(|k| k.category == category && k.variant == variant)
    }
}

/// Port for structured manifest and config-document editing.
///
/// Implemented by `weave_adapters::manifest::StructuredManifestEditor`.
pub trait ManifestEditor: Send + Sync {
    /// Merge `dependencies` into the manifest text (or a fresh manifest when
    /// `existing` is `None`) and return the new text.
    ///
    /// Must be idempotent: merging the same dependencies twice yields the
    /// same text as merging once.
    fn merge_dependencies(
        &self,
        manifest: &ManifestFile,
        existing: Option<&str>,
        dependencies: &[Dependency],
    ) -> Result<String, CompositionError>;

    /// Render a config document, merging into `existing` sections if present.
    fn render_document(
        &self,
        document: &ConfigDocument,
        existing: Option<&str>,
    ) -> Result<String, CompositionError>;
}
