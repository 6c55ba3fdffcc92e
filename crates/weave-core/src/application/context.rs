//! Explicitly constructed engine context.

use std::sync::Arc;

use crate::application::ports::{Filesystem, FragmentLibrary, ManifestEditor};
use crate::domain::ConstraintTable;

/// The read-only tables and adapters one generation runs against.
///
/// Cheap to clone; every field is shared. Independent contexts never
/// interfere, so tests can run generations in parallel against different
/// libraries or tables.
#[derive(Clone)]
pub struct EngineContext {
    pub constraints: Arc<ConstraintTable>,
    pub library: Arc<dyn FragmentLibrary>,
    pub filesystem: Arc<dyn Filesystem>,
    pub editor: Arc<dyn ManifestEditor>,
}

impl EngineContext {
    pub fn new(
        constraints: ConstraintTable,
        library: Arc<dyn FragmentLibrary>,
        filesystem: Arc<dyn Filesystem>,
        editor: Arc<dyn ManifestEditor>,
    ) -> Self {
        Self {
            constraints: Arc::new(constraints),
            library,
            filesystem,
            editor,
        }
    }

    /// Same tables and library, different filesystem.
    pub fn with_filesystem(&self, filesystem: Arc<dyn Filesystem>) -> Self {
        Self {
            filesystem,
            ..self.clone()
        }
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("frameworks", &self.constraints.frameworks().len())
            .field("fragments", &self.library.keys().len())
            .finish_non_exhaustive()
    }
}
