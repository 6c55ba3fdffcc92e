//! In-memory fragment library.

use std::{collections::BTreeMap, path::Path, sync::Arc};

use tracing::debug;

use weave_core::{
    application::ports::FragmentLibrary,
    domain::{Fragment, FragmentError, FragmentKey},
};

use crate::{builtin_fragments, fragment_loader::FragmentLoader};

/// Read-only fragment catalog, filled once and shared behind an `Arc`.
///
/// Clones are cheap and share the same fragments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLibrary {
    inner: Arc<BTreeMap<FragmentKey, Arc<Fragment>>>,
}

impl InMemoryLibrary {
    /// Build a library from already-loaded fragments.
    ///
    /// Every fragment is re-validated; two fragments with the same key are
    /// rejected.
    pub fn new(fragments: impl IntoIterator<Item = Fragment>) -> Result<Self, FragmentError> {
        let mut map = BTreeMap::new();
        for fragment in fragments {
            fragment.validate()?;
            let key = fragment.key.clone();
            if map.insert(key.clone(), Arc::new(fragment)).is_some() {
                return Err(FragmentError::InvalidFragment(format!(
                    "duplicate fragment key: {key}"
                )));
            }
        }
        debug!(count = map.len(), "fragment library ready");
        Ok(Self {
            inner: Arc::new(map),
        })
    }

    /// Load the library shipped with the tool (see [`builtin_fragments`]).
    pub fn with_builtin() -> Result<Self, FragmentError> {
        Self::new(builtin_fragments::all_fragments()?)
    }

    /// Load the library rooted at `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, FragmentError> {
        Self::new(FragmentLoader::new(dir.as_ref()).load_all()?)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Every fragment, sorted by key.
    pub fn fragments(&self) -> impl Iterator<Item = &Arc<Fragment>> {
        self.inner.values()
    }
}

impl FragmentLibrary for InMemoryLibrary {
    fn get(&self, key: &FragmentKey) -> Option<Arc<Fragment>> {
        self.inner.get(key).cloned()
    }

    fn keys(&self) -> Vec<FragmentKey> {
        self.inner.keys().cloned().collect()
    }
}
