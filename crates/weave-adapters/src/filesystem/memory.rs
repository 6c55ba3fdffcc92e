//! In-memory filesystem adapter for testing and `--dry-run` previews.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use weave_core::application::{CompositionError, ports::Filesystem};

/// In-memory filesystem. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilesystem {
    inner: Arc<RwLock<MemoryFilesystemInner>>,
}

#[derive(Debug, Default)]
struct MemoryFilesystemInner {
    files: BTreeMap<PathBuf, Vec<u8>>,
    directories: BTreeSet<PathBuf>,
}

impl MemoryFilesystem {
    /// Create a new empty memory filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// A file's content as UTF-8 text (testing helper).
    pub fn read_text(&self, path: impl AsRef<Path>) -> Option<String> {
        let inner = self.inner.read().ok()?;
        let bytes = inner.files.get(path.as_ref())?;
        String::from_utf8(bytes.clone()).ok()
    }

    /// Every file, sorted by path.
    pub fn list_files(&self) -> Vec<PathBuf> {
        self.inner
            .read()
            .map(|inner| inner.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every file with its content, sorted by path.
    pub fn snapshot(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        self.inner
            .read()
            .map(|inner| inner.files.clone())
            .unwrap_or_default()
    }

    /// Clear all contents.
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.files.clear();
            inner.directories.clear();
        }
    }
}

impl Filesystem for MemoryFilesystem {
    fn create_dir_all(&self, path: &Path) -> Result<(), CompositionError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| CompositionError::LockPoisoned)?;

        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            inner.directories.insert(current.clone());
        }

        Ok(())
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> Result<(), CompositionError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| CompositionError::LockPoisoned)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !inner.directories.contains(parent) {
                return Err(CompositionError::write_failure(
                    path,
                    "Parent directory does not exist",
                ));
            }
        }

        inner.files.insert(path.to_path_buf(), content.to_vec());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, CompositionError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| CompositionError::LockPoisoned)?;
        inner
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| CompositionError::write_failure(path, "No such file"))
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner
            .read()
            .map(|inner| inner.files.contains_key(path) || inner.directories.contains(path))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_requires_parent_directory() {
        let fs = MemoryFilesystem::new();
        let err = fs.write_file(Path::new("/out/a.txt"), b"x").unwrap_err();
        assert!(matches!(err, CompositionError::WriteFailure { .. }));

        fs.create_dir_all(Path::new("/out")).unwrap();
        fs.write_file(Path::new("/out/a.txt"), b"x").unwrap();
        assert_eq!(fs.read_text("/out/a.txt").as_deref(), Some("x"));
        assert!(fs.exists(Path::new("/")));
    }

    #[test]
    fn clones_share_storage() {
        let fs = MemoryFilesystem::new();
        let other = fs.clone();
        fs.create_dir_all(Path::new("/out")).unwrap();
        fs.write_file(Path::new("/out/a"), b"1").unwrap();

        assert_eq!(other.list_files(), vec![PathBuf::from("/out/a")]);
        other.clear();
        assert!(fs.snapshot().is_empty());
    }
}
