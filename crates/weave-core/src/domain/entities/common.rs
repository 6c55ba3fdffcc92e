use super::FragmentError;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A filesystem path guaranteed to stay inside the directory it is joined to.
///
/// Invariant: never absolute, never contains `..`, never empty after
/// normalisation of `.` segments. Enforced at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelativePath(PathBuf);

impl RelativePath {
    /// Create a new relative path.
    ///
    /// # Panics
    /// Panics if the path is absolute or escapes its root (use `try_new` for
    /// input that is not a compile-time constant).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::try_new(&path) {
            Ok(p) => p,
            Err(e) => panic!("invalid RelativePath {path:?}: {e}"),
        }
    }

    /// Fallible constructor.
    ///
    /// Accepts both `/` and `\` separators so fragment manifests authored on
    /// Windows load identically.
    pub fn try_new(path: impl AsRef<Path>) -> Result<Self, FragmentError> {
        let raw = path.as_ref().to_string_lossy().replace('\\', "/");
        let candidate = Path::new(&raw);

        if candidate.is_absolute() || raw.starts_with('/') {
            return Err(FragmentError::AbsolutePathNotAllowed { path: raw });
        }

        let mut normalised = PathBuf::new();
        for component in candidate.components() {
            match component {
                Component::Normal(part) => normalised.push(part),
                Component::CurDir => {}
                Component::ParentDir => return Err(FragmentError::PathEscapesRoot { path: raw }),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(FragmentError::AbsolutePathNotAllowed { path: raw });
                }
            }
        }

        Ok(Self(normalised))
    }

    /// The empty path, i.e. the destination root itself.
    pub fn root() -> Self {
        Self(PathBuf::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.as_os_str().is_empty()
    }

    /// Join a segment, maintaining the relative invariant.
    pub fn join(&self, segment: impl AsRef<Path>) -> Result<Self, FragmentError> {
        let segment = Self::try_new(segment)?;
        Ok(Self(self.0.join(segment.0)))
    }

    /// The first path component, used to report top-level generated entries.
    pub fn top_level(&self) -> Option<&str> {
        self.0.components().next().and_then(|c| c.as_os_str().to_str())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Forward-slash rendering, stable across platforms.
    pub fn as_str(&self) -> String {
        self.0
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for RelativePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl From<&str> for RelativePath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}
