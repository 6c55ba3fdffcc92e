//! Application layer errors.
//!
//! These errors represent failures while resolving or materialising a
//! composition plan. Configuration errors are `ConfigurationError` from
//! `crate::domain` and are always raised before any of these.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ErrorCategory;

/// Errors that occur during composition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompositionError {
    /// A validated configuration selected a fragment the library lacks.
    #[error("Fragment not found in library: {key}")]
    FragmentNotFound { key: String },

    /// A fragment uses a placeholder the plan does not bind.
    #[error("Unbound placeholder {{{{{placeholder}}}}} in fragment '{fragment}' at {path}")]
    UnboundPlaceholder {
        placeholder: String,
        fragment: String,
        path: String,
    },

    /// The underlying storage rejected a write.
    #[error("Failed to write {path}: {reason}")]
    WriteFailure { path: PathBuf, reason: String },

    /// An existing manifest or config document could not be merged.
    #[error("Failed to merge {path}: {reason}")]
    ManifestMerge { path: PathBuf, reason: String },

    /// A shared in-memory store was poisoned by a panicking writer.
    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl CompositionError {
    pub fn write_failure(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::WriteFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn merge(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ManifestMerge {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::FragmentNotFound { key } => vec![
                format!("The fragment library has no entry for {key}"),
                "Check WEAVE_FRAGMENTS_DIR points at a complete library".into(),
            ],
            Self::UnboundPlaceholder { placeholder, .. } => vec![
                format!("No value is bound for {{{{{placeholder}}}}}"),
                "This indicates a fragment library bug, please report it".into(),
            ],
            Self::WriteFailure { path, .. } => vec![
                format!("Failed to write: {}", path.display()),
                "Check that you have write permissions and free disk space".into(),
                "Delete the partially generated directory before retrying".into(),
            ],
            Self::ManifestMerge { path, .. } => vec![format!(
                "Fix or remove the malformed file: {}",
                path.display()
            )],
            Self::LockPoisoned => vec!["Try again".into()],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::FragmentNotFound { .. } => ErrorCategory::NotFound,
            Self::UnboundPlaceholder { .. }
            | Self::WriteFailure { .. }
            | Self::ManifestMerge { .. }
            | Self::LockPoisoned => ErrorCategory::Internal,
        }
    }
}
