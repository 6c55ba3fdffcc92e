//! Unified error handling for Weave Core.
//!
//! Wraps domain and application errors behind one type that knows how to
//! explain itself to a user.

use thiserror::Error;

use crate::application::CompositionError;
use crate::domain::{ConfigurationError, FragmentError};

/// Root error type for Weave Core operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WeaveError {
    /// The configuration was rejected before anything was written.
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A fragment in the library is malformed.
    #[error("Invalid fragment: {0}")]
    Fragment(#[from] FragmentError),

    /// Resolving or writing the project failed.
    #[error("Composition failed: {0}")]
    Composition(#[from] CompositionError),

    /// Unexpected internal errors (bugs).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl WeaveError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Configuration(e) => e.suggestions(),
            Self::Fragment(e) => e.suggestions(),
            Self::Composition(e) => e.suggestions(),
            Self::Internal { .. } => vec![
                "This appears to be a bug in Weave".into(),
                "Re-run with --verbose and include the log when reporting it".into(),
            ],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(e) => match e.category() {
                crate::domain::ErrorCategory::Validation => ErrorCategory::Validation,
                crate::domain::ErrorCategory::Compatibility => ErrorCategory::Compatibility,
                crate::domain::ErrorCategory::NotFound => ErrorCategory::NotFound,
                crate::domain::ErrorCategory::Internal => ErrorCategory::Internal,
            },
            Self::Fragment(_) => ErrorCategory::Configuration,
            Self::Composition(e) => e.category(),
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// A write may succeed on a second attempt; nothing else will.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Composition(CompositionError::WriteFailure { .. })
        )
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Compatibility,
    NotFound,
    Configuration,
    Internal,
}

/// Convenient result type alias.
pub type WeaveResult<T> = Result<T, WeaveError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Axis;

    #[test]
    fn configuration_errors_keep_their_category() {
        let err: WeaveError = ConfigurationError::incompatible(
            Axis::VectorStore,
            "qdrant",
            "framework 'express'",
            "not supported",
        )
        .into();
        assert_eq!(err.category(), ErrorCategory::Compatibility);
        assert!(!err.is_retryable());
        assert!(!err.suggestions().is_empty());
    }

    #[test]
    fn only_write_failures_are_retryable() {
        let write: WeaveError = CompositionError::write_failure("/out/a", "disk full").into();
        let missing: WeaveError = CompositionError::FragmentNotFound {
            key: "base/streaming/python".into(),
        }
        .into();

        assert!(write.is_retryable());
        assert!(!missing.is_retryable());
        assert_eq!(missing.category(), ErrorCategory::NotFound);
    }
}
