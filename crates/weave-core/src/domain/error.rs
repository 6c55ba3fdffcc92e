// ============================================================================
// domain/error.rs - CONFIGURATION AND FRAGMENT ERRORS
// ============================================================================

use std::fmt;

use thiserror::Error;

/// A configuration axis: one independently chosen dimension of an
/// `AppConfiguration`.
///
/// Every configuration error names the axis it was raised for, so the
/// excluded prompt layer can re-ask exactly one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    AppName,
    TemplateType,
    Framework,
    Ui,
    VectorStore,
    DataSource,
    Tool,
    ModelProvider,
    ModelConfig,
    Observability,
    Agents,
    PostInstallAction,
    Fullstack,
    Port,
    Role,
    Language,
    Category,
}

impl Axis {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AppName => "app name",
            Self::TemplateType => "template type",
            Self::Framework => "framework",
            Self::Ui => "ui",
            Self::VectorStore => "vector store",
            Self::DataSource => "data source",
            Self::Tool => "tool",
            Self::ModelProvider => "model provider",
            Self::ModelConfig => "model config",
            Self::Observability => "observability",
            Self::Agents => "agents",
            Self::PostInstallAction => "post-install action",
            Self::Fullstack => "fullstack",
            Self::Port => "port",
            Self::Role => "role",
            Self::Language => "language",
            Self::Category => "fragment category",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while validating an `AppConfiguration`.
///
/// These are always surfaced before any filesystem mutation and are fully
/// recoverable by asking the user again.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The value does not name a registered variant of its axis.
    #[error("unknown {axis} '{value}'")]
    UnknownVariant { axis: Axis, value: String },

    /// The value is valid on its own but not together with another choice.
    #[error("{axis} '{value}' cannot be combined with {conflict}: {reason}")]
    IncompatibleCombination {
        axis: Axis,
        value: String,
        conflict: String,
        reason: String,
    },

    /// A required field is missing or malformed.
    #[error("invalid {axis} '{value}': {reason}")]
    InvalidValue {
        axis: Axis,
        value: String,
        reason: String,
    },
}

impl ConfigurationError {
    pub fn unknown(axis: Axis, value: impl Into<String>) -> Self {
        Self::UnknownVariant {
            axis,
            value: value.into(),
        }
    }

    pub fn incompatible(
        axis: Axis,
        value: impl Into<String>,
        conflict: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::IncompatibleCombination {
            axis,
            value: value.into(),
            conflict: conflict.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid(axis: Axis, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            axis,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// The axis the error was raised for.
    pub fn axis(&self) -> Axis {
        match self {
            Self::UnknownVariant { axis, .. }
            | Self::IncompatibleCombination { axis, .. }
            | Self::InvalidValue { axis, .. } => *axis,
        }
    }

    /// The offending value as the user supplied it.
    pub fn value(&self) -> &str {
        match self {
            Self::UnknownVariant { value, .. }
            | Self::IncompatibleCombination { value, .. }
            | Self::InvalidValue { value, .. } => value,
        }
    }

    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::UnknownVariant { axis, value } => vec![
                format!("'{value}' is not a known {axis}"),
                format!("Try: weave list {}", axis_list_name(*axis)),
            ],
            Self::IncompatibleCombination {
                axis,
                value,
                conflict,
                ..
            } => vec![
                format!("Pick a different {axis} than '{value}', or change {conflict}"),
                "Try: weave list to see the supported combinations".into(),
            ],
            Self::InvalidValue { axis, .. } => vec![format!("Provide a valid {axis}")],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownVariant { .. } | Self::InvalidValue { .. } => ErrorCategory::Validation,
            Self::IncompatibleCombination { .. } => ErrorCategory::Compatibility,
        }
    }
}

fn axis_list_name(axis: Axis) -> &'static str {
    match axis {
        Axis::TemplateType => "templates",
        Axis::Framework => "frameworks",
        Axis::Ui => "uis",
        Axis::VectorStore => "vector-stores",
        Axis::DataSource => "data-sources",
        Axis::Tool => "tools",
        Axis::ModelProvider => "providers",
        Axis::Observability => "observability",
        Axis::Agents => "agents",
        _ => "",
    }
}

/// Errors raised while building or loading fragments.
///
/// A fragment error at load time means the on-disk library is malformed;
/// it never depends on user input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FragmentError {
    #[error("Invalid fragment: {0}")]
    InvalidFragment(String),

    #[error("Duplicate path in fragment '{fragment}': {path}")]
    DuplicatePath { fragment: String, path: String },

    #[error("Absolute paths not allowed: {path}")]
    AbsolutePathNotAllowed { path: String },

    #[error("Path escapes the destination root: {path}")]
    PathEscapesRoot { path: String },

    #[error("Unsupported fragment library format {found} (expected {expected})")]
    UnsupportedLibraryFormat { found: u32, expected: u32 },
}

impl FragmentError {
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::UnsupportedLibraryFormat { .. } => vec![
                "The fragment library was written for a different weave release".into(),
                "Point WEAVE_FRAGMENTS_DIR at the library shipped with this binary".into(),
            ],
            _ => vec![
                "The fragment library is corrupted".into(),
                "Reinstall weave or fix the fragment named above".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Compatibility,
    NotFound,
    Internal,
}
