//! User configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value. The
//! CLI layer owns it; the core crate never sees it.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (handled at the call-site, not here)
//! 2. `WEAVE_*` environment variables, `__` between sections
//!    (`WEAVE_DEFAULTS__FRAMEWORK=express`)
//! 3. The `--config` file, or `config.toml` in the platform config dir
//! 4. Built-in defaults
//!
//! ```toml
//! [defaults]
//! framework = "fastapi"
//! provider = "ollama"
//!
//! [fragments]
//! dir = "/opt/weave/fragments"
//! ```

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CliError, CliResult};

pub const ENV_PREFIX: &str = "WEAVE";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Answers used when neither a flag nor the answers file gives one.
    pub defaults: Defaults,
    pub output: OutputConfig,
    pub fragments: FragmentsConfig,
}

/// Axis values are kept as text and parsed when a project is built, so a
/// typo here is reported with the same message as a typo in a flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub template: Option<String>,
    pub framework: Option<String>,
    pub vector_store: Option<String>,
    pub provider: Option<String>,
    pub post_install: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentsConfig {
    /// Fragment library directory. Discovery (`WEAVE_FRAGMENTS_DIR`,
    /// `./fragments`, next to the binary) is used when unset.
    pub dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// A file passed with `--config` must exist; the default location is
    /// optional.
    pub fn load(config_file: Option<&Path>) -> CliResult<Self> {
        let file = match config_file {
            Some(path) => File::from(path).required(true),
            None => File::from(Self::config_path()).required(false),
        };

        let config: AppConfig = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| CliError::ConfigError {
                message: e.to_string(),
                source: Some(Box::new(e)),
            })?;

        debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Path to the default configuration file.
    ///
    /// Uses `directories::ProjectDirs` for cross-platform correctness,
    /// falling back to `.weave.toml` in the current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("com", "weave", "weave")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".weave.toml"))
    }
}
