//! Command handlers, one module per subcommand.

pub mod completions;
pub mod list;
pub mod new;

use tracing::debug;

use weave_adapters::InMemoryLibrary;

use crate::{
    config::AppConfig,
    error::{CliError, CliResult},
};

/// Load the fragment library: `fragments.dir` from the configuration when
/// set, discovery otherwise.
pub(crate) fn load_library(config: &AppConfig) -> CliResult<InMemoryLibrary> {
    let library = match &config.fragments.dir {
        Some(dir) => {
            debug!(dir = %dir.display(), "loading configured fragment library");
            if !dir.is_dir() {
                return Err(CliError::LibraryNotFound);
            }
            InMemoryLibrary::from_dir(dir)
        }
        None => InMemoryLibrary::with_builtin(),
    }
    .map_err(|e| CliError::Core(e.into()))?;

    if library.is_empty() {
        return Err(CliError::LibraryNotFound);
    }
    Ok(library)
}
