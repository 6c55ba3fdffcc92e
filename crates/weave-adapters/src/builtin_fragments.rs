//! Built-in fragment library discovery.
//!
//! [`all_fragments`] is the single entry point for loading the fragments that
//! ship with Weave. Callers do not need to know where the library lives.
//!
//! # Library resolution order
//!
//! Candidates are tried in this order, stopping at the first directory that
//! holds a `library.toml`:
//!
//! 1. **`$WEAVE_FRAGMENTS_DIR`**: environment variable override.
//! 2. **`./fragments`**: relative to the current working directory.
//! 3. **`<executable-dir>/fragments`**: sibling to the `weave` binary.
//! 4. **`../fragments`**: one level above CWD, for `cargo run` from a
//!    crate directory.
//!
//! ```env
//! WEAVE_FRAGMENTS_DIR=./fragments
//! ```

use std::path::PathBuf;

use tracing::{debug, info, instrument, warn};

use weave_core::domain::{Fragment, FragmentError};

use crate::fragment_loader::{FragmentLoader, LIBRARY_FILE};

pub const FRAGMENTS_DIR_ENV: &str = "WEAVE_FRAGMENTS_DIR";

/// Load the shipped fragment library.
///
/// # Return value
///
/// - `Ok(fragments)`: a library was found and loaded. Individual malformed
///   fragments inside it are skipped with a warning.
/// - `Ok(vec![])`: no library directory was discovered. The caller should
///   tell the user to set `WEAVE_FRAGMENTS_DIR`.
/// - `Err(_)`: a library was found but is unreadable or has an unsupported
///   format.
#[instrument]
pub fn all_fragments() -> Result<Vec<Fragment>, FragmentError> {
    match locate() {
        Some(dir) => {
            let fragments = FragmentLoader::new(&dir).load_all()?;
            info!(
                path  = %dir.display(),
                count = fragments.len(),
                "fragments loaded successfully"
            );
            Ok(fragments)
        }
        None => {
            warn!(
                "no fragment library found; checked ${FRAGMENTS_DIR_ENV}, \
                 ./fragments, <exe>/fragments, and ../fragments"
            );
            Ok(vec![])
        }
    }
}

/// The first candidate directory holding a `library.toml`.
pub fn locate() -> Option<PathBuf> {
    candidate_paths().into_iter().find(|candidate| {
        let found = candidate.join(LIBRARY_FILE).is_file();
        debug!(path = %candidate.display(), found, "checking candidate fragments path");
        found
    })
}

/// Build the ordered list of candidate paths to search.
///
/// A missing env var or unresolvable exe path is silently omitted.
pub fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(4);

    if let Ok(env_dir) = std::env::var(FRAGMENTS_DIR_ENV) {
        if !env_dir.trim().is_empty() {
            paths.push(PathBuf::from(env_dir));
        }
    }

    paths.push(PathBuf::from("fragments"));

    if let Some(exe_sibling) = exe_sibling_fragments() {
        paths.push(exe_sibling);
    }

    paths.push(PathBuf::from("../fragments"));

    paths
}

/// `<directory of current executable>/fragments`, or `None` if the
/// executable path cannot be determined.
fn exe_sibling_fragments() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("fragments")))
}
