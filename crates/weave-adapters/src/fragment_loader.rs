//! Filesystem-based fragment loader.
//!
//! Discovers and parses `fragment.toml` manifests from a library directory,
//! converting them into domain [`Fragment`] values for the in-memory library.
//!
//! # Directory layout expected
//!
//! ```text
//! fragments/
//! ├── library.toml                 ← format = 1 (required)
//! ├── base/
//! │   └── streaming/
//! │       ├── python/
//! │       │   ├── fragment.toml    ← manifest (required)
//! │       │   └── app/main.py      ← file content
//! │       └── typescript/
//! │           └── ...
//! └── provider/
//!     └── openai/
//!         └── common/              ← language-neutral flavour
//!             └── fragment.toml
//! ```
//!
//! # `fragment.toml` format
//!
//! ```toml
//! [fragment]
//! description = "FastAPI server overlay"
//! destination = "."                # optional, relative to the project root
//!
//! [dependencies]
//! fastapi = "^0.115.0"
//!
//! [[env]]
//! name        = "APP_PORT"
//! value       = "{{PORT}}"         # optional
//! description = "Port the server listens on"   # optional
//!
//! [settings]                       # tool configuration entries
//! api = "open-meteo"
//!
//! # Directories that must exist even if they contain no tracked files.
//! [[directories]]
//! path = "data"
//! ```

use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::Deserialize;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use weave_core::domain::{
    Category, DirectorySpec, EnvDeclaration, FileSpec, Fragment, FragmentContent, FragmentError,
    FragmentKey, FragmentNode, Language, RelativePath,
};

/// The only `library.toml` format this release reads.
pub const LIBRARY_FORMAT: u32 = 1;

pub const LIBRARY_FILE: &str = "library.toml";
pub const MANIFEST_FILE: &str = "fragment.toml";

/// Directory name of the language-neutral flavour.
const COMMON_FLAVOUR: &str = "common";

/// Extensions that are always copied byte for byte, even when the content
/// happens to decode as UTF-8.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "ico", "webp", "bmp", "pdf", "woff", "woff2", "ttf", "otf",
    "eot", "zip", "gz", "tar", "wasm", "mp3", "mp4", "bin", "db", "sqlite",
];

// ── Manifest types ────────────────────────────────────────────────────────────

/// Deserialised `library.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct LibraryManifest {
    pub format: u32,
    pub description: Option<String>,
}

/// Deserialised `fragment.toml`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FragmentManifest {
    #[serde(default)]
    pub fragment: FragmentSection,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub env: Vec<EnvEntry>,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    #[serde(default)]
    pub directories: Vec<DirectoryEntry>,
}

/// `[fragment]` section.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FragmentSection {
    pub description: Option<String>,
    /// Prefix for every node, relative to the project root.
    pub destination: Option<String>,
}

/// One entry under `[[env]]`.
#[derive(Debug, Deserialize, Clone)]
pub struct EnvEntry {
    pub name: String,
    pub value: Option<String>,
    pub description: Option<String>,
}

/// One entry under `[[directories]]`.
#[derive(Debug, Deserialize, Clone)]
pub struct DirectoryEntry {
    pub path: String,
}

// ── Loader ────────────────────────────────────────────────────────────────────

/// Loads [`Fragment`]s from a library directory.
///
/// Every `<category>/<variant>/<flavour>/` directory holding a
/// `fragment.toml` is one fragment. A fragment whose manifest or files are
/// malformed emits a `WARN` log and is skipped; it does not prevent other
/// fragments from loading. A missing or unsupported `library.toml` fails the
/// whole load.
pub struct FragmentLoader {
    library_dir: PathBuf,
}

impl FragmentLoader {
    pub fn new(library_dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: library_dir.into(),
        }
    }

    pub fn library_dir(&self) -> &Path {
        &self.library_dir
    }

    /// Read and check `library.toml`.
    pub fn read_library_manifest(&self) -> Result<LibraryManifest, FragmentError> {
        let path = self.library_dir.join(LIBRARY_FILE);
        let raw = fs::read_to_string(&path).map_err(|e| {
            FragmentError::InvalidFragment(format!("failed to read '{}': {e}", path.display()))
        })?;
        let manifest: LibraryManifest = toml::from_str(&raw).map_err(|e| {
            FragmentError::InvalidFragment(format!("failed to parse '{}': {e}", path.display()))
        })?;

        if manifest.format != LIBRARY_FORMAT {
            return Err(FragmentError::UnsupportedLibraryFormat {
                found: manifest.format,
                expected: LIBRARY_FORMAT,
            });
        }
        Ok(manifest)
    }

    /// Load every valid fragment, sorted by key.
    #[instrument(skip(self), fields(dir = %self.library_dir.display()))]
    pub fn load_all(&self) -> Result<Vec<Fragment>, FragmentError> {
        if !self.library_dir.is_dir() {
            return Err(FragmentError::InvalidFragment(format!(
                "fragment library not found: {}",
                self.library_dir.display()
            )));
        }
        self.read_library_manifest()?;

        let mut fragments = Vec::new();
        for entry in WalkDir::new(&self.library_dir)
            .min_depth(3)
            .max_depth(3)
            .sort_by_file_name()
        {
            let entry = entry
                .map_err(|e| FragmentError::InvalidFragment(format!("directory walk error: {e}")))?;
            if !entry.file_type().is_dir() {
                continue;
            }

            let dir = entry.path();
            match self.load_fragment_from_dir(dir) {
                Ok(fragment) => {
                    debug!(key = %fragment.key, nodes = fragment.nodes.len(), "loaded fragment");
                    fragments.push(fragment);
                }
                Err(e) => {
                    warn!(
                        dir   = %dir.display(),
                        error = %e,
                        "skipping fragment directory due to load error"
                    );
                }
            }
        }

        fragments.sort_by(|a, b| a.key.cmp(&b.key));
        debug!(count = fragments.len(), "finished loading fragments");
        Ok(fragments)
    }

    /// Load one `<category>/<variant>/<flavour>` directory.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub fn load_fragment_from_dir(&self, dir: &Path) -> Result<Fragment, FragmentError> {
        let key = self.key_for_dir(dir)?;

        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(FragmentError::InvalidFragment(format!(
                "missing {MANIFEST_FILE} in '{}'",
                dir.display()
            )));
        }

        let raw = fs::read_to_string(&manifest_path).map_err(|e| {
            FragmentError::InvalidFragment(format!(
                "failed to read '{}': {e}",
                manifest_path.display()
            ))
        })?;
        let manifest: FragmentManifest = toml::from_str(&raw).map_err(|e| {
            FragmentError::InvalidFragment(format!(
                "failed to parse '{}': {e}",
                manifest_path.display()
            ))
        })?;

        build_fragment(key, dir, manifest)
    }

    /// Derive the key from the last three path components.
    fn key_for_dir(&self, dir: &Path) -> Result<FragmentKey, FragmentError> {
        let relative = dir.strip_prefix(&self.library_dir).map_err(|_| {
            FragmentError::InvalidFragment(format!(
                "'{}' is not inside '{}'",
                dir.display(),
                self.library_dir.display()
            ))
        })?;

        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let [category, variant, flavour] = parts.as_slice() else {
            return Err(FragmentError::InvalidFragment(format!(
                "expected <category>/<variant>/<flavour>, got '{}'",
                normalize_path(&relative.to_string_lossy())
            )));
        };

        let category = Category::from_str(category)
            .map_err(|e| FragmentError::InvalidFragment(e.to_string()))?;
        let key = FragmentKey::new(category, variant.as_str());

        if flavour == COMMON_FLAVOUR {
            return Ok(key);
        }
        let language = Language::from_str(flavour)
            .map_err(|e| FragmentError::InvalidFragment(e.to_string()))?;
        Ok(key.for_language(language))
    }
}

/// Assemble a fragment from its manifest and the files next to it.
///
/// Nodes are added in this order:
/// 1. Explicit `[[directories]]` entries
/// 2. Every directory and file found by walking `dir`, sorted by name
fn build_fragment(
    key: FragmentKey,
    dir: &Path,
    manifest: FragmentManifest,
) -> Result<Fragment, FragmentError> {
    let destination = match manifest.fragment.destination.as_deref() {
        None | Some("") | Some(".") => RelativePath::root(),
        Some(d) => RelativePath::try_new(d)?,
    };

    let mut builder = Fragment::builder(key)
        .description(manifest.fragment.description.unwrap_or_default())
        .destination(destination);
    let mut added_paths: HashSet<String> = HashSet::new();

    for entry in &manifest.directories {
        let path = RelativePath::try_new(&entry.path)?;
        if added_paths.insert(path.as_str()) {
            builder = builder.node(FragmentNode::Directory(DirectorySpec::new(path)));
        }
    }

    for walk_entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let walk_entry = walk_entry
            .map_err(|e| FragmentError::InvalidFragment(format!("directory walk error: {e}")))?;
        let abs_path = walk_entry.path();
        let rel_raw = abs_path.strip_prefix(dir).map_err(|_| {
            FragmentError::InvalidFragment(format!(
                "failed to relativise '{}' against '{}'",
                abs_path.display(),
                dir.display()
            ))
        })?;

        // fragment.toml is a loader artefact, not a project file.
        if rel_raw == Path::new(MANIFEST_FILE) {
            continue;
        }

        let path = RelativePath::try_new(normalize_path(&rel_raw.to_string_lossy()))?;

        if walk_entry.file_type().is_dir() {
            if added_paths.insert(path.as_str()) {
                builder = builder.node(FragmentNode::Directory(DirectorySpec::new(path)));
            }
            continue;
        }

        if !walk_entry.file_type().is_file() {
            continue;
        }

        let bytes = fs::read(abs_path).map_err(|e| {
            FragmentError::InvalidFragment(format!("failed to read file '{path}': {e}"))
        })?;
        if added_paths.insert(path.as_str()) {
            let content = detect_content(abs_path, bytes);
            builder = builder.node(FragmentNode::File(FileSpec { path, content }));
        }
    }

    for (name, constraint) in &manifest.dependencies {
        builder = builder.dependency(name, constraint);
    }

    for entry in manifest.env {
        let mut decl = EnvDeclaration::new(entry.name);
        if let Some(value) = entry.value {
            decl = decl.value(value);
        }
        if let Some(description) = entry.description {
            decl = decl.description(description);
        }
        builder = builder.env(decl);
    }

    for (k, v) in &manifest.settings {
        builder = builder.setting(k, v);
    }

    builder.build()
}

/// Text when the bytes decode as UTF-8 and the extension is not a known
/// binary one.
pub fn detect_content(path: &Path, bytes: Vec<u8>) -> FragmentContent {
    let binary_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| BINARY_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
    if binary_extension {
        return FragmentContent::Binary(bytes);
    }
    match String::from_utf8(bytes) {
        Ok(text) => FragmentContent::Text(text),
        Err(e) => FragmentContent::Binary(e.into_bytes()),
    }
}

/// Normalise a filesystem path to forward slashes so Windows and Unix paths
/// compare identically throughout the loader.
fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
