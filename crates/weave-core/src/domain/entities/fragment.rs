//! Fragment domain model.
//!
//! A fragment is the unit of reusable template content: a small file tree
//! plus the manifest contributions (dependencies, environment variables,
//! settings) it brings along when selected.
//!
//! ```text
//! Fragment
//! ├── FragmentKey (category, variant, language?)
//! ├── destination: RelativePath        where the tree lands in the project
//! ├── nodes: Vec<FragmentNode>
//! │    ├── File(FileSpec { path, content: Text | Binary })
//! │    └── Directory(DirectorySpec { path })
//! ├── dependencies: Vec<Dependency>    merged into the project manifest
//! ├── env: Vec<EnvDeclaration>         merged into `.env`
//! └── settings: BTreeMap               merged into config documents (tools)
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::domain::{
    entities::{common::RelativePath, substitution::placeholders},
    error::{Axis, ConfigurationError, FragmentError},
    value_objects::Language,
};

/// Top-level grouping of fragments in the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Always-included base for a template type.
    Base,
    /// Framework overlay refining the base.
    Framework,
    /// Stand-alone Next.js client used as the fullstack frontend.
    Frontend,
    Ui,
    Provider,
    Agents,
    VectorStore,
    DataSource,
    Tool,
    Observability,
    DevContainer,
    /// Files written once at the root of a fullstack project.
    Aggregate,
}

impl Category {
    pub const ALL: &'static [Category] = &[
        Self::Base,
        Self::Framework,
        Self::Frontend,
        Self::Ui,
        Self::Provider,
        Self::Agents,
        Self::VectorStore,
        Self::DataSource,
        Self::Tool,
        Self::Observability,
        Self::DevContainer,
        Self::Aggregate,
    ];

    /// Directory name of the category in the on-disk library.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Framework => "framework",
            Self::Frontend => "frontend",
            Self::Ui => "ui",
            Self::Provider => "provider",
            Self::Agents => "agents",
            Self::VectorStore => "vector-store",
            Self::DataSource => "data-source",
            Self::Tool => "tool",
            Self::Observability => "observability",
            Self::DevContainer => "devcontainer",
            Self::Aggregate => "aggregate",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ConfigurationError::unknown(Axis::Category, s))
    }
}

/// Address of a fragment in the library.
///
/// `language = None` is the language-neutral flavour (`common/` on disk).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentKey {
    pub category: Category,
    pub variant: String,
    pub language: Option<Language>,
}

impl FragmentKey {
    pub fn new(category: Category, variant: impl Into<String>) -> Self {
        Self {
            category,
            variant: variant.into(),
            language: None,
        }
    }

    pub fn for_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// The same key without a language qualifier.
    pub fn neutral(&self) -> Self {
        Self {
            language: None,
            ..self.clone()
        }
    }
}

impl fmt::Display for FragmentKey {
    /// Display as `category/variant/flavour`, mirroring the on-disk layout.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flavour = self.language.map_or("common", |l| l.as_str());
        write!(f, "{}/{}/{}", self.category, self.variant, flavour)
    }
}

/// A package requirement contributed to the project manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub name: String,
    pub constraint: String,
}

impl Dependency {
    pub fn new(name: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: constraint.into(),
        }
    }
}

/// An environment variable the generated project reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvDeclaration {
    pub name: String,
    /// Default value; may contain placeholders. `None` renders as `NAME=`.
    pub value: Option<String>,
    pub description: Option<String>,
}

impl EnvDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            description: None,
        }
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// File content in a fragment.
///
/// Only `Text` is ever scanned for placeholders; `Binary` is copied byte for
/// byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentContent {
    Text(String),
    Binary(Vec<u8>),
}

impl FragmentContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Binary(_) => None,
        }
    }
}

impl From<&str> for FragmentContent {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub path: RelativePath,
    pub content: FragmentContent,
}

impl FileSpec {
    pub fn new(path: impl Into<RelativePath>, content: impl Into<FragmentContent>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySpec {
    pub path: RelativePath,
}

impl DirectorySpec {
    pub fn new(path: impl Into<RelativePath>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentNode {
    File(FileSpec),
    Directory(DirectorySpec),
}

impl FragmentNode {
    pub fn path(&self) -> &RelativePath {
        match self {
            Self::File(f) => &f.path,
            Self::Directory(d) => &d.path,
        }
    }
}

/// A reusable unit of template content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub key: FragmentKey,
    pub description: String,
    /// Where the fragment's tree is placed, relative to the project root.
    pub destination: RelativePath,
    pub nodes: Vec<FragmentNode>,
    pub dependencies: Vec<Dependency>,
    pub env: Vec<EnvDeclaration>,
    /// Flat key/value settings; for tool fragments these become the tool's
    /// section of the tools configuration document.
    pub settings: BTreeMap<String, String>,
}

impl Fragment {
    pub fn builder(key: FragmentKey) -> FragmentBuilder {
        FragmentBuilder {
            fragment: Fragment {
                key,
                description: String::new(),
                destination: RelativePath::root(),
                nodes: Vec::new(),
                dependencies: Vec::new(),
                env: Vec::new(),
                settings: BTreeMap::new(),
            },
        }
    }

    /// Check internal consistency: no duplicate node paths.
    pub fn validate(&self) -> Result<(), FragmentError> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.path()) {
                return Err(FragmentError::DuplicatePath {
                    fragment: self.key.to_string(),
                    path: node.path().to_string(),
                });
            }
        }

        let mut env_names = HashSet::new();
        for decl in &self.env {
            if decl.name.is_empty() || !env_names.insert(decl.name.as_str()) {
                return Err(FragmentError::InvalidFragment(format!(
                    "{}: empty or duplicate env declaration '{}'",
                    self.key, decl.name
                )));
            }
        }

        Ok(())
    }

    pub fn files(&self) -> impl Iterator<Item = &FileSpec> {
        self.nodes.iter().filter_map(|n| match n {
            FragmentNode::File(f) => Some(f),
            FragmentNode::Directory(_) => None,
        })
    }

    /// Every placeholder name used anywhere in the fragment, paired with the
    /// location it appears at (file path, `env:NAME` or `settings:KEY`).
    pub fn placeholder_uses(&self) -> Vec<(String, String)> {
        let mut uses = Vec::new();

        for file in self.files() {
            if let Some(text) = file.content.as_text() {
                for name in placeholders(text) {
                    uses.push((name.to_string(), file.path.to_string()));
                }
            }
        }
        for decl in &self.env {
            if let Some(value) = &decl.value {
                for name in placeholders(value) {
                    uses.push((name.to_string(), format!("env:{}", decl.name)));
                }
            }
        }
        for (key, value) in &self.settings {
            for name in placeholders(value) {
                uses.push((name.to_string(), format!("settings:{key}")));
            }
        }

        uses
    }
}

/// Fluent builder for [`Fragment`], used by the loader and by tests.
#[derive(Debug, Clone)]
pub struct FragmentBuilder {
    fragment: Fragment,
}

impl FragmentBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.fragment.description = description.into();
        self
    }

    pub fn destination(mut self, destination: RelativePath) -> Self {
        self.fragment.destination = destination;
        self
    }

    pub fn node(mut self, node: FragmentNode) -> Self {
        self.fragment.nodes.push(node);
        self
    }

    pub fn file(self, path: &str, content: &str) -> Self {
        self.node(FragmentNode::File(FileSpec::new(path, content)))
    }

    pub fn dependency(mut self, name: &str, constraint: &str) -> Self {
        self.fragment
            .dependencies
            .push(Dependency::new(name, constraint));
        self
    }

    pub fn env(mut self, decl: EnvDeclaration) -> Self {
        self.fragment.env.push(decl);
        self
    }

    pub fn setting(mut self, key: &str, value: &str) -> Self {
        self.fragment
            .settings
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> Result<Fragment, FragmentError> {
        self.fragment.validate()?;
        Ok(self.fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_display_mirrors_disk_layout() {
        let key = FragmentKey::new(Category::VectorStore, "chroma").for_language(Language::Python);
        assert_eq!(key.to_string(), "vector-store/chroma/python");
        assert_eq!(key.neutral().to_string(), "vector-store/chroma/common");
    }

    #[test]
    fn category_round_trips_through_dir_name() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), *category);
        }
        assert!("widgets".parse::<Category>().is_err());
    }

    #[test]
    fn builder_rejects_duplicate_paths() {
        let result = Fragment::builder(FragmentKey::new(Category::Base, "streaming"))
            .file("main.py", "a")
            .file("./main.py", "b")
            .build();

        assert!(matches!(result, Err(FragmentError::DuplicatePath { .. })));
    }

    #[test]
    fn placeholder_uses_cover_files_env_and_settings() {
        let fragment = Fragment::builder(FragmentKey::new(Category::Tool, "weather"))
            .file("tool.py", "name = '{{APP_NAME}}'\nstyle={{ color: 1 }}")
            .node(FragmentNode::File(FileSpec {
                path: RelativePath::new("logo.png"),
                content: FragmentContent::Binary(b"{{NOT_SCANNED}}".to_vec()),
            }))
            .env(EnvDeclaration::new("APP_PORT").value("{{PORT}}"))
            .setting("endpoint", "{{API_BASE_PATH}}")
            .build()
            .unwrap();

        let names: Vec<_> = fragment
            .placeholder_uses()
            .into_iter()
            .map(|(name, _)| name)
            .collect();

        assert_eq!(names, vec!["APP_NAME", "PORT", "API_BASE_PATH"]);
    }
}
