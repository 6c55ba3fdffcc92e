//! Composition plan: the resolved, ordered recipe for one sub-project.
//!
//! ```text
//! CompositionPlan
//! ├── role: Backend | Frontend
//! ├── steps: Vec<PlanStep>            applied strictly in order
//! │    └── PlanStep { fragment, destination, substitutions }
//! ├── derived: DerivedBindings        api base path, port, customApiPath
//! └── manifest_patches: ManifestPatches
//!      ├── manifest + dependencies    package.json / pyproject.toml
//!      ├── env_file + env             .env
//!      └── documents                  config/tools.*, config/loaders.*
//! ```
//!
//! A plan is created per generation call and discarded after
//! materialisation.

use std::collections::BTreeMap;
use std::fmt;

use super::{
    common::RelativePath,
    fragment::{Dependency, EnvDeclaration, FragmentKey},
    substitution::Substitutions,
};
use crate::domain::value_objects::{Language, Role};

/// Path of the chat endpoint every generated backend serves.
pub const API_BASE_PATH: &str = "/api/chat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    /// Resolved library key (after the language → neutral fallback).
    pub fragment: FragmentKey,
    pub destination: RelativePath,
    pub substitutions: Substitutions,
}

/// Values computed from the configuration rather than chosen directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedBindings {
    pub api_base_path: String,
    pub resolved_port: u16,
    /// Absolute chat URL a separate frontend must call. Set on frontend
    /// plans only.
    pub custom_api_path: Option<String>,
}

impl DerivedBindings {
    pub fn new(resolved_port: u16) -> Self {
        Self {
            api_base_path: API_BASE_PATH.to_string(),
            resolved_port,
            custom_api_path: None,
        }
    }

    /// `http://localhost:{port}/api/chat`
    pub fn backend_url(&self) -> String {
        format!("http://localhost:{}{}", self.resolved_port, self.api_base_path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// `package.json`, `"dependencies"` object.
    PackageJson,
    /// `pyproject.toml`, `[tool.poetry.dependencies]` table.
    Pyproject,
}

impl ManifestFormat {
    pub const fn for_language(language: Language) -> Self {
        match language {
            Language::Python => Self::Pyproject,
            Language::TypeScript => Self::PackageJson,
        }
    }

    pub const fn file_name(&self) -> &'static str {
        match self {
            Self::PackageJson => "package.json",
            Self::Pyproject => "pyproject.toml",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    pub path: RelativePath,
    pub format: ManifestFormat,
    /// Package name used when the manifest has to be created.
    pub package_name: String,
}

impl ManifestFile {
    pub fn for_language(language: Language, package_name: impl Into<String>) -> Self {
        let format = ManifestFormat::for_language(language);
        Self {
            path: RelativePath::new(format.file_name()),
            format,
            package_name: package_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    pub const fn for_language(language: Language) -> Self {
        match language {
            Language::Python => Self::Yaml,
            Language::TypeScript => Self::Json,
        }
    }

    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }
}

/// A leaf value in a config document section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Text(String),
    List(Vec<String>),
}

/// A generated configuration document: `section → key → value`.
///
/// Sections are written in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDocument {
    pub path: RelativePath,
    pub format: ConfigFormat,
    pub sections: Vec<(String, BTreeMap<String, ConfigValue>)>,
}

impl ConfigDocument {
    pub fn new(stem: &str, format: ConfigFormat) -> Self {
        Self {
            path: RelativePath::new(format!("config/{stem}.{}", format.extension())),
            format,
            sections: Vec::new(),
        }
    }

    pub fn section(&mut self, name: impl Into<String>, entries: BTreeMap<String, ConfigValue>) {
        let name = name.into();
        match self.sections.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => existing.extend(entries),
            None => self.sections.push((name, entries)),
        }
    }
}

/// Manifest, environment and config contributions merged after the file
/// steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestPatches {
    pub manifest: ManifestFile,
    /// Collision-resolved, in first-selected order.
    pub dependencies: Vec<Dependency>,
    pub env_file: RelativePath,
    /// Already substituted; deduplication happens at merge time.
    pub env: Vec<EnvDeclaration>,
    pub documents: Vec<ConfigDocument>,
    /// Folders created after the steps (local file data-source locators).
    pub directories: Vec<RelativePath>,
}

impl ManifestPatches {
    pub fn new(manifest: ManifestFile) -> Self {
        Self {
            manifest,
            dependencies: Vec::new(),
            env_file: RelativePath::new(".env"),
            env: Vec::new(),
            documents: Vec::new(),
            directories: Vec::new(),
        }
    }

    /// Record a dependency; a later request for the same package replaces
    /// the earlier constraint in place. Returns the replaced constraint when
    /// it differed.
    pub fn add_dependency(&mut self, dependency: Dependency) -> Option<String> {
        match self
            .dependencies
            .iter_mut()
            .find(|d| d.name == dependency.name)
        {
            Some(existing) if existing.constraint != dependency.constraint => Some(
                std::mem::replace(&mut existing.constraint, dependency.constraint),
            ),
            Some(_) => None,
            None => {
                self.dependencies.push(dependency);
                None
            }
        }
    }
}

/// The ordered recipe for materialising one sub-project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionPlan {
    /// `None` for the top-level aggregate of a fullstack split.
    pub role: Option<Role>,
    pub steps: Vec<PlanStep>,
    pub derived: DerivedBindings,
    pub manifest_patches: ManifestPatches,
}

impl CompositionPlan {
    pub fn fragment_keys(&self) -> impl Iterator<Item = &FragmentKey> {
        self.steps.iter().map(|s| &s.fragment)
    }

    /// Path of the tools config document, when one is generated.
    pub fn tools_config(&self) -> Option<&RelativePath> {
        self.manifest_patches
            .documents
            .iter()
            .map(|d| &d.path)
            .find(|p| p.as_str().starts_with("config/tools."))
    }
}

impl fmt::Display for CompositionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            Some(role) => writeln!(f, "{role} plan (port {})", self.derived.resolved_port)?,
            None => writeln!(f, "aggregate plan")?,
        }
        for (i, step) in self.steps.iter().enumerate() {
            let dest = if step.destination.is_root() {
                ".".to_string()
            } else {
                step.destination.to_string()
            };
            writeln!(f, "  {:>2}. {} -> {}", i + 1, step.fragment, dest)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_dependency_constraint_wins_in_place() {
        let mut patches = ManifestPatches::new(ManifestFile::for_language(Language::Python, "demo"));
        assert_eq!(patches.add_dependency(Dependency::new("fastapi", "^0.109.1")), None);
        assert_eq!(patches.add_dependency(Dependency::new("uvicorn", "^0.23.2")), None);
        assert_eq!(
            patches.add_dependency(Dependency::new("fastapi", "^0.115.0")),
            Some("^0.109.1".to_string())
        );
        assert_eq!(patches.add_dependency(Dependency::new("fastapi", "^0.115.0")), None);

        assert_eq!(
            patches.dependencies,
            vec![
                Dependency::new("fastapi", "^0.115.0"),
                Dependency::new("uvicorn", "^0.23.2"),
            ]
        );
    }

    #[test]
    fn manifest_and_config_paths_follow_language() {
        assert_eq!(
            ManifestFile::for_language(Language::TypeScript, "demo").path.as_str(),
            "package.json"
        );
        let doc = ConfigDocument::new("tools", ConfigFormat::for_language(Language::Python));
        assert_eq!(doc.path.as_str(), "config/tools.yaml");
    }

    #[test]
    fn derived_backend_url() {
        assert_eq!(
            DerivedBindings::new(8000).backend_url(),
            "http://localhost:8000/api/chat"
        );
    }
}
