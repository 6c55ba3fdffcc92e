//! Structured manifest and config-document editing.
//!
//! Manifests are parsed into their format's value tree, patched and
//! re-serialised. Key order of an existing file is preserved
//! (`serde_json/preserve_order`, `toml/preserve_order`); new keys are
//! appended.
//!
//! | Manifest | Dependency table |
//! |----------|------------------|
//! | `package.json` | `"dependencies"` |
//! | `pyproject.toml` | `[tool.poetry.dependencies]` |

use std::path::Path;

use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::debug;

use weave_core::{
    application::{CompositionError, ports::ManifestEditor},
    domain::{ConfigDocument, ConfigFormat, ConfigValue, Dependency, ManifestFile, ManifestFormat},
};

const PYTHON_CONSTRAINT: &str = ">=3.11,<3.14";
const INITIAL_VERSION: &str = "0.1.0";

/// [`ManifestEditor`] backed by serde_json, toml and serde_yaml.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredManifestEditor;

impl StructuredManifestEditor {
    pub fn new() -> Self {
        Self
    }

    fn merge_package_json(
        &self,
        manifest: &ManifestFile,
        existing: Option<&str>,
        dependencies: &[Dependency],
    ) -> Result<String, CompositionError> {
        let path = manifest.path.as_path();
        let mut root = match existing {
            Some(text) => {
                match serde_json::from_str::<JsonValue>(text).map_err(|e| merge(path, e))? {
                    JsonValue::Object(map) => map,
                    _ => return Err(merge(path, "top level is not an object")),
                }
            }
            None => {
                let mut map = JsonMap::new();
                map.insert("name".into(), manifest.package_name.clone().into());
                map.insert("version".into(), INITIAL_VERSION.into());
                map.insert("private".into(), true.into());
                map
            }
        };

        let deps = root
            .entry("dependencies")
            .or_insert_with(|| JsonValue::Object(JsonMap::new()));
        let JsonValue::Object(deps) = deps else {
            return Err(merge(path, "\"dependencies\" is not an object"));
        };
        for dep in dependencies {
            deps.insert(dep.name.clone(), dep.constraint.clone().into());
        }

        let mut text =
            serde_json::to_string_pretty(&JsonValue::Object(root)).map_err(|e| merge(path, e))?;
        text.push('\n');
        Ok(text)
    }

    fn merge_pyproject(
        &self,
        manifest: &ManifestFile,
        existing: Option<&str>,
        dependencies: &[Dependency],
    ) -> Result<String, CompositionError> {
        let path = manifest.path.as_path();
        let mut root: toml::Table = match existing {
            Some(text) => toml::from_str(text).map_err(|e| merge(path, e))?,
            None => fresh_pyproject(&manifest.package_name),
        };

        let deps = table_at(&mut root, &["tool", "poetry", "dependencies"])
            .ok_or_else(|| merge(path, "[tool.poetry.dependencies] is not a table"))?;
        if !deps.contains_key("python") {
            deps.insert("python".into(), PYTHON_CONSTRAINT.into());
        }
        for dep in dependencies {
            deps.insert(dep.name.clone(), dep.constraint.clone().into());
        }

        toml::to_string(&root).map_err(|e| merge(path, e))
    }
}

impl ManifestEditor for StructuredManifestEditor {
    fn merge_dependencies(
        &self,
        manifest: &ManifestFile,
        existing: Option<&str>,
        dependencies: &[Dependency],
    ) -> Result<String, CompositionError> {
        debug!(
            manifest = %manifest.path,
            dependencies = dependencies.len(),
            existing = existing.is_some(),
            "Merging manifest dependencies"
        );
        match manifest.format {
            ManifestFormat::PackageJson => self.merge_package_json(manifest, existing, dependencies),
            ManifestFormat::Pyproject => self.merge_pyproject(manifest, existing, dependencies),
        }
    }

    fn render_document(
        &self,
        document: &ConfigDocument,
        existing: Option<&str>,
    ) -> Result<String, CompositionError> {
        let path = document.path.as_path();
        match document.format {
            ConfigFormat::Yaml => {
                let mut root = match existing {
                    Some(text) if !text.trim().is_empty() => {
                        match serde_yaml::from_str::<serde_yaml::Value>(text).map_err(|e| merge(path, e))? {
                            serde_yaml::Value::Mapping(map) => map,
                            serde_yaml::Value::Null => serde_yaml::Mapping::new(),
                            _ => return Err(merge(path, "top level is not a mapping")),
                        }
                    }
                    _ => serde_yaml::Mapping::new(),
                };
                for (name, entries) in &document.sections {
                    let mut section = serde_yaml::Mapping::new();
                    for (key, value) in entries {
                        section.insert(key.clone().into(), yaml_value(value));
                    }
                    root.insert(name.clone().into(), serde_yaml::Value::Mapping(section));
                }
                serde_yaml::to_string(&root).map_err(|e| merge(path, e))
            }
            ConfigFormat::Json => {
                let mut root = match existing {
                    Some(text) => match serde_json::from_str::<JsonValue>(text)
                        .map_err(|e| merge(path, e))?
                    {
                        JsonValue::Object(map) => map,
                        _ => return Err(merge(path, "top level is not an object")),
                    },
                    None => JsonMap::new(),
                };
                for (name, entries) in &document.sections {
                    let section: JsonMap<String, JsonValue> = entries
                        .iter()
                        .map(|(key, value)| (key.clone(), json_value(value)))
                        .collect();
                    root.insert(name.clone(), JsonValue::Object(section));
                }
                let mut text = serde_json::to_string_pretty(&JsonValue::Object(root))
                    .map_err(|e| merge(path, e))?;
                text.push('\n');
                Ok(text)
            }
        }
    }
}

fn fresh_pyproject(package_name: &str) -> toml::Table {
    let mut poetry = toml::Table::new();
    poetry.insert("name".into(), package_name.into());
    poetry.insert("version".into(), INITIAL_VERSION.into());
    poetry.insert("description".into(), "".into());
    poetry.insert("authors".into(), toml::Value::Array(Vec::new()));
    poetry.insert("readme".into(), "README.md".into());

    let mut tool = toml::Table::new();
    tool.insert("poetry".into(), toml::Value::Table(poetry));

    let mut build = toml::Table::new();
    build.insert(
        "requires".into(),
        toml::Value::Array(vec!["poetry-core".into()]),
    );
    build.insert("build-backend".into(), "poetry.core.masonry.api".into());

    let mut root = toml::Table::new();
    root.insert("tool".into(), toml::Value::Table(tool));
    root.insert("build-system".into(), toml::Value::Table(build));
    root
}

/// Walk (creating as needed) nested tables. `None` when a segment exists but
/// is not a table.
fn table_at<'a>(root: &'a mut toml::Table, keys: &[&str]) -> Option<&'a mut toml::Table> {
    let mut current = root;
    for key in keys {
        let next = current
            .entry(key.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        current = next.as_table_mut()?;
    }
    Some(current)
}

fn yaml_value(value: &ConfigValue) -> serde_yaml::Value {
    match value {
        ConfigValue::Text(text) => serde_yaml::Value::String(text.clone()),
        ConfigValue::List(items) => serde_yaml::Value::Sequence(
            items
                .iter()
                .map(|i| serde_yaml::Value::String(i.clone()))
                .collect(),
        ),
    }
}

fn json_value(value: &ConfigValue) -> JsonValue {
    match value {
        ConfigValue::Text(text) => JsonValue::String(text.clone()),
        ConfigValue::List(items) => {
            JsonValue::Array(items.iter().cloned().map(JsonValue::String).collect())
        }
    }
}

fn merge(path: &Path, reason: impl ToString) -> CompositionError {
    CompositionError::merge(path, reason)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use weave_core::domain::Language;

    fn deps(pairs: &[(&str, &str)]) -> Vec<Dependency> {
        pairs.iter().map(|(n, c)| Dependency::new(*n, *c)).collect()
    }

    #[test]
    fn package_json_keeps_existing_keys_and_order() {
        let manifest = ManifestFile::for_language(Language::TypeScript, "demo");
        let existing = r#"{"name":"demo","scripts":{"dev":"next dev"},"dependencies":{"react":"19.0.0"}}"#;

        let merged = StructuredManifestEditor
            .merge_dependencies(&manifest, Some(existing), &deps(&[("next", "^15.0.3"), ("react", "19.0.1")]))
            .unwrap();
        let value: JsonValue = serde_json::from_str(&merged).unwrap();

        assert_eq!(value["scripts"]["dev"], "next dev");
        assert_eq!(value["dependencies"]["react"], "19.0.1");
        assert_eq!(value["dependencies"]["next"], "^15.0.3");
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["name", "scripts", "dependencies"]);
    }

    #[test]
    fn package_json_is_created_when_absent() {
        let manifest = ManifestFile::for_language(Language::TypeScript, "my-app");
        let text = StructuredManifestEditor
            .merge_dependencies(&manifest, None, &deps(&[("express", "^4.18.2")]))
            .unwrap();
        let value: JsonValue = serde_json::from_str(&text).unwrap();

        assert_eq!(value["name"], "my-app");
        assert_eq!(value["dependencies"]["express"], "^4.18.2");
    }

    #[test]
    fn pyproject_merge_is_idempotent() {
        let manifest = ManifestFile::for_language(Language::Python, "my-app");
        let editor = StructuredManifestEditor::new();
        let d = deps(&[("fastapi", "^0.115.0"), ("llama-index", "^0.12.1")]);

        let once = editor.merge_dependencies(&manifest, None, &d).unwrap();
        let twice = editor.merge_dependencies(&manifest, Some(&once), &d).unwrap();
        assert_eq!(once, twice);

        let table: toml::Table = toml::from_str(&once).unwrap();
        let poetry = &table["tool"]["poetry"];
        assert_eq!(poetry["name"].as_str(), Some("my-app"));
        assert_eq!(poetry["dependencies"]["fastapi"].as_str(), Some("^0.115.0"));
        assert_eq!(poetry["dependencies"]["python"].as_str(), Some(PYTHON_CONSTRAINT));
    }

    #[test]
    fn pyproject_rejects_non_table_dependencies() {
        let manifest = ManifestFile::for_language(Language::Python, "x");
        let err = StructuredManifestEditor
            .merge_dependencies(&manifest, Some("[tool]\npoetry = 3\n"), &deps(&[("a", "1")]))
            .unwrap_err();
        assert!(matches!(err, CompositionError::ManifestMerge { .. }));
    }

    #[test]
    fn yaml_document_sections() {
        let mut doc = ConfigDocument::new("loaders", ConfigFormat::Yaml);
        doc.section(
            "file",
            BTreeMap::from([("locators".to_string(), ConfigValue::List(vec!["data".into()]))]),
        );

        let text = StructuredManifestEditor
            .render_document(&doc, Some("web:\n  locators:\n  - https://example.com\n"))
            .unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();

        assert_eq!(value["file"]["locators"][0].as_str(), Some("data"));
        assert_eq!(value["web"]["locators"][0].as_str(), Some("https://example.com"));
    }

    #[test]
    fn json_document_sections() {
        let mut doc = ConfigDocument::new("tools", ConfigFormat::Json);
        doc.section(
            "weather",
            BTreeMap::from([("api".to_string(), ConfigValue::Text("open-meteo".into()))]),
        );

        let text = StructuredManifestEditor.render_document(&doc, None).unwrap();
        let value: JsonValue = serde_json::from_str(&text).unwrap();
        assert_eq!(value["weather"]["api"], "open-meteo");
    }
}
