//! In-crate doubles for the output ports plus a small fragment library.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::application::{
    CompositionError, EngineContext,
    ports::{Filesystem, FragmentLibrary, ManifestEditor},
};
use crate::domain::{
    AppConfiguration, AppConfigurationBuilder, Category, ConfigDocument, ConfigValue,
    ConstraintTable, Dependency, EnvDeclaration, FileSpec, Fragment,
    FragmentBuilder, FragmentContent, FragmentKey, FragmentNode, Framework, Language, ManifestFile, ModelConfig,
    ModelProvider, RelativePath, TemplateType,
};

pub(crate) struct MapLibrary(BTreeMap<FragmentKey, Arc<Fragment>>);

impl MapLibrary {
    pub(crate) fn into_fragments(self) -> Vec<Fragment> {
        self.0.into_values().map(|f| (*f).clone()).collect()
    }
}

impl FragmentLibrary for MapLibrary {
    fn get(&self, key: &FragmentKey) -> Option<Arc<Fragment>> {
        self.0.get(key).cloned()
    }

    fn keys(&self) -> Vec<FragmentKey> {
        self.0.keys().cloned().collect()
    }
}

pub(crate) fn library_with(fragments: impl IntoIterator<Item = Fragment>) -> MapLibrary {
    MapLibrary(
        fragments
            .into_iter()
            .map(|f| (f.key.clone(), Arc::new(f)))
            .collect(),
    )
}

fn fragment(category: Category, variant: &str, language: Option<Language>) -> FragmentBuilder {
    let key = FragmentKey::new(category, variant);
    Fragment::builder(match language {
        Some(l) => key.for_language(l),
        None => key,
    })
}

pub(crate) fn library() -> MapLibrary {
    let py = Some(Language::Python);
    let ts = Some(Language::TypeScript);

    let fragments = vec![
        fragment(Category::Base, "streaming", py)
            .file("app/main.py", "# generic entrypoint\n")
            .file("README.md", "# {{APP_NAME}} on port {{PORT}}\n")
            .node(FragmentNode::File(FileSpec {
                path: RelativePath::new("static/logo.bin"),
                content: FragmentContent::Binary(b"{{APP_NAME}}\x00".to_vec()),
            }))
            .dependency("llama-index", "^0.11.0"),
        fragment(Category::Framework, "fastapi", py)
            .file("app/main.py", "# fastapi entrypoint on {{PORT}}\n")
            .dependency("fastapi", "^0.115.0")
            .env(EnvDeclaration::new("APP_PORT").value("{{PORT}}")),
        fragment(Category::Provider, "openai", None)
            .env(EnvDeclaration::new("OPENAI_API_KEY").description("The OpenAI API key to use."))
            .env(EnvDeclaration::new("MODEL").value("{{MODEL}}")),
        fragment(Category::DevContainer, "default", None)
            .file(".devcontainer/devcontainer.json", "{\"name\": \"{{APP_NAME}}\"}\n"),
        fragment(Category::VectorStore, "chroma", py)
            .file("app/engine/vectordb.py", "collection = '{{APP_NAME_SNAKE}}'\n")
            .dependency("llama-index", "^0.12.1"),
        fragment(Category::DataSource, "file", None)
            .file("app/engine/loaders/file.py", "# local files\n"),
        fragment(Category::DataSource, "llamaparse", None)
            .dependency("llama-parse", "^0.5.0")
            .env(EnvDeclaration::new("LLAMA_CLOUD_API_KEY")),
        fragment(Category::DataSource, "web", py),
        fragment(Category::Tool, "weather", py).setting("api", "open-meteo"),
        fragment(Category::Tool, "interpreter", py).file("app/tools/interpreter.py", "# e2b\n"),
        fragment(Category::Observability, "traceloop", py)
            .env(EnvDeclaration::new("TRACELOOP_API_KEY")),
        fragment(Category::Base, "streaming", ts).file("app/page.tsx", "// base\n"),
        fragment(Category::Framework, "nextjs", ts)
            .file("app/api/chat/route.ts", "// {{API_BASE_PATH}}\n")
            .dependency("next", "^15.0.3"),
        fragment(Category::Frontend, "nextjs", ts)
            .file(
                "app/page.tsx",
                "<Chat api=\"{{CHAT_API}}\" style={{ height: 1 }} />\n",
            )
            .dependency("next", "^15.0.3")
            .env(EnvDeclaration::new("NEXT_PUBLIC_CHAT_API").value("{{CHAT_API}}")),
        fragment(Category::Ui, "shadcn", ts).file("components/ui/button.tsx", "// shadcn\n"),
        fragment(Category::Ui, "html", ts).file("components/ui/chat.tsx", "// html\n"),
        fragment(Category::Aggregate, "fullstack", None).file(
            "README.md",
            "# {{APP_NAME}}\nbackend: {{BACKEND_PORT}}, frontend: {{FRONTEND_PORT}}\n",
        ),
    ];

    library_with(fragments.into_iter().map(|b| b.build().unwrap()))
}

/// Thread-safe in-memory filesystem keyed by absolute path.
#[derive(Default)]
pub(crate) struct MapFilesystem {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
    dirs: Mutex<BTreeSet<PathBuf>>,
    failing: Mutex<Option<PathBuf>>,
}

impl MapFilesystem {
    pub(crate) fn bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(Path::new(path)).cloned()
    }

    pub(crate) fn text(&self, path: &str) -> Option<String> {
        self.bytes(path).map(|b| String::from_utf8(b).unwrap())
    }

    pub(crate) fn seed(&self, path: &str, text: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), text.as_bytes().to_vec());
    }

    pub(crate) fn has_dir(&self, path: &str) -> bool {
        self.dirs.lock().unwrap().contains(Path::new(path))
    }

    /// Every later write under `prefix` fails with `WriteFailure`.
    pub(crate) fn fail_writes_under(&self, prefix: &str) {
        *self.failing.lock().unwrap() = Some(PathBuf::from(prefix));
    }

    pub(crate) fn snapshot(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        self.files.lock().unwrap().clone()
    }
}

impl Filesystem for MapFilesystem {
    fn create_dir_all(&self, path: &Path) -> Result<(), CompositionError> {
        self.dirs
            .lock()
            .map_err(|_| CompositionError::LockPoisoned)?
            .insert(path.to_path_buf());
        Ok(())
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> Result<(), CompositionError> {
        let failing = self
            .failing
            .lock()
            .map_err(|_| CompositionError::LockPoisoned)?
            .clone();
        if failing.is_some_and(|prefix| path.starts_with(prefix)) {
            return Err(CompositionError::write_failure(path, "disk full"));
        }
        self.files
            .lock()
            .map_err(|_| CompositionError::LockPoisoned)?
            .insert(path.to_path_buf(), content.to_vec());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, CompositionError> {
        self.files
            .lock()
            .map_err(|_| CompositionError::LockPoisoned)?
            .get(path)
            .cloned()
            .ok_or_else(|| CompositionError::write_failure(path, "not found"))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files
            .lock()
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }
}

/// `name=constraint` lines, sorted by name.
pub(crate) struct LineEditor;

impl ManifestEditor for LineEditor {
    fn merge_dependencies(
        &self,
        _manifest: &ManifestFile,
        existing: Option<&str>,
        dependencies: &[Dependency],
    ) -> Result<String, CompositionError> {
        let mut lines: BTreeMap<String, String> = existing
            .unwrap_or_default()
            .lines()
            .filter_map(|l| l.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for dep in dependencies {
            lines.insert(dep.name.clone(), dep.constraint.clone());
        }
        Ok(lines.iter().map(|(k, v)| format!("{k}={v}\n")).collect())
    }

    fn render_document(
        &self,
        document: &ConfigDocument,
        _existing: Option<&str>,
    ) -> Result<String, CompositionError> {
        let mut out = String::new();
        for (section, entries) in &document.sections {
            out.push_str(&format!("[{section}]\n"));
            for (key, value) in entries {
                let value = match value {
                    ConfigValue::Text(t) => t.clone(),
                    ConfigValue::List(items) => items.join(","),
                };
                out.push_str(&format!("{key}={value}\n"));
            }
        }
        Ok(out)
    }
}

pub(crate) fn context_with(library: MapLibrary) -> EngineContext {
    EngineContext::new(
        ConstraintTable::builtin(),
        Arc::new(library),
        Arc::new(MapFilesystem::default()),
        Arc::new(LineEditor),
    )
}

pub(crate) fn context() -> EngineContext {
    context_with(library())
}

pub(crate) fn context_on(fs: Arc<MapFilesystem>) -> EngineContext {
    context().with_filesystem(fs)
}

/// `demo`: streaming + fastapi + openai, nothing optional.
pub(crate) fn config() -> AppConfigurationBuilder {
    AppConfiguration::builder()
        .app_name("demo")
        .template_type(TemplateType::Streaming)
        .framework(Framework::FastApi)
        .model_config(ModelConfig::defaults_for(ModelProvider::OpenAi))
}
