//! Configuration Resolver: validated configuration → composition plan.
//!
//! Selection order for a backend (or standalone) project:
//!
//! ```text
//! base(template) → framework → agents → provider → vector store
//!   → data-source kinds → tools → observability → ui (nextjs) → devcontainer
//! ```
//!
//! Later steps win file-for-file, so framework overlays refine the base.
//! A fullstack frontend is `frontend/nextjs → ui`.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::{
    application::{CompositionError, EngineContext, ports::FragmentLibrary},
    domain::{
        API_BASE_PATH, Category, CompositionPlan, ConfigDocument, ConfigFormat, ConfigValue,
        ConstraintTable, DataSourceKind, DerivedBindings, EnvDeclaration, Fragment, FragmentKey,
        Framework, Language, ManifestFile, ManifestPatches, Observability, PlanStep, RelativePath, Role,
        Substitutions, ValidatedConfiguration, VectorStore,
    },
};

/// Default locator for a file data source with none given.
const DEFAULT_DATA_DIR: &str = "data";

/// Data-source fragment layered over `file` when LlamaParse is on.
const LLAMA_PARSE: &str = "llamaparse";

/// Which sub-project a plan is for.
#[derive(Debug, Clone, Copy)]
pub enum PlanScope<'a> {
    /// A single self-contained project.
    Standalone,
    /// The backend half of a fullstack split.
    Backend,
    /// The frontend half, bound to the backend's resolved port.
    Frontend { backend: &'a DerivedBindings },
}

impl PlanScope<'_> {
    fn role(&self) -> Role {
        match self {
            Self::Standalone | Self::Backend => Role::Backend,
            Self::Frontend { .. } => Role::Frontend,
        }
    }
}

/// Expands validated configurations into composition plans.
///
/// Holds no mutable state; one resolver can serve any number of plans.
#[derive(Clone)]
pub struct Resolver {
    library: Arc<dyn FragmentLibrary>,
    constraints: Arc<ConstraintTable>,
}

impl Resolver {
    pub fn new(ctx: &EngineContext) -> Self {
        Self {
            library: Arc::clone(&ctx.library),
            constraints: Arc::clone(&ctx.constraints),
        }
    }

    /// Resolve one sub-project.
    #[instrument(skip_all, fields(app = %config.config().app_name, role = %scope.role()))]
    pub fn resolve(
        &self,
        config: &ValidatedConfiguration,
        scope: PlanScope<'_>,
    ) -> Result<CompositionPlan, CompositionError> {
        let app = config.config();
        let frontend_default = self.frontend_port();

        let (language, framework, derived, backend_port, frontend_port, chat_api) = match scope {
            PlanScope::Standalone | PlanScope::Backend => {
                let port = config.backend_port();
                let frontend_port = if app.framework == Framework::NextJs {
                    port
                } else {
                    frontend_default
                };
                (
                    config.language(),
                    app.framework,
                    DerivedBindings::new(port),
                    port,
                    frontend_port,
                    API_BASE_PATH.to_string(),
                )
            }
            PlanScope::Frontend { backend } => {
                let mut derived = DerivedBindings::new(frontend_default);
                let custom_api_path = backend.backend_url();
                derived.custom_api_path = Some(custom_api_path.clone());
                (
                    Language::TypeScript,
                    Framework::NextJs,
                    derived,
                    backend.resolved_port,
                    frontend_default,
                    custom_api_path,
                )
            }
        };

        let subs = bindings(
            config,
            framework,
            language,
            &derived,
            chat_api,
            backend_port,
            frontend_port,
        );

        let keys = select(config, scope, language);
        let mut plan = self.build(Some(scope.role()), &keys, subs, derived, language)?;

        if !matches!(scope, PlanScope::Frontend { .. }) {
            self.backend_patches(config, &mut plan);
        }

        debug!(steps = plan.steps.len(), "Plan resolved");
        Ok(plan)
    }

    /// Resolve the files written once at the root of a fullstack project.
    #[instrument(skip_all, fields(app = %config.config().app_name))]
    pub fn resolve_aggregate(
        &self,
        config: &ValidatedConfiguration,
        backend: &DerivedBindings,
        frontend: &DerivedBindings,
    ) -> Result<CompositionPlan, CompositionError> {
        let app = config.config();
        let chat_api = frontend
            .custom_api_path
            .clone()
            .unwrap_or_else(|| backend.backend_url());

        let mut derived = backend.clone();
        derived.custom_api_path = Some(chat_api.clone());

        let subs = bindings(
            config,
            app.framework,
            config.language(),
            &derived,
            chat_api,
            backend.resolved_port,
            frontend.resolved_port,
        );

        let keys = [FragmentKey::new(Category::Aggregate, "fullstack")];
        self.build(None, &keys, subs, derived, config.language())
    }

    fn build(
        &self,
        role: Option<Role>,
        keys: &[FragmentKey],
        subs: Substitutions,
        derived: DerivedBindings,
        language: Language,
    ) -> Result<CompositionPlan, CompositionError> {
        let package_name = subs.get("APP_NAME_KEBAB").unwrap_or_default().to_string();
        let mut patches = ManifestPatches::new(ManifestFile::for_language(language, package_name));
        let mut tool_sections = Vec::new();
        let mut steps = Vec::with_capacity(keys.len());

        for key in keys {
            let fragment = self
                .library
                .lookup(key)
                .ok_or_else(|| CompositionError::FragmentNotFound {
                    key: key.to_string(),
                })?;

            check_placeholders(&fragment, &subs)?;

            debug!(
                step = steps.len() + 1,
                fragment = %fragment.key,
                destination = %fragment.destination,
                "Plan step"
            );

            for dependency in &fragment.dependencies {
                if let Some(replaced) = patches.add_dependency(dependency.clone()) {
                    debug!(
                        dependency = %dependency.name,
                        replaced = %replaced,
                        constraint = %dependency.constraint,
                        by = %fragment.key,
                        "Dependency constraint overridden by later fragment"
                    );
                }
            }

            for decl in &fragment.env {
                patches.env.push(render_env(decl, &subs, &fragment)?);
            }

            if fragment.key.category == Category::Tool {
                tool_sections.push((
                    fragment.key.variant.clone(),
                    render_settings(&fragment, &subs)?,
                ));
            }

            steps.push(PlanStep {
                fragment: fragment.key.clone(),
                destination: fragment.destination.clone(),
                substitutions: subs.clone(),
            });
        }

        if !tool_sections.is_empty() {
            let mut tools = tools_config(language);
            for (name, entries) in tool_sections {
                tools.section(name, entries);
            }
            patches.documents.push(tools);
        }

        Ok(CompositionPlan {
            role,
            steps,
            derived,
            manifest_patches: patches,
        })
    }

    /// Environment requirements and the data-source loader document.
    fn backend_patches(&self, config: &ValidatedConfiguration, plan: &mut CompositionPlan) {
        let patches = &mut plan.manifest_patches;

        for name in config.required_env() {
            if !patches.env.iter().any(|d| d.name == *name) {
                patches.env.push(EnvDeclaration::new(*name));
            }
        }

        let app = config.config();
        if app.data_sources.is_empty() {
            return;
        }

        let mut loaders = ConfigDocument::new("loaders", ConfigFormat::for_language(config.language()));
        for kind in app.data_source_kinds() {
            let locators: Vec<String> = app
                .data_sources
                .iter()
                .filter(|s| s.kind == kind)
                .map(|s| match (kind, s.locator.trim()) {
                    (DataSourceKind::File, "") => DEFAULT_DATA_DIR.to_string(),
                    (_, locator) => locator.to_string(),
                })
                .collect();
            if kind == DataSourceKind::File {
                for locator in &locators {
                    match RelativePath::try_new(locator) {
                        Ok(dir) if !dir.is_root() && !patches.directories.contains(&dir) => {
                            patches.directories.push(dir)
                        }
                        Ok(_) => {}
                        Err(_) => debug!(locator = %locator, "File locator outside the project; no folder created"),
                    }
                }
            }
            let mut section = BTreeMap::from([("locators".to_string(), ConfigValue::List(locators))]);
            if kind == DataSourceKind::File && app.use_llama_parse {
                section.insert("use_llama_parse".to_string(), ConfigValue::Text("true".into()));
            }
            loaders.section(kind.as_str(), section);
        }
        patches.documents.push(loaders);
    }

    fn frontend_port(&self) -> u16 {
        self.constraints
            .framework(Framework::NextJs)
            .map_or(3000, |d| d.default_port)
    }
}

/// Every standard placeholder name, bound the same way in each scope.
/// `PORT` is the port of the sub-project being written; the aggregate uses
/// the backend's.
fn bindings(
    config: &ValidatedConfiguration,
    framework: Framework,
    language: Language,
    derived: &DerivedBindings,
    chat_api: String,
    backend_port: u16,
    frontend_port: u16,
) -> Substitutions {
    let app = config.config();
    Substitutions::for_app(&app.app_name)
        .with("TEMPLATE_TYPE", app.template_type.as_str())
        .with("FRAMEWORK", framework.as_str())
        .with("UI", app.ui.unwrap_or_default().as_str())
        .with("VECTOR_STORE", app.vector_store.as_str())
        .with("OBSERVABILITY", app.observability.as_str())
        .with("MODEL_PROVIDER", app.model_config.provider.as_str())
        .with("MODEL", app.model_config.model.as_str())
        .with("EMBEDDING_MODEL", app.model_config.embedding_model.as_str())
        .with("EMBEDDING_DIM", app.model_config.dimensions.to_string())
        .with(
            "MODEL_API_KEY",
            app.model_config.api_key.clone().unwrap_or_default(),
        )
        .with("PORT", derived.resolved_port.to_string())
        .with("API_BASE_PATH", derived.api_base_path.as_str())
        .with("CHAT_API", chat_api)
        .with("TOOLS_CONFIG_PATH", tools_config(language).path.to_string())
        .with("BACKEND_PORT", backend_port.to_string())
        .with("FRONTEND_PORT", frontend_port.to_string())
}

/// Fragment keys for a scope, in plan order.
fn select(config: &ValidatedConfiguration, scope: PlanScope<'_>, language: Language) -> Vec<FragmentKey> {
    let app = config.config();
    let key = |category, variant: &str| FragmentKey::new(category, variant).for_language(language);

    if let PlanScope::Frontend { .. } = scope {
        return vec![
            key(Category::Frontend, Framework::NextJs.as_str()),
            key(Category::Ui, app.ui.unwrap_or_default().as_str()),
        ];
    }

    let mut keys = vec![
        key(Category::Base, app.template_type.as_str()),
        key(Category::Framework, app.framework.as_str()),
    ];
    if let Some(agents) = app.agents {
        keys.push(key(Category::Agents, agents.as_str()));
    }
    keys.push(key(Category::Provider, app.model_config.provider.as_str()));
    if app.vector_store != VectorStore::None {
        keys.push(key(Category::VectorStore, app.vector_store.as_str()));
    }
    for kind in app.data_source_kinds() {
        keys.push(key(Category::DataSource, kind.as_str()));
    }
    if app.use_llama_parse {
        keys.push(key(Category::DataSource, LLAMA_PARSE));
    }
    for tool in &app.tools {
        keys.push(key(Category::Tool, tool.as_str()));
    }
    if app.observability != Observability::None {
        keys.push(key(Category::Observability, app.observability.as_str()));
    }
    if app.framework == Framework::NextJs {
        keys.push(key(Category::Ui, app.ui.unwrap_or_default().as_str()));
    }
    if let PlanScope::Standalone = scope {
        keys.push(key(Category::DevContainer, "default"));
    }
    keys
}

fn tools_config(language: Language) -> ConfigDocument {
    ConfigDocument::new("tools", ConfigFormat::for_language(language))
}

fn check_placeholders(fragment: &Fragment, subs: &Substitutions) -> Result<(), CompositionError> {
    match fragment
        .placeholder_uses()
        .into_iter()
        .find(|(name, _)| !subs.contains(name))
    {
        Some((placeholder, path)) => Err(CompositionError::UnboundPlaceholder {
            placeholder,
            fragment: fragment.key.to_string(),
            path,
        }),
        None => Ok(()),
    }
}

fn render_value(
    value: &str,
    subs: &Substitutions,
    fragment: &Fragment,
    location: String,
) -> Result<String, CompositionError> {
    subs.render(value)
        .map_err(|unbound| CompositionError::UnboundPlaceholder {
            placeholder: unbound.0,
            fragment: fragment.key.to_string(),
            path: location,
        })
}

fn render_env(
    decl: &EnvDeclaration,
    subs: &Substitutions,
    fragment: &Fragment,
) -> Result<EnvDeclaration, CompositionError> {
    let mut rendered = decl.clone();
    if let Some(value) = &decl.value {
        rendered.value = Some(render_value(value, subs, fragment, format!("env:{}", decl.name))?);
    }
    Ok(rendered)
}

fn render_settings(
    fragment: &Fragment,
    subs: &Substitutions,
) -> Result<BTreeMap<String, ConfigValue>, CompositionError> {
    fragment
        .settings
        .iter()
        .map(|(key, value)| {
            let rendered = render_value(value, subs, fragment, format!("settings:{key}"))?;
            Ok((key.clone(), ConfigValue::Text(rendered)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{config, context, library_with};
    use crate::domain::{AgentTopology, DataSource, TemplateType, Tool, Ui};

    fn resolver() -> Resolver {
        Resolver::new(&context())
    }

    fn validate(builder: crate::domain::AppConfigurationBuilder) -> ValidatedConfiguration {
        ConstraintTable::builtin()
            .validate(builder.build().unwrap())
            .unwrap()
    }

    fn keys(plan: &CompositionPlan) -> Vec<String> {
        plan.fragment_keys().map(ToString::to_string).collect()
    }

    #[test]
    fn minimal_standalone_plan_order() {
        let plan = resolver()
            .resolve(&validate(config()), PlanScope::Standalone)
            .unwrap();

        assert_eq!(
            keys(&plan),
            vec![
                "base/streaming/python",
                "framework/fastapi/python",
                "provider/openai/common",
                "devcontainer/default/common",
            ]
        );
        assert_eq!(plan.role, Some(Role::Backend));
        assert_eq!(plan.derived.resolved_port, 8000);
        assert!(plan.derived.custom_api_path.is_none());
        assert!(plan.manifest_patches.documents.is_empty());
    }

    #[test]
    fn optional_axes_are_appended_in_order() {
        let plan = resolver()
            .resolve(
                &validate(
                    config()
                        .vector_store(VectorStore::Chroma)
                        .tool(Tool::Weather)
                        .observability(Observability::Traceloop)
                        .data_source(DataSource::new(DataSourceKind::File, "")),
                ),
                PlanScope::Backend,
            )
            .unwrap();

        assert_eq!(
            keys(&plan),
            vec![
                "base/streaming/python",
                "framework/fastapi/python",
                "provider/openai/common",
                "vector-store/chroma/python",
                "data-source/file/common",
                "tool/weather/python",
                "observability/traceloop/python",
            ]
        );

        let docs: Vec<_> = plan
            .manifest_patches
            .documents
            .iter()
            .map(|d| d.path.to_string())
            .collect();
        assert_eq!(docs, vec!["config/tools.yaml", "config/loaders.yaml"]);
        assert_eq!(plan.tools_config().unwrap().as_str(), "config/tools.yaml");

        let loaders = &plan.manifest_patches.documents[1];
        assert_eq!(
            loaders.sections[0].1["locators"],
            ConfigValue::List(vec!["data".into()])
        );
        assert_eq!(plan.manifest_patches.directories, vec![RelativePath::new("data")]);
    }

    #[test]
    fn llama_parse_follows_the_file_source() {
        let plan = resolver()
            .resolve(
                &validate(
                    config()
                        .data_source(DataSource::new(DataSourceKind::File, ""))
                        .llama_parse(true),
                ),
                PlanScope::Standalone,
            )
            .unwrap();

        let keys = keys(&plan);
        let file = keys.iter().position(|k| k == "data-source/file/common").unwrap();
        assert_eq!(keys[file + 1], "data-source/llamaparse/common");
        assert!(plan.manifest_patches.dependencies.iter().any(|d| d.name == "llama-parse"));

        let loaders = plan.manifest_patches.documents.last().unwrap();
        assert_eq!(
            loaders.sections[0].1["use_llama_parse"],
            ConfigValue::Text("true".into())
        );
    }

    #[test]
    fn file_locators_name_the_created_folders() {
        let plan = resolver()
            .resolve(
                &validate(
                    config()
                        .data_source(DataSource::new(DataSourceKind::File, "docs"))
                        .data_source(DataSource::new(DataSourceKind::File, "./docs"))
                        .data_source(DataSource::new(DataSourceKind::File, "/srv/shared"))
                        .data_source(DataSource::new(DataSourceKind::Web, "https://example.com")),
                ),
                PlanScope::Standalone,
            )
            .unwrap();

        assert_eq!(plan.manifest_patches.directories, vec![RelativePath::new("docs")]);
    }

    #[test]
    fn later_fragment_wins_dependency_conflict() {
        let plan = resolver()
            .resolve(&validate(config().vector_store(VectorStore::Chroma)), PlanScope::Backend)
            .unwrap();

        let llama = plan
            .manifest_patches
            .dependencies
            .iter()
            .find(|d| d.name == "llama-index")
            .unwrap();
        assert_eq!(llama.constraint, "^0.12.1");
    }

    #[test]
    fn required_env_is_declared() {
        let plan = resolver()
            .resolve(&validate(config().tool(Tool::Interpreter)), PlanScope::Backend)
            .unwrap();

        let names: Vec<_> = plan
            .manifest_patches
            .env
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert!(names.contains(&"OPENAI_API_KEY"));
        assert!(names.contains(&"E2B_API_KEY"));
        assert!(names.contains(&"APP_PORT"));
    }

    #[test]
    fn frontend_binds_custom_api_path_from_backend_port() {
        let validated = validate(config().fullstack(true).external_port(8123));
        let resolver = resolver();
        let backend = resolver.resolve(&validated, PlanScope::Backend).unwrap();
        let frontend = resolver
            .resolve(&validated, PlanScope::Frontend { backend: &backend.derived })
            .unwrap();

        assert_eq!(keys(&frontend), vec!["frontend/nextjs/typescript", "ui/shadcn/typescript"]);
        assert_eq!(
            frontend.derived.custom_api_path.as_deref(),
            Some("http://localhost:8123/api/chat")
        );
        assert_eq!(frontend.derived.resolved_port, 3000);
        assert_eq!(
            frontend.steps[0].substitutions.get("CHAT_API"),
            Some("http://localhost:8123/api/chat")
        );
        assert_eq!(frontend.manifest_patches.manifest.path.as_str(), "package.json");
        assert!(!keys(&backend).iter().any(|k| k.starts_with("devcontainer")));
    }

    #[test]
    fn nextjs_standalone_includes_ui() {
        let validated = validate(
            config()
                .framework(crate::domain::Framework::NextJs)
                .ui(Ui::Html),
        );
        let plan = resolver().resolve(&validated, PlanScope::Standalone).unwrap();
        assert!(keys(&plan).contains(&"ui/html/typescript".to_string()));
        assert_eq!(plan.steps[0].substitutions.get("CHAT_API"), Some("/api/chat"));
    }

    #[test]
    fn missing_fragment_is_reported() {
        let validated = validate(
            config()
                .template_type(TemplateType::Multiagent)
                .agents(AgentTopology::FinancialReport),
        );
        let err = resolver()
            .resolve(&validated, PlanScope::Standalone)
            .unwrap_err();
        assert_eq!(
            err,
            CompositionError::FragmentNotFound {
                key: "base/multiagent/python".into()
            }
        );
    }

    #[test]
    fn unbound_placeholder_fails_before_any_write() {
        let broken = Fragment::builder(
            FragmentKey::new(Category::Base, "streaming").for_language(Language::Python),
        )
        .file("app/main.py", "print('{{APP_NAME}} {{NOT_BOUND}}')")
        .build()
        .unwrap();
        let ctx = crate::application::test_support::context_with(library_with([broken]));

        let err = Resolver::new(&ctx)
            .resolve(&validate(config()), PlanScope::Standalone)
            .unwrap_err();
        assert_eq!(
            err,
            CompositionError::UnboundPlaceholder {
                placeholder: "NOT_BOUND".into(),
                fragment: "base/streaming/python".into(),
                path: "app/main.py".into(),
            }
        );
    }

    #[test]
    fn aggregate_plan_carries_both_ports() {
        let validated = validate(config().fullstack(true));
        let resolver = resolver();
        let backend = resolver.resolve(&validated, PlanScope::Backend).unwrap();
        let frontend = resolver
            .resolve(&validated, PlanScope::Frontend { backend: &backend.derived })
            .unwrap();
        let aggregate = resolver
            .resolve_aggregate(&validated, &backend.derived, &frontend.derived)
            .unwrap();

        assert_eq!(aggregate.role, None);
        assert_eq!(keys(&aggregate), vec!["aggregate/fullstack/common"]);
        let subs = &aggregate.steps[0].substitutions;
        assert_eq!(subs.get("BACKEND_PORT"), Some("8000"));
        assert_eq!(subs.get("FRONTEND_PORT"), Some("3000"));
        assert_eq!(subs.get("PORT"), Some("8000"));
    }

    #[test]
    fn aggregate_binds_every_standard_name() {
        let validated = validate(config().fullstack(true).external_port(9000));
        let resolver = resolver();
        let backend = resolver.resolve(&validated, PlanScope::Backend).unwrap();
        let frontend = resolver
            .resolve(&validated, PlanScope::Frontend { backend: &backend.derived })
            .unwrap();
        let aggregate = resolver
            .resolve_aggregate(&validated, &backend.derived, &frontend.derived)
            .unwrap();

        let backend_subs = &backend.steps[0].substitutions;
        let aggregate_subs = &aggregate.steps[0].substitutions;
        for (name, _) in backend_subs.iter() {
            assert!(aggregate_subs.contains(name), "{name} unbound in aggregate");
        }
        assert_eq!(aggregate_subs.get("PORT"), Some("9000"));
        assert_eq!(
            aggregate_subs.get("CHAT_API"),
            Some("http://localhost:9000/api/chat")
        );
    }
}
