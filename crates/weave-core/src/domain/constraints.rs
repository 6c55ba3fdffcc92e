//! Constraint table: compatibility and requirement rules between axes.
//!
//! # Design
//!
//! Each variant is described exactly once by a definition row in one of the
//! static registries below. Validation is a series of table lookups; no
//! compatibility `match` arms live anywhere else.
//!
//! The registries are wrapped in an explicitly constructed, immutable
//! [`ConstraintTable`] so tests can validate against reduced tables without
//! touching process-wide state.
//!
//! # Adding a New Vector Store
//!
//! 1. Add the variant in `value_objects.rs`
//! 2. List it in `vector_stores` of every framework that supports it
//! 3. Add `fragments/vector-store/<name>/<language>/`

use tracing::{debug, instrument};

use crate::domain::{
    entities::configuration::{AppConfiguration, ValidatedConfiguration},
    error::{Axis, ConfigurationError},
    value_objects::{
        AgentTopology, DataSourceKind, Framework, Language, ModelProvider, Observability,
        TemplateType, Tool, VectorStore,
    },
};

/// Credentials LlamaParse needs on top of the provider's.
pub const LLAMA_PARSE_ENV: &[&str] = &["LLAMA_CLOUD_API_KEY"];

// ── Rows ─────────────────────────────────────────────────────────────────────

/// Everything validation needs to know about one framework.
#[derive(Debug, Clone, Copy)]
pub struct FrameworkDef {
    pub framework: Framework,
    pub language: Language,
    /// Port the generated server listens on when `externalPort` is unset.
    pub default_port: u16,
    pub template_types: &'static [TemplateType],
    pub vector_stores: &'static [VectorStore],
    pub data_sources: &'static [DataSourceKind],
    /// Whether the framework can serve as the backend of a fullstack split.
    pub fullstack_backend: bool,
}

/// A side effect of selecting a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// The generated project carries a config file the user must review.
    ConfigFile,
    /// The generated project reads these environment variables.
    EnvVars(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct ToolDef {
    pub tool: Tool,
    pub languages: &'static [Language],
    pub requires: &'static [Requirement],
}

impl ToolDef {
    pub fn requires_config_file(&self) -> bool {
        self.requires.contains(&Requirement::ConfigFile)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ObservabilityDef {
    pub observability: Observability,
    pub languages: &'static [Language],
    pub env: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct ProviderDef {
    pub provider: ModelProvider,
    pub env: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct AgentDef {
    pub topology: AgentTopology,
    pub languages: &'static [Language],
}

// ── Registries ───────────────────────────────────────────────────────────────

const BOTH: &[Language] = &[Language::Python, Language::TypeScript];
const PYTHON: &[Language] = &[Language::Python];

const TS_VECTOR_STORES: &[VectorStore] = &[
    VectorStore::None,
    VectorStore::Chroma,
    VectorStore::Pg,
    VectorStore::Pinecone,
    VectorStore::LlamaCloud,
];

pub static FRAMEWORK_REGISTRY: &[FrameworkDef] = &[
    FrameworkDef {
        framework: Framework::FastApi,
        language: Language::Python,
        default_port: 8000,
        template_types: TemplateType::ALL,
        vector_stores: VectorStore::ALL,
        data_sources: DataSourceKind::ALL,
        fullstack_backend: true,
    },
    FrameworkDef {
        framework: Framework::Express,
        language: Language::TypeScript,
        default_port: 8000,
        template_types: &[TemplateType::Streaming, TemplateType::Multiagent],
        vector_stores: TS_VECTOR_STORES,
        data_sources: &[DataSourceKind::File],
        fullstack_backend: true,
    },
    FrameworkDef {
        framework: Framework::NextJs,
        language: Language::TypeScript,
        default_port: 3000,
        template_types: &[TemplateType::Streaming, TemplateType::Multiagent],
        vector_stores: TS_VECTOR_STORES,
        data_sources: &[DataSourceKind::File],
        fullstack_backend: false,
    },
];

pub static TOOL_REGISTRY: &[ToolDef] = &[
    ToolDef {
        tool: Tool::Weather,
        languages: BOTH,
        requires: &[Requirement::ConfigFile],
    },
    ToolDef {
        tool: Tool::Wikipedia,
        languages: PYTHON,
        requires: &[],
    },
    ToolDef {
        tool: Tool::Interpreter,
        languages: BOTH,
        requires: &[
            Requirement::ConfigFile,
            Requirement::EnvVars(&["E2B_API_KEY"]),
        ],
    },
    ToolDef {
        tool: Tool::DuckDuckGo,
        languages: BOTH,
        requires: &[],
    },
];

pub static OBSERVABILITY_REGISTRY: &[ObservabilityDef] = &[
    ObservabilityDef {
        observability: Observability::Traceloop,
        languages: BOTH,
        env: &["TRACELOOP_API_KEY"],
    },
    ObservabilityDef {
        observability: Observability::LlamaTrace,
        languages: PYTHON,
        env: &["PHOENIX_API_KEY"],
    },
];

pub static PROVIDER_REGISTRY: &[ProviderDef] = &[
    ProviderDef {
        provider: ModelProvider::OpenAi,
        env: &["OPENAI_API_KEY"],
    },
    ProviderDef {
        provider: ModelProvider::Anthropic,
        env: &["ANTHROPIC_API_KEY"],
    },
    ProviderDef {
        provider: ModelProvider::Ollama,
        env: &["OLLAMA_BASE_URL"],
    },
];

pub static AGENT_REGISTRY: &[AgentDef] = &[
    AgentDef {
        topology: AgentTopology::Blog,
        languages: BOTH,
    },
    AgentDef {
        topology: AgentTopology::FinancialReport,
        languages: PYTHON,
    },
];

// ── Table ────────────────────────────────────────────────────────────────────

/// Immutable set of rules a configuration is validated against.
#[derive(Debug, Clone)]
pub struct ConstraintTable {
    frameworks: Vec<FrameworkDef>,
    tools: Vec<ToolDef>,
    observability: Vec<ObservabilityDef>,
    providers: Vec<ProviderDef>,
    agents: Vec<AgentDef>,
}

impl Default for ConstraintTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ConstraintTable {
    /// The rules shipped with this release.
    pub fn builtin() -> Self {
        Self {
            frameworks: FRAMEWORK_REGISTRY.to_vec(),
            tools: TOOL_REGISTRY.to_vec(),
            observability: OBSERVABILITY_REGISTRY.to_vec(),
            providers: PROVIDER_REGISTRY.to_vec(),
            agents: AGENT_REGISTRY.to_vec(),
        }
    }

    /// A table with one framework row removed.
    pub fn without_framework(mut self, framework: Framework) -> Self {
        self.frameworks.retain(|d| d.framework != framework);
        self
    }

    /// A table with one tool row removed.
    pub fn without_tool(mut self, tool: Tool) -> Self {
        self.tools.retain(|d| d.tool != tool);
        self
    }

    pub fn frameworks(&self) -> &[FrameworkDef] {
        &self.frameworks
    }

    pub fn framework(&self, framework: Framework) -> Option<&FrameworkDef> {
        self.frameworks.iter().find(|d| d.framework == framework)
    }

    pub fn tools(&self) -> &[ToolDef] {
        &self.tools
    }

    pub fn tool(&self, tool: Tool) -> Option<&ToolDef> {
        self.tools.iter().find(|d| d.tool == tool)
    }

    pub fn observability_backends(&self) -> &[ObservabilityDef] {
        &self.observability
    }

    pub fn observability(&self, observability: Observability) -> Option<&ObservabilityDef> {
        self.observability
            .iter()
            .find(|d| d.observability == observability)
    }

    pub fn providers(&self) -> &[ProviderDef] {
        &self.providers
    }

    pub fn provider(&self, provider: ModelProvider) -> Option<&ProviderDef> {
        self.providers.iter().find(|d| d.provider == provider)
    }

    pub fn agents(&self) -> &[AgentDef] {
        &self.agents
    }

    pub fn agent(&self, topology: AgentTopology) -> Option<&AgentDef> {
        self.agents.iter().find(|d| d.topology == topology)
    }

    /// Validate a configuration.
    ///
    /// Fails on the first violated rule. Never substitutes a default for an
    /// explicitly set, invalid value.
    #[instrument(skip_all, fields(app = %config.app_name, framework = %config.framework))]
    pub fn validate(
        &self,
        config: AppConfiguration,
    ) -> Result<ValidatedConfiguration, ConfigurationError> {
        validate_app_name(&config.app_name)?;

        let fw = self
            .framework(config.framework)
            .ok_or_else(|| ConfigurationError::unknown(Axis::Framework, config.framework.as_str()))?;
        let language = fw.language;
        let on_framework = format!("framework '{}'", fw.framework);

        if !fw.template_types.contains(&config.template_type) {
            return Err(ConfigurationError::incompatible(
                Axis::TemplateType,
                config.template_type.as_str(),
                &on_framework,
                format!("{} supports {}", fw.framework, join(fw.template_types)),
            ));
        }

        if !fw.vector_stores.contains(&config.vector_store) {
            return Err(ConfigurationError::incompatible(
                Axis::VectorStore,
                config.vector_store.as_str(),
                &on_framework,
                format!("{} supports {}", fw.framework, join(fw.vector_stores)),
            ));
        }

        for source in &config.data_sources {
            if !fw.data_sources.contains(&source.kind) {
                return Err(ConfigurationError::incompatible(
                    Axis::DataSource,
                    source.kind.as_str(),
                    &on_framework,
                    format!("{} supports {} data sources", fw.framework, join(fw.data_sources)),
                ));
            }
            if source.kind != DataSourceKind::File && source.locator.trim().is_empty() {
                return Err(ConfigurationError::invalid(
                    Axis::DataSource,
                    source.kind.as_str(),
                    "a URL or connection string is required",
                ));
            }
        }

        let mut required_env: Vec<&'static str> = Vec::new();
        if config.use_llama_parse && !config.has_file_data_source() {
            return Err(ConfigurationError::invalid(
                Axis::DataSource,
                "llamaparse",
                "LlamaParse reads local files; add a file data source",
            ));
        }

        let provider = self.provider(config.model_config.provider).ok_or_else(|| {
            ConfigurationError::unknown(Axis::ModelProvider, config.model_config.provider.as_str())
        })?;
        push_env(&mut required_env, provider.env);
        if config.use_llama_parse {
            push_env(&mut required_env, LLAMA_PARSE_ENV);
        }
        validate_model(&config)?;

        let mut requires_external_config = false;
        for tool in &config.tools {
            let def = self
                .tool(*tool)
                .ok_or_else(|| ConfigurationError::unknown(Axis::Tool, tool.as_str()))?;
            if !def.languages.contains(&language) {
                return Err(ConfigurationError::incompatible(
                    Axis::Tool,
                    tool.as_str(),
                    &on_framework,
                    format!("{tool} is only available for {}", join(def.languages)),
                ));
            }
            for requirement in def.requires {
                match requirement {
                    Requirement::ConfigFile => requires_external_config = true,
                    Requirement::EnvVars(names) => push_env(&mut required_env, names),
                }
            }
        }

        if config.observability != Observability::None {
            let def = self.observability(config.observability).ok_or_else(|| {
                ConfigurationError::unknown(Axis::Observability, config.observability.as_str())
            })?;
            if !def.languages.contains(&language) {
                return Err(ConfigurationError::incompatible(
                    Axis::Observability,
                    config.observability.as_str(),
                    &on_framework,
                    format!("only available for {}", join(def.languages)),
                ));
            }
            push_env(&mut required_env, def.env);
        }

        self.validate_agents(&config, language, &on_framework)?;

        if let Some(ui) = config.ui {
            if config.framework != Framework::NextJs && !config.is_fullstack {
                return Err(ConfigurationError::incompatible(
                    Axis::Ui,
                    ui.as_str(),
                    &on_framework,
                    "a UI only applies to a Next.js frontend; choose nextjs or fullstack mode",
                ));
            }
        }

        if config.is_fullstack && !fw.fullstack_backend {
            return Err(ConfigurationError::incompatible(
                Axis::Fullstack,
                "true",
                &on_framework,
                format!("{} cannot serve as a separate backend", fw.framework),
            ));
        }

        let backend_port = match config.external_port {
            Some(port) => u16::try_from(port)
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| {
                    ConfigurationError::invalid(
                        Axis::Port,
                        port.to_string(),
                        "must be between 1 and 65535",
                    )
                })?,
            None => fw.default_port,
        };

        debug!(
            backend_port,
            requires_external_config,
            env = ?required_env,
            "Configuration validated"
        );

        Ok(ValidatedConfiguration::new(
            config,
            backend_port,
            requires_external_config,
            required_env,
        ))
    }

    fn validate_agents(
        &self,
        config: &AppConfiguration,
        language: Language,
        on_framework: &str,
    ) -> Result<(), ConfigurationError> {
        match (config.template_type, config.agents) {
            (TemplateType::Multiagent, None) => Err(ConfigurationError::invalid(
                Axis::Agents,
                "",
                "the multiagent template requires an agent topology",
            )),
            (TemplateType::Multiagent, Some(topology)) => {
                let def = self
                    .agent(topology)
                    .ok_or_else(|| ConfigurationError::unknown(Axis::Agents, topology.as_str()))?;
                if def.languages.contains(&language) {
                    Ok(())
                } else {
                    Err(ConfigurationError::incompatible(
                        Axis::Agents,
                        topology.as_str(),
                        on_framework,
                        format!("only available for {}", join(def.languages)),
                    ))
                }
            }
            (other, Some(topology)) => Err(ConfigurationError::incompatible(
                Axis::Agents,
                topology.as_str(),
                format!("template type '{other}'"),
                "agents are only used by the multiagent template",
            )),
            (_, None) => Ok(()),
        }
    }
}

fn validate_app_name(name: &str) -> Result<(), ConfigurationError> {
    if name.trim().is_empty() {
        return Err(ConfigurationError::invalid(
            Axis::AppName,
            name,
            "must not be empty",
        ));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(ConfigurationError::invalid(
            Axis::AppName,
            name,
            "must be a plain name, not a path",
        ));
    }
    Ok(())
}

fn validate_model(config: &AppConfiguration) -> Result<(), ConfigurationError> {
    let model = &config.model_config;
    if model.model.trim().is_empty() || model.embedding_model.trim().is_empty() {
        return Err(ConfigurationError::invalid(
            Axis::ModelConfig,
            model.provider.as_str(),
            "model and embedding model names are required",
        ));
    }
    if model.dimensions == 0 {
        return Err(ConfigurationError::invalid(
            Axis::ModelConfig,
            model.dimensions.to_string(),
            "embedding dimensions must be positive",
        ));
    }
    Ok(())
}

fn push_env(into: &mut Vec<&'static str>, names: &[&'static str]) {
    for name in names {
        if !into.contains(name) {
            into.push(name);
        }
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::configuration::{DataSource, ModelConfig};
    use crate::domain::value_objects::Ui;

    fn base(framework: Framework) -> crate::domain::entities::configuration::AppConfigurationBuilder {
        AppConfiguration::builder()
            .app_name("demo")
            .template_type(TemplateType::Streaming)
            .framework(framework)
            .model_config(ModelConfig::defaults_for(ModelProvider::OpenAi))
    }

    fn table() -> ConstraintTable {
        ConstraintTable::builtin()
    }

    #[test]
    fn registry_integrity() {
        let table = table();
        for framework in Framework::ALL {
            let def = table.framework(*framework).expect("every framework has a row");
            assert_eq!(def.language, framework.language());
            assert!(def.vector_stores.contains(&VectorStore::None));
        }
        for tool in Tool::ALL {
            assert!(table.tool(*tool).is_some(), "{tool} has no row");
        }
        for provider in ModelProvider::ALL {
            assert!(table.provider(*provider).is_some());
        }
    }

    #[test]
    fn minimal_fastapi_config_is_valid() {
        let validated = table().validate(base(Framework::FastApi).build().unwrap()).unwrap();
        assert_eq!(validated.language(), Language::Python);
        assert_eq!(validated.backend_port(), 8000);
        assert!(!validated.requires_external_config());
        assert_eq!(validated.required_env(), &["OPENAI_API_KEY"]);
    }

    #[test]
    fn nextjs_defaults_to_port_3000() {
        let validated = table().validate(base(Framework::NextJs).build().unwrap()).unwrap();
        assert_eq!(validated.backend_port(), 3000);
    }

    #[test]
    fn weather_requires_config_file() {
        let validated = table()
            .validate(base(Framework::FastApi).tool(Tool::Weather).build().unwrap())
            .unwrap();
        assert!(validated.requires_external_config());
    }

    #[test]
    fn interpreter_adds_env_requirement() {
        let validated = table()
            .validate(
                base(Framework::Express)
                    .tool(Tool::Interpreter)
                    .observability(Observability::Traceloop)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        assert_eq!(
            validated.required_env(),
            &["OPENAI_API_KEY", "E2B_API_KEY", "TRACELOOP_API_KEY"]
        );
    }

    #[test]
    fn llama_parse_needs_a_file_source() {
        let err = table()
            .validate(base(Framework::FastApi).llama_parse(true).build().unwrap())
            .unwrap_err();
        assert_eq!(err.axis(), Axis::DataSource);
        assert_eq!(err.value(), "llamaparse");

        let validated = table()
            .validate(
                base(Framework::FastApi)
                    .data_source(DataSource::new(DataSourceKind::File, ""))
                    .llama_parse(true)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        assert_eq!(
            validated.required_env(),
            &["OPENAI_API_KEY", "LLAMA_CLOUD_API_KEY"]
        );
    }

    #[test]
    fn rejects_vector_store_unsupported_by_framework() {
        let err = table()
            .validate(base(Framework::Express).vector_store(VectorStore::Qdrant).build().unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::IncompatibleCombination {
                axis: Axis::VectorStore,
                ..
            }
        ));
        assert_eq!(err.value(), "qdrant");
    }

    #[test]
    fn rejects_web_source_on_express() {
        let err = table()
            .validate(
                base(Framework::Express)
                    .data_source(DataSource::new(DataSourceKind::Web, "https://x.dev"))
                    .build()
                    .unwrap(),
            )
            .unwrap_err();
        assert_eq!(err.axis(), Axis::DataSource);
    }

    #[test]
    fn rejects_python_only_tool_on_typescript() {
        let err = table()
            .validate(base(Framework::NextJs).tool(Tool::Wikipedia).build().unwrap())
            .unwrap_err();
        assert_eq!(err.axis(), Axis::Tool);
        assert_eq!(err.category(), crate::domain::ErrorCategory::Compatibility);
    }

    #[test]
    fn rejects_structured_template_outside_fastapi() {
        let err = table()
            .validate(
                base(Framework::Express)
                    .template_type(TemplateType::Structured)
                    .build()
                    .unwrap(),
            )
            .unwrap_err();
        assert_eq!(err.axis(), Axis::TemplateType);
    }

    #[test]
    fn multiagent_and_agents_go_together() {
        let missing = table()
            .validate(
                base(Framework::FastApi)
                    .template_type(TemplateType::Multiagent)
                    .build()
                    .unwrap(),
            )
            .unwrap_err();
        assert_eq!(missing.axis(), Axis::Agents);

        let stray = table()
            .validate(base(Framework::FastApi).agents(AgentTopology::Blog).build().unwrap())
            .unwrap_err();
        assert!(matches!(stray, ConfigurationError::IncompatibleCombination { .. }));

        let ts_financial = table()
            .validate(
                base(Framework::Express)
                    .template_type(TemplateType::Multiagent)
                    .agents(AgentTopology::FinancialReport)
                    .build()
                    .unwrap(),
            )
            .unwrap_err();
        assert_eq!(ts_financial.value(), "financial-report");
    }

    #[test]
    fn ui_requires_nextjs_surface() {
        assert!(
            table()
                .validate(base(Framework::FastApi).ui(Ui::Html).build().unwrap())
                .is_err()
        );
        assert!(
            table()
                .validate(base(Framework::FastApi).ui(Ui::Html).fullstack(true).build().unwrap())
                .is_ok()
        );
        assert!(
            table()
                .validate(base(Framework::NextJs).ui(Ui::Shadcn).build().unwrap())
                .is_ok()
        );
    }

    #[test]
    fn nextjs_cannot_be_fullstack_backend() {
        let err = table()
            .validate(base(Framework::NextJs).fullstack(true).build().unwrap())
            .unwrap_err();
        assert_eq!(err.axis(), Axis::Fullstack);
    }

    #[test]
    fn port_bounds() {
        for bad in [0, 65_536, 100_000] {
            let err = table()
                .validate(base(Framework::FastApi).external_port(bad).build().unwrap())
                .unwrap_err();
            assert_eq!(err.axis(), Axis::Port);
        }
        let ok = table()
            .validate(base(Framework::FastApi).external_port(65_535).build().unwrap())
            .unwrap();
        assert_eq!(ok.backend_port(), 65_535);
    }

    #[test]
    fn missing_rows_are_unknown_variants() {
        let reduced = ConstraintTable::builtin()
            .without_framework(Framework::Express)
            .without_tool(Tool::DuckDuckGo);

        let err = reduced
            .validate(base(Framework::Express).build().unwrap())
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::unknown(Axis::Framework, "express")
        );

        let err = reduced
            .validate(base(Framework::FastApi).tool(Tool::DuckDuckGo).build().unwrap())
            .unwrap_err();
        assert_eq!(err, ConfigurationError::unknown(Axis::Tool, "duckduckgo"));
    }

    #[test]
    fn rejects_path_like_app_names() {
        let err = table()
            .validate(base(Framework::FastApi).app_name("../evil").build().unwrap())
            .unwrap_err();
        assert_eq!(err.axis(), Axis::AppName);
    }
}
