//! The user's choices for one generation run.
//!
//! `AppConfiguration` is produced upstream (prompts, flags or an answers
//! file) and never mutated afterwards. `ValidatedConfiguration` can only be
//! obtained from [`ConstraintTable::validate`](crate::domain::ConstraintTable::validate).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::{
    error::{Axis, ConfigurationError},
    value_objects::{
        AgentTopology, DataSourceKind, Framework, Language, ModelProvider, Observability,
        PostInstallAction, TemplateType, Tool, Ui, VectorStore,
    },
};

/// One data source feeding the generated index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataSource {
    #[serde(rename = "type")]
    pub kind: DataSourceKind,
    /// File path, URL or connection string, depending on `kind`.
    #[serde(default)]
    pub locator: String,
}

impl DataSource {
    pub fn new(kind: DataSourceKind, locator: impl Into<String>) -> Self {
        Self {
            kind,
            locator: locator.into(),
        }
    }
}

/// Chat and embedding model selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawModelConfig")]
pub struct ModelConfig {
    pub provider: ModelProvider,
    pub model: String,
    pub embedding_model: String,
    pub dimensions: u32,
    /// Credential written into the generated `.env`; empty when the user
    /// will fill it in later.
    pub api_key: Option<String>,
}

impl ModelConfig {
    /// Default models for a provider.
    pub fn defaults_for(provider: ModelProvider) -> Self {
        let (model, embedding_model, dimensions) = match provider {
            ModelProvider::OpenAi => ("gpt-4o-mini", "text-embedding-3-large", 1024),
            ModelProvider::Anthropic => ("claude-3-5-sonnet", "voyage-3", 1024),
            ModelProvider::Ollama => ("llama3.1", "nomic-embed-text", 768),
        };
        Self {
            provider,
            model: model.to_string(),
            embedding_model: embedding_model.to_string(),
            dimensions,
            api_key: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>, dimensions: u32) -> Self {
        self.embedding_model = model.into();
        self.dimensions = dimensions;
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// Answers-file shape: only the provider is required.
#[derive(Deserialize)]
struct RawModelConfig {
    provider: ModelProvider,
    model: Option<String>,
    embedding_model: Option<String>,
    dimensions: Option<u32>,
    api_key: Option<String>,
}

impl From<RawModelConfig> for ModelConfig {
    fn from(raw: RawModelConfig) -> Self {
        let defaults = ModelConfig::defaults_for(raw.provider);
        Self {
            provider: raw.provider,
            model: raw.model.unwrap_or(defaults.model),
            embedding_model: raw.embedding_model.unwrap_or(defaults.embedding_model),
            dimensions: raw.dimensions.unwrap_or(defaults.dimensions),
            api_key: raw.api_key.filter(|k| !k.is_empty()),
        }
    }
}

/// Immutable generation input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfiguration {
    pub app_name: String,
    pub template_type: TemplateType,
    pub framework: Framework,
    #[serde(default)]
    pub ui: Option<Ui>,
    #[serde(default)]
    pub vector_store: VectorStore,
    #[serde(default)]
    pub data_sources: Vec<DataSource>,
    /// Parse local files with LlamaParse instead of the default readers.
    #[serde(default, alias = "llama_parse")]
    pub use_llama_parse: bool,
    #[serde(default)]
    pub tools: BTreeSet<Tool>,
    pub model_config: ModelConfig,
    #[serde(default)]
    pub observability: Observability,
    #[serde(default)]
    pub post_install_action: PostInstallAction,
    #[serde(default, alias = "fullstack")]
    pub is_fullstack: bool,
    #[serde(default)]
    pub external_port: Option<u32>,
    #[serde(default)]
    pub agents: Option<AgentTopology>,
}

impl AppConfiguration {
    pub fn builder() -> AppConfigurationBuilder {
        AppConfigurationBuilder::default()
    }

    pub fn language(&self) -> Language {
        self.framework.language()
    }

    /// Data-source kinds in first-appearance order, without repeats.
    pub fn data_source_kinds(&self) -> Vec<DataSourceKind> {
        let mut kinds = Vec::new();
        for source in &self.data_sources {
            if !kinds.contains(&source.kind) {
                kinds.push(source.kind);
            }
        }
        kinds
    }

    pub fn has_file_data_source(&self) -> bool {
        self.data_sources
            .iter()
            .any(|s| s.kind == DataSourceKind::File)
    }
}

/// Fluent construction with required-field checks.
#[derive(Debug, Default, Clone)]
pub struct AppConfigurationBuilder {
    app_name: Option<String>,
    template_type: Option<TemplateType>,
    framework: Option<Framework>,
    ui: Option<Ui>,
    vector_store: VectorStore,
    data_sources: Vec<DataSource>,
    use_llama_parse: bool,
    tools: BTreeSet<Tool>,
    model_config: Option<ModelConfig>,
    observability: Observability,
    post_install_action: PostInstallAction,
    is_fullstack: bool,
    external_port: Option<u32>,
    agents: Option<AgentTopology>,
}

impl AppConfigurationBuilder {
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    pub fn template_type(mut self, template_type: TemplateType) -> Self {
        self.template_type = Some(template_type);
        self
    }

    pub fn framework(mut self, framework: Framework) -> Self {
        self.framework = Some(framework);
        self
    }

    pub fn ui(mut self, ui: Ui) -> Self {
        self.ui = Some(ui);
        self
    }

    pub fn vector_store(mut self, vector_store: VectorStore) -> Self {
        self.vector_store = vector_store;
        self
    }

    pub fn data_source(mut self, source: DataSource) -> Self {
        self.data_sources.push(source);
        self
    }

    pub fn llama_parse(mut self, enabled: bool) -> Self {
        self.use_llama_parse = enabled;
        self
    }

    pub fn tool(mut self, tool: Tool) -> Self {
        self.tools.insert(tool);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = Tool>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn model_config(mut self, model_config: ModelConfig) -> Self {
        self.model_config = Some(model_config);
        self
    }

    pub fn observability(mut self, observability: Observability) -> Self {
        self.observability = observability;
        self
    }

    pub fn post_install_action(mut self, action: PostInstallAction) -> Self {
        self.post_install_action = action;
        self
    }

    pub fn fullstack(mut self, is_fullstack: bool) -> Self {
        self.is_fullstack = is_fullstack;
        self
    }

    pub fn external_port(mut self, port: u32) -> Self {
        self.external_port = Some(port);
        self
    }

    pub fn agents(mut self, agents: AgentTopology) -> Self {
        self.agents = Some(agents);
        self
    }

    pub fn build(self) -> Result<AppConfiguration, ConfigurationError> {
        let app_name = self
            .app_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ConfigurationError::invalid(Axis::AppName, "", "must not be empty"))?;
        let template_type = self.template_type.ok_or_else(|| {
            ConfigurationError::invalid(Axis::TemplateType, "", "a template type is required")
        })?;
        let framework = self.framework.ok_or_else(|| {
            ConfigurationError::invalid(Axis::Framework, "", "a framework is required")
        })?;
        let model_config = self.model_config.ok_or_else(|| {
            ConfigurationError::invalid(Axis::ModelConfig, "", "a model provider is required")
        })?;

        Ok(AppConfiguration {
            app_name,
            template_type,
            framework,
            ui: self.ui,
            vector_store: self.vector_store,
            data_sources: self.data_sources,
            use_llama_parse: self.use_llama_parse,
            tools: self.tools,
            model_config,
            observability: self.observability,
            post_install_action: self.post_install_action,
            is_fullstack: self.is_fullstack,
            external_port: self.external_port,
            agents: self.agents,
        })
    }
}

/// A configuration that passed the constraint table.
///
/// Carries the facts the resolver needs that are derived from the rules
/// rather than chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfiguration {
    config: AppConfiguration,
    backend_port: u16,
    requires_external_config: bool,
    required_env: Vec<&'static str>,
}

impl ValidatedConfiguration {
    pub(crate) fn new(
        config: AppConfiguration,
        backend_port: u16,
        requires_external_config: bool,
        required_env: Vec<&'static str>,
    ) -> Self {
        Self {
            config,
            backend_port,
            requires_external_config,
            required_env,
        }
    }

    pub fn config(&self) -> &AppConfiguration {
        &self.config
    }

    pub fn into_inner(self) -> AppConfiguration {
        self.config
    }

    pub fn language(&self) -> Language {
        self.config.language()
    }

    /// `externalPort`, or the framework's default port.
    pub fn backend_port(&self) -> u16 {
        self.backend_port
    }

    /// True when a selected tool needs a configuration file the user must
    /// review before running the app.
    pub fn requires_external_config(&self) -> bool {
        self.requires_external_config
    }

    /// Environment variables the selected provider, tools and observability
    /// backend expect, deduplicated in selection order.
    pub fn required_env(&self) -> &[&'static str] {
        &self.required_env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_core_fields() {
        let err = AppConfiguration::builder()
            .app_name("demo")
            .framework(Framework::FastApi)
            .build()
            .unwrap_err();
        assert_eq!(err.axis(), Axis::TemplateType);

        let err = AppConfiguration::builder()
            .app_name("   ")
            .build()
            .unwrap_err();
        assert_eq!(err.axis(), Axis::AppName);
    }

    #[test]
    fn data_source_kinds_keep_first_appearance_order() {
        let config = AppConfiguration::builder()
            .app_name("demo")
            .template_type(TemplateType::Streaming)
            .framework(Framework::FastApi)
            .model_config(ModelConfig::defaults_for(ModelProvider::OpenAi))
            .data_source(DataSource::new(DataSourceKind::Web, "https://example.com"))
            .data_source(DataSource::new(DataSourceKind::File, "data/"))
            .data_source(DataSource::new(DataSourceKind::Web, "https://example.org"))
            .build()
            .unwrap();

        assert_eq!(
            config.data_source_kinds(),
            vec![DataSourceKind::Web, DataSourceKind::File]
        );
        assert!(config.has_file_data_source());
    }

    #[test]
    fn answers_file_fills_model_defaults() {
        let config: AppConfiguration = toml::from_str(
            r#"
            app_name = "demo"
            template_type = "streaming"
            framework = "express"
            vector_store = "chroma"
            tools = ["weather", "duckduckgo"]

            [model_config]
            provider = "ollama"
            "#,
        )
        .unwrap();

        assert_eq!(config.model_config, ModelConfig::defaults_for(ModelProvider::Ollama));
        assert_eq!(config.tools.len(), 2);
        assert!(!config.is_fullstack);
        assert_eq!(config.post_install_action, PostInstallAction::Dependencies);
    }

    #[test]
    fn answers_file_rejects_unknown_variant() {
        let err = serde_json::from_str::<AppConfiguration>(
            r#"{"app_name":"x","template_type":"streaming","framework":"django",
                "model_config":{"provider":"openai"}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown framework 'django'"));
    }
}
