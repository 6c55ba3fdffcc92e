//! Core domain layer for weave.
//!
//! Pure logic with no I/O: configuration axes, the constraint table,
//! fragments, composition plans, placeholder substitution and `.env`
//! merging. Filesystem and fragment storage are reached through ports
//! defined in the application layer.
//!
//! ## Hexagonal Architecture Compliance
//!
//! - **No async**: domain logic is synchronous
//! - **No I/O**: no filesystem, network, or process calls
//! - **Immutable inputs**: `AppConfiguration` is never mutated after
//!   construction; plans are built fresh per generation

pub mod constraints;
pub mod entities;
pub mod error;
pub mod value_objects;

pub use constraints::{ConstraintTable, Requirement};
pub use entities::{
    common::RelativePath,
    configuration::{
        AppConfiguration, AppConfigurationBuilder, DataSource, ModelConfig,
        ValidatedConfiguration,
    },
    env_file::{EnvEntry, EnvFile},
    fragment::{
        Category, Dependency, DirectorySpec, EnvDeclaration, FileSpec, Fragment, FragmentBuilder,
        FragmentContent, FragmentKey, FragmentNode,
    },
    plan::{
        API_BASE_PATH, CompositionPlan, ConfigDocument, ConfigFormat, ConfigValue,
        DerivedBindings, ManifestFile, ManifestFormat, ManifestPatches, PlanStep,
    },
    substitution::Substitutions,
};
pub use error::{Axis, ConfigurationError, ErrorCategory, FragmentError};
pub use value_objects::{
    AgentTopology, DataSourceKind, Framework, Language, ModelProvider, Observability,
    PostInstallAction, Role, TemplateType, Tool, Ui, VectorStore,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfigurationBuilder {
        AppConfiguration::builder()
            .app_name("support-bot")
            .template_type(TemplateType::Streaming)
            .framework(Framework::FastApi)
            .model_config(ModelConfig::defaults_for(ModelProvider::OpenAi))
    }

    #[test]
    fn every_tool_requiring_config_flags_the_configuration() {
        let table = ConstraintTable::builtin();
        for def in table.tools() {
            if !def.languages.contains(&Language::Python) {
                continue;
            }
            let validated = table.validate(config().tool(def.tool).build().unwrap()).unwrap();
            assert_eq!(
                validated.requires_external_config(),
                def.requires_config_file(),
                "{}",
                def.tool
            );
        }
    }

    #[test]
    fn configuration_errors_name_axis_and_value() {
        let err = ConstraintTable::builtin()
            .validate(config().framework(Framework::NextJs).fullstack(true).build().unwrap())
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("fullstack"));
        assert!(message.contains("nextjs"));
        assert!(!err.suggestions().is_empty());
    }
}
