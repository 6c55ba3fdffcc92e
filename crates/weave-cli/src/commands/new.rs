//! Implementation of the `weave new` command.
//!
//! Responsibility: turn the answers file, user defaults and flags into an
//! `AppConfiguration`, prepare the destination directory, call the
//! generation service, and display results. No business logic lives here.

use std::fs;
use std::path::Path;

use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use weave_adapters::local_context;
use weave_core::{
    application::{GenerationPlan, GenerationService},
    domain::{
        AppConfiguration, ConstraintTable, Framework, ModelConfig, ModelProvider,
        PostInstallAction, TemplateType, VectorStore,
    },
};

use crate::{
    cli::{NewArgs, global::GlobalArgs},
    commands::load_library,
    config::{AppConfig, Defaults},
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
};

/// Execute the `weave new` command.
///
/// Dispatch sequence:
/// 1. Derive the app name from the destination
/// 2. Build the configuration (answers file, then defaults, then flags)
/// 3. Validate it before anything touches the disk
/// 4. Check the destination is absent or empty
/// 5. Dry run: print the plan(s) and stop
/// 6. Create the destination and generate
/// 7. Print the summary
#[instrument(skip_all, fields(path = %args.path.display()))]
pub fn execute(
    args: NewArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    // 1. App name
    let project_name = resolve_project_name(&args.path)?;
    validate_project_name(&project_name)?;

    // 2. Configuration
    let app_config = build_configuration(&args, &config.defaults, &project_name)?;
    debug!(
        framework = %app_config.framework,
        template = %app_config.template_type,
        fullstack = app_config.is_fullstack,
        "configuration assembled"
    );

    // 3. Validation happens before the destination is created.
    ConstraintTable::builtin()
        .validate(app_config.clone())
        .map_err(|e| CliError::Core(e.into()))?;

    // 4. Destination
    ensure_empty_destination(&args.path)?;

    let library = load_library(&config)?;
    let service = GenerationService::new(local_context(library));

    // 5. Dry run: describe but do not write.
    if args.dry_run {
        let plan = service.plan(app_config).with_cli_context(|| "planning")?;
        return print_plan(&plan, &args.path, args.json, &output);
    }

    // 6. Generate
    fs::create_dir_all(&args.path)
        .with_cli_context(|| format!("creating {}", args.path.display()))?;

    if !args.json {
        output.header(&format!("Creating '{project_name}'..."))?;
    }
    info!(project = %project_name, path = %args.path.display(), "Generation started");

    let summary = service
        .generate(app_config, &args.path)
        .with_cli_context(|| "generating")?;

    info!(project = %project_name, "Generation completed");

    // 7. Summary
    if args.json {
        output.json(&summary)?;
    } else {
        output.summary(&summary, &args.path)?;
        if !global.quiet {
            output.print("")?;
            output.print(&format!("  cd {}", args.path.display()))?;
        }
    }

    Ok(())
}

// ── Path handling ─────────────────────────────────────────────────────────────

/// The destination's last component.
pub fn resolve_project_name(path: &Path) -> CliResult<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| CliError::InvalidProjectName {
            name: path.display().to_string(),
            reason: "cannot extract a project name from the path".into(),
        })
}

fn validate_project_name(name: &str) -> CliResult<()> {
    if name.trim().is_empty() {
        return Err(CliError::InvalidProjectName {
            name: name.into(),
            reason: "name cannot be empty".into(),
        });
    }
    if name.starts_with('.') {
        return Err(CliError::InvalidProjectName {
            name: name.into(),
            reason: "name cannot start with '.'".into(),
        });
    }
    Ok(())
}

fn ensure_empty_destination(path: &Path) -> CliResult<()> {
    if !path.exists() {
        return Ok(());
    }
    let is_empty_dir = path.is_dir()
        && fs::read_dir(path)
            .with_cli_context(|| format!("reading {}", path.display()))?
            .next()
            .is_none();
    if is_empty_dir {
        Ok(())
    } else {
        Err(CliError::DestinationNotEmpty {
            path: path.to_path_buf(),
        })
    }
}

// ── Configuration assembly ────────────────────────────────────────────────────

/// Answers file (or defaults) with every given flag applied on top.
fn build_configuration(
    args: &NewArgs,
    defaults: &Defaults,
    project_name: &str,
) -> CliResult<AppConfiguration> {
    let mut config = match &args.answers {
        Some(path) => read_answers(path, project_name)?,
        None => from_defaults(defaults, project_name)?,
    };
    apply_flags(&mut config, args);
    Ok(config)
}

fn from_defaults(defaults: &Defaults, project_name: &str) -> CliResult<AppConfiguration> {
    let template: TemplateType = parse_default(defaults.template.as_deref())?
        .unwrap_or(TemplateType::Streaming);
    let framework: Framework =
        parse_default(defaults.framework.as_deref())?.unwrap_or(Framework::FastApi);
    let provider: ModelProvider =
        parse_default(defaults.provider.as_deref())?.unwrap_or(ModelProvider::OpenAi);
    let vector_store: VectorStore =
        parse_default(defaults.vector_store.as_deref())?.unwrap_or_default();
    let post_install: PostInstallAction =
        parse_default(defaults.post_install.as_deref())?.unwrap_or_default();

    AppConfiguration::builder()
        .app_name(project_name)
        .template_type(template)
        .framework(framework)
        .vector_store(vector_store)
        .post_install_action(post_install)
        .model_config(ModelConfig::defaults_for(provider))
        .build()
        .map_err(|e| CliError::Core(e.into()))
}

fn parse_default<T>(value: Option<&str>) -> CliResult<Option<T>>
where
    T: std::str::FromStr<Err = weave_core::domain::ConfigurationError>,
{
    value
        .map(str::parse)
        .transpose()
        .map_err(|e| CliError::ConfigError {
            message: format!("invalid default: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Read a TOML or JSON answers file. `app_name` falls back to the
/// destination's name.
fn read_answers(path: &Path, project_name: &str) -> CliResult<AppConfiguration> {
    let answers_error = |message: String| CliError::AnswersFile {
        path: path.to_path_buf(),
        message,
    };

    let text = fs::read_to_string(path).map_err(|e| answers_error(e.to_string()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let mut value: Value = if is_json {
        serde_json::from_str(&text).map_err(|e| answers_error(e.to_string()))?
    } else {
        toml::from_str(&text).map_err(|e| answers_error(e.to_string()))?
    };

    let Value::Object(map) = &mut value else {
        return Err(answers_error("top level must be a table".into()));
    };
    map.entry("app_name")
        .or_insert_with(|| Value::String(project_name.to_string()));

    serde_json::from_value(value).map_err(|e| answers_error(e.to_string()))
}

fn apply_flags(config: &mut AppConfiguration, args: &NewArgs) {
    if let Some(template) = args.template {
        config.template_type = template;
    }
    if let Some(framework) = args.framework {
        config.framework = framework;
    }
    if let Some(ui) = args.ui {
        config.ui = Some(ui);
    }
    if let Some(store) = args.vector_store {
        config.vector_store = store;
    }
    if !args.data_sources.is_empty() {
        config.data_sources = args.data_sources.clone();
    }
    if !args.tools.is_empty() {
        config.tools = args.tools.iter().copied().collect();
    }
    if let Some(provider) = args.provider {
        if provider != config.model_config.provider {
            config.model_config = ModelConfig::defaults_for(provider);
        }
    }
    if let Some(model) = &args.model {
        config.model_config.model = model.clone();
    }
    if let Some(embedding) = &args.embedding_model {
        let dims = args.embedding_dim.unwrap_or(config.model_config.dimensions);
        config.model_config = config
            .model_config
            .clone()
            .with_embedding_model(embedding.clone(), dims);
    }
    if let Some(observability) = args.observability {
        config.observability = observability;
    }
    if let Some(agents) = args.agents {
        config.agents = Some(agents);
    }
    if let Some(action) = args.post_install {
        config.post_install_action = action;
    }
    if args.llama_parse {
        config.use_llama_parse = true;
    }
    if args.fullstack {
        config.is_fullstack = true;
    }
    if let Some(port) = args.port {
        config.external_port = Some(port);
    }
}

// ── Dry run ───────────────────────────────────────────────────────────────────

fn print_plan(
    plan: &GenerationPlan,
    root: &Path,
    as_json: bool,
    output: &OutputManager,
) -> CliResult<()> {
    if as_json {
        let plans: Vec<Value> = plan
            .plans()
            .into_iter()
            .map(|(dir, p)| {
                json!({
                    "dir": dir,
                    "role": p.role.map(|r| r.to_string()),
                    "port": p.derived.resolved_port,
                    "fragments": p.fragment_keys().map(ToString::to_string).collect::<Vec<_>>(),
                    "dependencies": p.manifest_patches.dependencies.iter()
                        .map(|d| json!({ "name": d.name, "constraint": d.constraint }))
                        .collect::<Vec<_>>(),
                    "env": p.manifest_patches.env.iter().map(|e| e.name.clone()).collect::<Vec<_>>(),
                })
            })
            .collect();
        output.json(&json!({ "root": root.display().to_string(), "plans": plans }))?;
        return Ok(());
    }

    output.info(&format!(
        "Dry run: would create {} (nothing written)",
        root.display()
    ))?;
    for (dir, p) in plan.plans() {
        output.print("")?;
        output.header(&format!("[{dir}]"))?;
        output.print(p.to_string().trim_end())?;
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::path::PathBuf;

    use super::*;
    use weave_core::domain::{DataSource, DataSourceKind, Observability, Tool};

    fn args(path: &str) -> NewArgs {
        NewArgs {
            path: PathBuf::from(path),
            ..NewArgs::default()
        }
    }

    fn answers_file(suffix: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    // ── resolve_project_name ──────────────────────────────────────────────────

    #[test]
    fn project_name_is_the_last_component() {
        assert_eq!(resolve_project_name(Path::new("my-app")).unwrap(), "my-app");
        assert_eq!(
            resolve_project_name(Path::new("../work/my-app")).unwrap(),
            "my-app"
        );
    }

    #[test]
    fn dot_paths_have_no_name() {
        assert!(matches!(
            resolve_project_name(Path::new("..")),
            Err(CliError::InvalidProjectName { .. })
        ));
    }

    #[test]
    fn dotfile_name_is_invalid() {
        assert!(validate_project_name(".hidden").is_err());
        assert!(validate_project_name("my_chat").is_ok());
    }

    // ── destination ───────────────────────────────────────────────────────────

    #[test]
    fn destination_must_be_absent_or_empty() {
        let temp = tempfile::tempdir().unwrap();
        assert!(ensure_empty_destination(temp.path()).is_ok());
        assert!(ensure_empty_destination(&temp.path().join("new")).is_ok());

        fs::write(temp.path().join("README.md"), "x").unwrap();
        assert!(matches!(
            ensure_empty_destination(temp.path()),
            Err(CliError::DestinationNotEmpty { .. })
        ));
        assert!(ensure_empty_destination(&temp.path().join("README.md")).is_err());
    }

    // ── configuration assembly ────────────────────────────────────────────────

    #[test]
    fn bare_flags_use_builtin_defaults() {
        let config = build_configuration(&args("my-chat"), &Defaults::default(), "my-chat").unwrap();
        assert_eq!(config.app_name, "my-chat");
        assert_eq!(config.template_type, TemplateType::Streaming);
        assert_eq!(config.framework, Framework::FastApi);
        assert_eq!(config.model_config, ModelConfig::defaults_for(ModelProvider::OpenAi));
        assert_eq!(config.vector_store, VectorStore::None);
    }

    #[test]
    fn user_defaults_apply_and_flags_win() {
        let defaults = Defaults {
            framework: Some("express".into()),
            provider: Some("ollama".into()),
            vector_store: Some("chroma".into()),
            ..Defaults::default()
        };
        let mut a = args("x");
        a.vector_store = Some(VectorStore::Pg);

        let config = build_configuration(&a, &defaults, "x").unwrap();
        assert_eq!(config.framework, Framework::Express);
        assert_eq!(config.model_config.provider, ModelProvider::Ollama);
        assert_eq!(config.vector_store, VectorStore::Pg);
    }

    #[test]
    fn bad_default_is_a_configuration_error() {
        let defaults = Defaults {
            framework: Some("rails".into()),
            ..Defaults::default()
        };
        let err = build_configuration(&args("x"), &defaults, "x").unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn toml_answers_take_the_directory_name() {
        let file = answers_file(
            ".toml",
            r#"
template_type = "streaming"
framework = "fastapi"
tools = ["weather"]
data_sources = [{ type = "file", locator = "docs" }]

[model_config]
provider = "anthropic"
"#,
        );
        let mut a = args("support-bot");
        a.answers = Some(file.path().to_path_buf());

        let config = build_configuration(&a, &Defaults::default(), "support-bot").unwrap();
        assert_eq!(config.app_name, "support-bot");
        assert!(config.tools.contains(&Tool::Weather));
        assert_eq!(config.data_sources, vec![DataSource::new(DataSourceKind::File, "docs")]);
        assert_eq!(config.model_config.model, "claude-3-5-sonnet");
    }

    #[test]
    fn json_answers_keep_their_app_name_and_flags_override() {
        let file = answers_file(
            ".json",
            r#"{"app_name":"Named","template_type":"streaming","framework":"express",
                "fullstack":true,"model_config":{"provider":"openai","model":"gpt-4o"}}"#,
        );
        let mut a = args("dir-name");
        a.answers = Some(file.path().to_path_buf());
        a.observability = Some(Observability::Traceloop);
        a.port = Some(9000);

        let config = build_configuration(&a, &Defaults::default(), "dir-name").unwrap();
        assert_eq!(config.app_name, "Named");
        assert!(config.is_fullstack);
        assert_eq!(config.model_config.model, "gpt-4o");
        assert_eq!(config.observability, Observability::Traceloop);
        assert_eq!(config.external_port, Some(9000));
    }

    #[test]
    fn malformed_answers_are_reported() {
        let file = answers_file(".toml", "framework = \"fastapi\"\n");
        let mut a = args("x");
        a.answers = Some(file.path().to_path_buf());

        let err = build_configuration(&a, &Defaults::default(), "x").unwrap_err();
        assert!(matches!(err, CliError::AnswersFile { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn provider_flag_resets_models_then_model_flags_apply() {
        let mut a = args("x");
        a.provider = Some(ModelProvider::Ollama);
        a.embedding_model = Some("mxbai-embed-large".into());
        a.embedding_dim = Some(1024);

        let config = build_configuration(&a, &Defaults::default(), "x").unwrap();
        assert_eq!(config.model_config.model, "llama3.1");
        assert_eq!(config.model_config.embedding_model, "mxbai-embed-large");
        assert_eq!(config.model_config.dimensions, 1024);
    }
}
