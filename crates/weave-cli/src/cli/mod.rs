//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No business logic lives here.
//!
//! Axis values (`--framework`, `--vector-store`, ...) are parsed with the
//! core types' `FromStr`, so the accepted spellings and aliases are the ones
//! the engine itself understands.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use weave_core::domain::{
    AgentTopology, DataSource, DataSourceKind, Framework, ModelProvider, Observability,
    PostInstallAction, TemplateType, Tool, Ui, VectorStore,
};

pub mod global;
pub use global::GlobalArgs;

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "weave",
    bin_name = "weave",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "\u{26a1} Compose LLM applications from fragments",
    long_about = "Weave generates a runnable LlamaIndex application from a \
                  validated configuration: a standalone project, or a \
                  backend plus a Next.js frontend.",
    after_help = "EXAMPLES:\n\
        \x20 weave new my-chat --framework fastapi --vector-store chroma\n\
        \x20 weave new my-app  --framework express --fullstack --port 9000\n\
        \x20 weave new my-app  --answers answers.toml --dry-run\n\
        \x20 weave list tool\n\
        \x20 weave completions bash > /usr/share/bash-completion/completions/weave",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a new project.
    #[command(
        visible_alias = "n",
        about = "Generate a new project",
        after_help = "EXAMPLES:\n\
            \x20 weave new my-chat --framework fastapi --tool weather --tool wikipedia\n\
            \x20 weave new my-docs --data-source file=./docs --vector-store pg\n\
            \x20 weave new my-team --template multiagent --agents blog --framework nextjs\n\
            \x20 weave new my-app  --answers answers.toml --json"
    )]
    New(NewArgs),

    /// List the variants of one or every axis.
    #[command(
        visible_alias = "ls",
        about = "List available variants",
        after_help = "EXAMPLES:\n\
            \x20 weave list\n\
            \x20 weave list vector-store\n\
            \x20 weave list tool --format json"
    )]
    List(ListArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 weave completions bash > ~/.local/share/bash-completion/completions/weave\n\
            \x20 weave completions zsh  > ~/.zfunc/_weave\n\
            \x20 weave completions fish > ~/.config/fish/completions/weave.fish"
    )]
    Completions(CompletionsArgs),
}

// ── new ───────────────────────────────────────────────────────────────────────

/// Arguments for `weave new`.
///
/// Flags override the answers file, which overrides the user configuration
/// defaults.
#[derive(Debug, Default, Args)]
pub struct NewArgs {
    /// Destination directory. Its last component becomes the app name unless
    /// the answers file names one.
    #[arg(value_name = "PATH", help = "Destination directory (must be empty or absent)")]
    pub path: PathBuf,

    /// TOML or JSON file holding a complete set of answers.
    #[arg(long = "answers", value_name = "FILE", help = "Read answers from a TOML or JSON file")]
    pub answers: Option<PathBuf>,

    #[arg(short = 't', long = "template", value_name = "TYPE", help = "streaming, multiagent or structured")]
    pub template: Option<TemplateType>,

    #[arg(short = 'f', long = "framework", value_name = "FRAMEWORK", help = "fastapi, express or nextjs")]
    pub framework: Option<Framework>,

    #[arg(long = "ui", value_name = "UI", help = "Chat UI for a Next.js frontend")]
    pub ui: Option<Ui>,

    #[arg(long = "vector-store", value_name = "STORE", help = "Vector store (default: none)")]
    pub vector_store: Option<VectorStore>,

    /// Repeatable. `file` alone reads the `data` folder.
    #[arg(
        long = "data-source",
        value_name = "KIND[=LOCATOR]",
        value_parser = parse_data_source,
        help = "Data source, e.g. file=./docs or web=https://example.com"
    )]
    pub data_sources: Vec<DataSource>,

    #[arg(long = "tool", value_name = "TOOL", help = "Agent tool (repeatable)")]
    pub tools: Vec<Tool>,

    #[arg(short = 'p', long = "provider", value_name = "PROVIDER", help = "openai, anthropic or ollama")]
    pub provider: Option<ModelProvider>,

    #[arg(long = "model", value_name = "NAME", help = "LLM model name")]
    pub model: Option<String>,

    #[arg(long = "embedding-model", value_name = "NAME", help = "Embedding model name")]
    pub embedding_model: Option<String>,

    #[arg(
        long = "embedding-dim",
        value_name = "N",
        requires = "embedding_model",
        help = "Embedding dimensions"
    )]
    pub embedding_dim: Option<u32>,

    #[arg(long = "observability", value_name = "BACKEND", help = "traceloop or llamatrace")]
    pub observability: Option<Observability>,

    #[arg(long = "agents", value_name = "TOPOLOGY", help = "Agent topology for the multiagent template")]
    pub agents: Option<AgentTopology>,

    /// Recorded in the summary; weave never runs installers itself.
    #[arg(long = "post-install", value_name = "ACTION", help = "none, dependencies or run-app")]
    pub post_install: Option<PostInstallAction>,

    #[arg(long = "llama-parse", help = "Parse local files with LlamaParse")]
    pub llama_parse: bool,

    #[arg(long = "fullstack", help = "Generate a backend and a Next.js frontend")]
    pub fullstack: bool,

    #[arg(long = "port", value_name = "PORT", help = "Port the backend listens on")]
    pub port: Option<u32>,

    /// Preview what would be created without writing any files.
    #[arg(long = "dry-run", help = "Show the composition plan without writing")]
    pub dry_run: bool,

    #[arg(long = "json", help = "Print the summary (or plan) as JSON")]
    pub json: bool,
}

/// `kind` or `kind=locator`.
pub fn parse_data_source(raw: &str) -> Result<DataSource, String> {
    let (kind, locator) = raw.split_once('=').unwrap_or((raw, ""));
    let kind: DataSourceKind = kind.trim().parse().map_err(|e| format!("{e}"))?;
    Ok(DataSource::new(kind, locator.trim()))
}

// ── list ──────────────────────────────────────────────────────────────────────

/// Arguments for `weave list`.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Axis to list; every axis when omitted.
    #[arg(value_enum, help = "Axis to list")]
    pub axis: Option<ListAxis>,

    /// Output format.
    #[arg(
        long = "format",
        value_enum,
        default_value = "table",
        help = "Output format"
    )]
    pub format: ListFormat,
}

/// Axes `weave list` knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListAxis {
    Template,
    Framework,
    Ui,
    VectorStore,
    DataSource,
    Tool,
    Provider,
    Observability,
    Agents,
}

impl ListAxis {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Framework => "framework",
            Self::Ui => "ui",
            Self::VectorStore => "vector-store",
            Self::DataSource => "data-source",
            Self::Tool => "tool",
            Self::Provider => "provider",
            Self::Observability => "observability",
            Self::Agents => "agents",
        }
    }
}

impl std::fmt::Display for ListAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format for the `list` command.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ListFormat {
    /// Human-readable table.
    Table,
    /// One `axis/variant` per line.
    List,
    /// JSON array.
    Json,
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `weave completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_new_command() {
        let cli = Cli::parse_from([
            "weave",
            "new",
            "my-chat",
            "--framework",
            "express",
            "--vector-store",
            "postgres",
            "--tool",
            "weather",
            "--tool",
            "duckduckgo",
        ]);
        let Commands::New(args) = cli.command else {
            panic!("expected New command");
        };
        assert_eq!(args.framework, Some(Framework::Express));
        assert_eq!(args.vector_store, Some(VectorStore::Pg));
        assert_eq!(args.tools, vec![Tool::Weather, Tool::DuckDuckGo]);
        assert!(!args.fullstack);
    }

    #[test]
    fn axis_aliases_are_accepted() {
        let cli = Cli::parse_from(["weave", "new", "x", "-f", "next", "-t", "multi-agent"]);
        let Commands::New(args) = cli.command else {
            panic!("expected New command");
        };
        assert_eq!(args.framework, Some(Framework::NextJs));
        assert_eq!(args.template, Some(TemplateType::Multiagent));
    }

    #[test]
    fn unknown_variant_is_a_parse_error() {
        let result = Cli::try_parse_from(["weave", "new", "x", "--framework", "django"]);
        assert!(result.is_err());
    }

    #[test]
    fn data_source_flag() {
        let file = parse_data_source("file").unwrap();
        assert_eq!(file.kind, DataSourceKind::File);
        assert_eq!(file.locator, "");

        let web = parse_data_source("web=https://example.com/docs?a=b").unwrap();
        assert_eq!(web.kind, DataSourceKind::Web);
        assert_eq!(web.locator, "https://example.com/docs?a=b");

        assert!(parse_data_source("ftp=x").is_err());
    }

    #[test]
    fn embedding_dim_requires_model() {
        let result = Cli::try_parse_from(["weave", "new", "x", "--embedding-dim", "512"]);
        assert!(result.is_err());
    }

    #[test]
    fn list_axis_is_optional() {
        let cli = Cli::parse_from(["weave", "list"]);
        assert!(matches!(cli.command, Commands::List(ListArgs { axis: None, .. })));

        let cli = Cli::parse_from(["weave", "ls", "vector-store"]);
        assert!(matches!(
            cli.command,
            Commands::List(ListArgs {
                axis: Some(ListAxis::VectorStore),
                ..
            })
        ));
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        let result = Cli::try_parse_from(["weave", "--quiet", "--verbose", "list"]);
        assert!(result.is_err());
    }

    #[test]
    fn no_color_is_a_plain_switch() {
        let cli = Cli::try_parse_from(["weave", "--no-color", "list"]).unwrap();
        assert!(cli.global.no_color);
        assert!(matches!(cli.command, Commands::List(_)));
    }
}
