//! Output management and formatting.

use std::io;
use std::path::Path;

use console::Term;
use owo_colors::OwoColorize;
use serde::Serialize;

use weave_core::application::GenerationSummary;
use weave_core::domain::{Observability, PostInstallAction};

use crate::cli::global::GlobalArgs;
use crate::config::AppConfig;

/// Manages CLI output based on configuration.
pub struct OutputManager {
    quiet: bool,
    no_color: bool,
    term: Term,
}

impl OutputManager {
    /// Build an `OutputManager` from parsed CLI flags and loaded config.
    pub fn new(args: &GlobalArgs, config: &AppConfig) -> Self {
        Self {
            quiet: args.quiet,
            no_color: args.no_color || config.output.no_color,
            term: Term::stdout(),
        }
    }

    // ── Public write methods ───────────────────────────────────────────────

    /// Generic message; suppressed in quiet mode.
    pub fn print(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.term.write_line(msg)
    }

    /// Pretty JSON on stdout. Printed in quiet mode too: it is the
    /// command's result, not decoration.
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> io::Result<()> {
        let text = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        self.term.write_line(&text)
    }

    /// Success indicator: `✓ <msg>`.
    pub fn success(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{2713} {msg}")
        } else {
            format!("{} {}", "\u{2713}".green().bold(), msg.green())
        };
        self.term.write_line(&line)
    }

    /// Warning indicator: `⚠ <msg>`.
    pub fn warning(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{26a0} {msg}")
        } else {
            format!("{} {}", "\u{26a0}".yellow().bold(), msg.yellow())
        };
        self.term.write_line(&line)
    }

    /// Informational indicator: `ℹ <msg>`.
    pub fn info(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{2139} {msg}")
        } else {
            format!("{} {}", "\u{2139}".blue().bold(), msg.blue())
        };
        self.term.write_line(&line)
    }

    /// Bold cyan header line.
    pub fn header(&self, text: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            text.to_owned()
        } else {
            text.cyan().bold().to_string()
        };
        self.term.write_line(&line)
    }

    /// Post-generation report for a project written to `root`.
    pub fn summary(&self, summary: &GenerationSummary, root: &Path) -> io::Result<()> {
        for line in summary_lines(summary, root) {
            match line {
                Line::Success(msg) => self.success(&msg)?,
                Line::Plain(msg) => self.print(&msg)?,
                Line::Warning(msg) => self.warning(&msg)?,
                Line::Info(msg) => self.info(&msg)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Line {
    Success(String),
    Plain(String),
    Warning(String),
    Info(String),
}

fn summary_lines(summary: &GenerationSummary, root: &Path) -> Vec<Line> {
    let mut lines = vec![Line::Success(format!(
        "Created project at {}",
        root.display()
    ))];
    for path in &summary.generated_paths {
        lines.push(Line::Plain(format!("  {path}")));
    }

    if summary.requires_external_config {
        let file = summary.config_file.as_deref().unwrap_or("config/tools");
        lines.push(Line::Warning(format!(
            "Review {file} before running the app: some tools need settings"
        )));
    }

    match summary.observability {
        Observability::None => {}
        Observability::Traceloop => lines.push(Line::Info(
            "Tracing is enabled with Traceloop: set TRACELOOP_API_KEY".into(),
        )),
        Observability::LlamaTrace => lines.push(Line::Info(
            "Tracing is enabled with LlamaTrace: set PHOENIX_API_KEY".into(),
        )),
    }

    if summary.has_file_data_source {
        let data = if summary.fullstack { "backend/data" } else { "data" };
        lines.push(Line::Info(format!(
            "Put your documents in the {data} folder before indexing"
        )));
    }

    if !summary.required_env.is_empty() {
        let env = if summary.fullstack { "backend/.env" } else { ".env" };
        lines.push(Line::Warning(format!(
            "Fill in {env}: {}",
            summary.required_env.join(", ")
        )));
    }

    lines.push(Line::Info(format!("Backend port: {}", summary.backend_port)));
    if let Some(port) = summary.frontend_port {
        lines.push(Line::Info(format!("Frontend port: {port}")));
    }
    if let Some(api) = &summary.custom_api_path {
        lines.push(Line::Info(format!("Frontend chat API: {api}")));
    }

    match summary.post_install_action {
        PostInstallAction::None => {}
        PostInstallAction::Dependencies => lines.push(Line::Plain(
            "Next: install dependencies with your package manager".into(),
        )),
        PostInstallAction::RunApp => lines.push(Line::Plain(
            "Next: install dependencies, then start the app".into(),
        )),
    }

    lines
}

// ── tests ─────────────────────────────────────────────────────────────────────
