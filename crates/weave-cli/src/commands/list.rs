//! Implementation of the `weave list` command.
//!
//! Prints every variant of one or all axes, with whether the fragment
//! library can generate it.

use serde::Serialize;
use tracing::warn;

use weave_adapters::InMemoryLibrary;
use weave_core::{
    application::ports::FragmentLibrary,
    domain::{
        AgentTopology, Category, DataSourceKind, Framework, ModelProvider, Observability,
        TemplateType, Tool, Ui, VectorStore,
    },
};

use crate::{
    cli::{ListArgs, ListAxis, ListFormat},
    commands::load_library,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

const AXES: &[ListAxis] = &[
    ListAxis::Template,
    ListAxis::Framework,
    ListAxis::Ui,
    ListAxis::VectorStore,
    ListAxis::DataSource,
    ListAxis::Tool,
    ListAxis::Provider,
    ListAxis::Observability,
    ListAxis::Agents,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Entry {
    axis: &'static str,
    variant: &'static str,
    /// A fragment exists for the variant (variants that add nothing, like
    /// `none`, count as available).
    available: bool,
}

pub fn execute(args: ListArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let library = match load_library(&config) {
        Ok(library) => library,
        Err(CliError::LibraryNotFound) => {
            warn!("no fragment library found; every variant is listed as unavailable");
            InMemoryLibrary::default()
        }
        Err(e) => return Err(e),
    };

    let axes = match args.axis {
        Some(axis) => vec![axis],
        None => AXES.to_vec(),
    };
    let entries: Vec<Entry> = axes
        .into_iter()
        .flat_map(|axis| entries_for(axis, &library))
        .collect();

    match args.format {
        ListFormat::Table => {
            let mut current = "";
            for entry in &entries {
                if entry.axis != current {
                    current = entry.axis;
                    output.header(&format!("{current}:"))?;
                }
                let mark = if entry.available { "" } else { "  (no fragment)" };
                output.print(&format!("  {}{mark}", entry.variant))?;
            }
        }
        ListFormat::List => {
            for entry in &entries {
                output.print(&format!("{}/{}", entry.axis, entry.variant))?;
            }
        }
        ListFormat::Json => output.json(&entries)?,
    }

    Ok(())
}

fn entries_for(axis: ListAxis, library: &dyn FragmentLibrary) -> Vec<Entry> {
    let (category, variants): (Category, Vec<&'static str>) = match axis {
        ListAxis::Template => (
            Category::Base,
            TemplateType::ALL.iter().map(|v| v.as_str()).collect(),
        ),
        ListAxis::Framework => (
            Category::Framework,
            Framework::ALL.iter().map(|v| v.as_str()).collect(),
        ),
        ListAxis::Ui => (Category::Ui, Ui::ALL.iter().map(|v| v.as_str()).collect()),
        ListAxis::VectorStore => (
            Category::VectorStore,
            VectorStore::ALL.iter().map(|v| v.as_str()).collect(),
        ),
        ListAxis::DataSource => (
            Category::DataSource,
            DataSourceKind::ALL.iter().map(|v| v.as_str()).collect(),
        ),
        ListAxis::Tool => (
            Category::Tool,
            Tool::ALL.iter().map(|v| v.as_str()).collect(),
        ),
        ListAxis::Provider => (
            Category::Provider,
            ModelProvider::ALL.iter().map(|v| v.as_str()).collect(),
        ),
        ListAxis::Observability => (
            Category::Observability,
            Observability::ALL.iter().map(|v| v.as_str()).collect(),
        ),
        ListAxis::Agents => (
            Category::Agents,
            AgentTopology::ALL.iter().map(|v| v.as_str()).collect(),
        ),
    };

    variants
        .into_iter()
        .map(|variant| Entry {
            axis: axis.as_str(),
            variant,
            available: variant == "none"
                || library.has_variant(category, variant),
        })
        .collect()
}
