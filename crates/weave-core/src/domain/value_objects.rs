//! Domain value objects: one closed enum per configuration axis.
//!
//! # Design
//!
//! These are pure value types: `Copy`, equality-by-value, no identity.
//! They hold NO compatibility logic. All compatibility rules live in
//! `constraints.rs`. This file's only job is to define the types, their
//! string representations, and their `FromStr` parsers.
//!
//! # Adding New Variants
//!
//! 1. Add the variant (and its string form) to the `axis_enum!` block here
//! 2. Add a row for it in `constraints.rs`
//! 3. Add its fragment directory under `fragments/`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::{Axis, ConfigurationError};

/// Declares a closed axis enum with its canonical string form, accepted
/// aliases, `Display`, `FromStr` and string-based serde.
///
/// Deserialisation goes through `FromStr`, so an unknown value in an
/// answers file produces the same `UnknownVariant` message as a bad flag.
macro_rules! axis_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $axis:path {
            $( $(#[$vmeta:meta])* $variant:ident => $canonical:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $canonical, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ConfigurationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $( $canonical $(| $alias)* => Ok(Self::$variant), )+
                    _ => Err(ConfigurationError::unknown($axis, s)),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = ConfigurationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for &'static str {
            fn from(value: $name) -> Self {
                value.as_str()
            }
        }
    };
}

// ── Application shape ────────────────────────────────────────────────────────

axis_enum! {
    /// The kind of application to generate.
    pub enum TemplateType: Axis::TemplateType {
        /// Chat application streaming answers over a RAG engine.
        Streaming => "streaming",
        /// Several cooperating agents behind one chat endpoint.
        Multiagent => "multiagent" | "multi-agent",
        /// Structured extraction into a typed schema.
        Structured => "structured" | "extractor",
    }
}

axis_enum! {
    /// The framework the (backend) application is written in.
    pub enum Framework: Axis::Framework {
        FastApi => "fastapi",
        Express => "express",
        NextJs => "nextjs" | "next",
    }
}

impl Framework {
    /// The language the framework's fragments are written in.
    pub const fn language(&self) -> Language {
        match self {
            Self::FastApi => Language::Python,
            Self::Express | Self::NextJs => Language::TypeScript,
        }
    }
}

axis_enum! {
    /// Chat UI flavour for a Next.js surface.
    pub enum Ui: Axis::Ui {
        Shadcn => "shadcn",
        Html => "html",
    }
}

impl Default for Ui {
    fn default() -> Self {
        Self::Shadcn
    }
}

// ── Data plane ───────────────────────────────────────────────────────────────

axis_enum! {
    /// Where embeddings are stored. `None` is a valid, explicit choice.
    pub enum VectorStore: Axis::VectorStore {
        None => "none",
        Chroma => "chroma",
        Pg => "pg" | "postgres" | "pgvector",
        Pinecone => "pinecone",
        Qdrant => "qdrant",
        LlamaCloud => "llamacloud",
    }
}

impl Default for VectorStore {
    fn default() -> Self {
        Self::None
    }
}

axis_enum! {
    /// The kind of a data source feeding the index.
    pub enum DataSourceKind: Axis::DataSource {
        File => "file",
        Web => "web",
        Db => "db" | "database",
    }
}

axis_enum! {
    /// A tool the agent can call.
    pub enum Tool: Axis::Tool {
        Weather => "weather",
        Wikipedia => "wikipedia" | "wikipedia.wikipediatoolspec",
        Interpreter => "interpreter" | "code-interpreter",
        DuckDuckGo => "duckduckgo" | "duckduckgo-search",
    }
}

axis_enum! {
    /// Provider of the chat and embedding models.
    pub enum ModelProvider: Axis::ModelProvider {
        OpenAi => "openai",
        Anthropic => "anthropic",
        Ollama => "ollama",
    }
}

// ── Surroundings ─────────────────────────────────────────────────────────────

axis_enum! {
    /// Tracing backend wired into the generated application.
    pub enum Observability: Axis::Observability {
        None => "none",
        Traceloop => "traceloop",
        LlamaTrace => "llamatrace",
    }
}

impl Default for Observability {
    fn default() -> Self {
        Self::None
    }
}

axis_enum! {
    /// Prebuilt multi-agent topologies.
    pub enum AgentTopology: Axis::Agents {
        Blog => "blog",
        FinancialReport => "financial-report" | "financial_report",
    }
}

axis_enum! {
    /// What the excluded installer/runner should do after generation.
    pub enum PostInstallAction: Axis::PostInstallAction {
        None => "none",
        Dependencies => "dependencies",
        RunApp => "run-app" | "runapp",
    }
}

impl Default for PostInstallAction {
    fn default() -> Self {
        Self::Dependencies
    }
}

// ── Composition-internal ─────────────────────────────────────────────────────

axis_enum! {
    /// Which sub-project a composition targets.
    pub enum Role: Axis::Role {
        Backend => "backend",
        Frontend => "frontend",
    }
}

axis_enum! {
    /// Fragment flavour. Derived from the framework, never chosen directly.
    pub enum Language: Axis::Language {
        Python => "python" | "py",
        TypeScript => "typescript" | "ts",
    }
}
