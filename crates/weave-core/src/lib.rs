//! Weave Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for Weave, a
//! configuration-driven project generator that composes a project from
//! reusable fragments.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            weave-cli (CLI)              │
//! │     (Implements Driving Ports)          │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │ (GenerationService, Resolver, Composer, │
//! │          SplitOrchestrator)             │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │ (FragmentLibrary, Filesystem, Manifest) │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │     weave-adapters (Infrastructure)     │
//! │ (FragmentLoader, LocalFilesystem, etc)  │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Domain Layer (Pure Logic)       │
//! │ (AppConfiguration, Fragment, Plan,      │
//! │          ConstraintTable)               │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use weave_core::prelude::*;
//!
//! let config = AppConfiguration::builder()
//!     .app_name("my-app")
//!     .template_type(TemplateType::Streaming)
//!     .framework(Framework::FastApi)
//!     .model_config(ModelConfig::defaults_for(ModelProvider::OpenAi))
//!     .build()?;
//!
//! // The context is wired with adapters by the caller.
//! let summary = GenerationService::new(ctx).generate(config, "./my-app".as_ref())?;
//! ```

pub mod domain;

pub mod application;

pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        EngineContext, GenerationPlan, GenerationService, GenerationSummary,
        ports::{Filesystem, FragmentLibrary, ManifestEditor},
    };
    pub use crate::domain::{
        AppConfiguration, AppConfigurationBuilder, ConstraintTable, DataSource, DataSourceKind,
        Framework, ModelConfig, ModelProvider, Observability, PostInstallAction, TemplateType,
        Tool, Ui, ValidatedConfiguration, VectorStore,
    };
    pub use crate::error::{WeaveError, WeaveResult};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
