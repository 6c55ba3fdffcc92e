pub mod common;
pub mod configuration;
pub mod env_file;
pub mod fragment;
pub mod plan;
pub mod substitution;

pub use crate::domain::error::FragmentError;
pub use common::RelativePath;
pub use configuration::{AppConfiguration, ValidatedConfiguration};
pub use fragment::{Fragment, FragmentKey};
pub use plan::CompositionPlan;
