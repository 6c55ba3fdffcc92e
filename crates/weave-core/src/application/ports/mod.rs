//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `weave-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `Filesystem`: destination tree writes
//!   - `FragmentLibrary`: read-only fragment catalog
//!   - `ManifestEditor`: `package.json` / `pyproject.toml` / config documents
//!
//! - **Driving (Input) Ports**: Called by external world, implemented by application
//!   - `GenerationService` (used by the CLI)

pub mod output;

pub use output::{Filesystem, FragmentLibrary, ManifestEditor};

#[cfg(test)]
pub use output::MockFilesystem;
