//! Fragment library adapters.

mod memory;

pub use memory::InMemoryLibrary;
