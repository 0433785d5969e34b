//! Aggregate repositories
//!
//! Ports live in [`traits`]; [`memory`] is the reference implementation used by
//! the CLI simulation and the tests.

pub mod memory;
pub mod traits;

pub use memory::MemoryRepository;
pub use traits::{
    ExportRepository, ImportRepository, LegacyProjectImportRepository, RepositoryResult,
};
