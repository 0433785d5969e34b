//! Legacy project import aggregate

pub mod aggregate;

pub use aggregate::{LegacyProjectImport, LegacyProjectImportSnapshot};
