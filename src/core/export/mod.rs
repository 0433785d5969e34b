//! Export aggregate

pub mod aggregate;

pub use aggregate::{Export, ExportSnapshot};
