//! Import aggregate

pub mod aggregate;

pub use aggregate::{Import, ImportSnapshot};
