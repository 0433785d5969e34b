//! Domain error types
//!
//! This module defines the error hierarchy for clonework. Errors raised inside a
//! command handler never escape it: they are logged and replaced by the matching
//! `Mark*AsFailed` command. The types here are what the aggregates, ports and
//! adapters return before that substitution happens.

use crate::domain::ids::ComponentId;
use crate::domain::piece::ResourceKind;
use thiserror::Error;

/// Main clonework error type
///
/// This is the primary error type used throughout the library.
#[derive(Debug, Error)]
pub enum CloneError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Repository errors (aggregate missing, save failed)
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Aggregate rule violations
    #[error("Aggregate error: {0}")]
    Aggregate(#[from] AggregateError),

    /// The resource kind has no mapping for the requested operation yet
    #[error("Unsupported resource kind: {0}")]
    UnsupportedResourceKind(ResourceKind),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// A piece processor failed or was not registered
    #[error("Piece processor error: {0}")]
    Processor(String),

    /// File repository errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Job queue errors
    #[error("Queue error: {0}")]
    Queue(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Repository port errors
///
/// Adapters translate their own storage errors into these two cases so the
/// handlers never see third-party types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// No aggregate is stored under the given key
    #[error("Aggregate not found: {0}")]
    NotFound(String),

    /// The aggregate could not be persisted; nothing was written
    #[error("Failed to persist aggregate: {0}")]
    PersistenceFailure(String),
}

/// Errors raised by aggregate operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// The referenced piece does not belong to the aggregate
    #[error("Piece not found: {0}")]
    PieceNotFound(ComponentId),

    /// Two pieces share the same id
    #[error("Duplicate piece id: {0}")]
    DuplicatePiece(ComponentId),

    /// The aggregate has no pieces to process
    #[error("Aggregate has no pieces")]
    NoPieces,

    /// Files can no longer be added to a legacy project import
    #[error("Legacy project import is not accepting files")]
    NotAcceptingFiles,

    /// A legacy project import was run without its mandatory files
    #[error("Missing required files: {}", .0.join(", "))]
    MissingRequiredFiles(Vec<String>),

    /// A cloning import must reference the export it was produced from
    #[error("Cloning import has no source export")]
    MissingSourceExport,

    /// An aggregate is already stored under the requested id
    #[error("Already started: {0}")]
    AlreadyStarted(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for CloneError {
    fn from(err: std::io::Error) -> Self {
        CloneError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for CloneError {
    fn from(err: serde_json::Error) -> Self {
        CloneError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for CloneError {
    fn from(err: toml::de::Error) -> Self {
        CloneError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_error_display() {
        let err = CloneError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_repository_error_conversion() {
        let err: CloneError = RepositoryError::NotFound("import-1".to_string()).into();
        assert!(matches!(
            err,
            CloneError::Repository(RepositoryError::NotFound(_))
        ));
    }

    #[test]
    fn test_aggregate_error_conversion() {
        let id = ComponentId::new();
        let err: CloneError = AggregateError::PieceNotFound(id).into();
        assert!(matches!(
            err,
            CloneError::Aggregate(AggregateError::PieceNotFound(found)) if found == id
        ));
    }

    #[test]
    fn test_missing_required_files_message() {
        let err = AggregateError::MissingRequiredFiles(vec![
            "pu.dat".to_string(),
            "spec.dat".to_string(),
        ]);
        assert_eq!(err.to_string(), "Missing required files: pu.dat, spec.dat");
    }

    #[test]
    fn test_already_started_message() {
        let err: CloneError = AggregateError::AlreadyStarted("export-1".to_string()).into();
        assert_eq!(err.to_string(), "Aggregate error: Already started: export-1");
    }

    #[test]
    fn test_unsupported_resource_kind_display() {
        let err = CloneError::UnsupportedResourceKind(ResourceKind::Scenario);
        assert_eq!(err.to_string(), "Unsupported resource kind: scenario");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: CloneError = io_err.into();
        assert!(matches!(err, CloneError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: CloneError = json_err.into();
        assert!(matches!(err, CloneError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: CloneError = toml_err.into();
        assert!(matches!(err, CloneError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }
}
