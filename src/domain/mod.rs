//! Domain models and types for clonework.
//!
//! The domain layer holds the vocabulary shared by the aggregates, handlers and
//! adapters:
//! - **Identifiers** ([`ResourceId`], [`ExportId`], [`ImportId`], [`ComponentId`], [`UserId`])
//! - **Piece kinds** ([`ClonePiece`], [`LegacyProjectImportPiece`]) and [`ResourceKind`]
//! - **Piece snapshots** ([`PieceComponent`], [`ComponentLocation`])
//! - **Messages** ([`DomainEvent`], [`Command`])
//! - **Errors** ([`CloneError`], [`RepositoryError`], [`AggregateError`]) and [`Result`]
//!
//! # Type Safety
//!
//! Identifiers are UUID newtypes, so keys of different aggregates cannot be mixed:
//!
//! ```rust
//! use clonework::domain::{ExportId, ImportId};
//!
//! let export_id = ExportId::new();
//! let import_id = ImportId::new();
//!
//! // This won't compile - an export id is not an import id
//! // let wrong: ImportId = export_id;
//! # let _ = (export_id, import_id);
//! ```

pub mod commands;
pub mod component;
pub mod errors;
pub mod events;
pub mod ids;
pub mod legacy;
pub mod piece;
pub mod result;

// Re-export commonly used types for convenience
pub use commands::Command;
pub use component::{ComponentLocation, PieceComponent};
pub use errors::{AggregateError, CloneError, RepositoryError};
pub use events::DomainEvent;
pub use ids::{ComponentId, ExportId, ImportId, ResourceId, UserId};
pub use legacy::{LegacyProjectImportFile, LegacyProjectImportFileType};
pub use piece::{ClonePiece, ComponentStatus, LegacyProjectImportPiece, ResourceKind};
pub use result::Result;
