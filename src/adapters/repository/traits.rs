//! Repository ports
//!
//! One repository per aggregate. `save` is atomic: either the whole aggregate
//! (every piece mutation included) is stored, or nothing is.

use crate::core::export::Export;
use crate::core::import::Import;
use crate::core::legacy::LegacyProjectImport;
use crate::domain::errors::RepositoryError;
use crate::domain::ids::{ExportId, ImportId, ResourceId};
use async_trait::async_trait;

/// Result type returned by repository ports
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Storage for [`Export`] aggregates, keyed by export id
#[async_trait]
pub trait ExportRepository: Send + Sync {
    /// Persist the export, replacing any previous version
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::PersistenceFailure`] if nothing was written.
    async fn save(&self, export: &Export) -> RepositoryResult<()>;

    /// Load an export
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if no export has the given id.
    async fn find(&self, export_id: ExportId) -> RepositoryResult<Export>;
}

/// Storage for [`Import`] aggregates, keyed by import id
#[async_trait]
pub trait ImportRepository: Send + Sync {
    /// Persist the import, replacing any previous version
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::PersistenceFailure`] if nothing was written.
    async fn save(&self, import: &Import) -> RepositoryResult<()>;

    /// Load an import
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if no import has the given id.
    async fn find(&self, import_id: ImportId) -> RepositoryResult<Import>;
}

/// Storage for [`LegacyProjectImport`] aggregates, keyed by project id
#[async_trait]
pub trait LegacyProjectImportRepository: Send + Sync {
    /// Persist the legacy import, replacing any previous version
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::PersistenceFailure`] if nothing was written.
    async fn save(&self, import: &LegacyProjectImport) -> RepositoryResult<()>;

    /// Load the legacy import of a project
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if the project has no legacy import.
    async fn find(&self, project_id: ResourceId) -> RepositoryResult<LegacyProjectImport>;
}
