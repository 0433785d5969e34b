//! In-memory repository
//!
//! Stores every aggregate as a serialized snapshot, so a save replaces the whole
//! aggregate in one step and a later mutation of the caller's copy can never
//! leak into the store. Saves can be made to fail on demand.

use super::traits::{
    ExportRepository, ImportRepository, LegacyProjectImportRepository, RepositoryResult,
};
use crate::core::export::{Export, ExportSnapshot};
use crate::core::import::{Import, ImportSnapshot};
use crate::core::legacy::{LegacyProjectImport, LegacyProjectImportSnapshot};
use crate::domain::errors::RepositoryError;
use crate::domain::ids::{ExportId, ImportId, ResourceId};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct SnapshotStore {
    entries: RwLock<HashMap<String, String>>,
}

impl SnapshotStore {
    async fn put<S: Serialize>(&self, key: String, snapshot: &S) -> RepositoryResult<()> {
        let json = serde_json::to_string(snapshot)
            .map_err(|e| RepositoryError::PersistenceFailure(e.to_string()))?;
        self.entries.write().await.insert(key, json);
        Ok(())
    }

    async fn get<S: DeserializeOwned>(&self, key: &str) -> RepositoryResult<S> {
        let entries = self.entries.read().await;
        let json = entries
            .get(key)
            .ok_or_else(|| RepositoryError::NotFound(key.to_string()))?;
        serde_json::from_str(json).map_err(|e| {
            RepositoryError::PersistenceFailure(format!("corrupt snapshot {key}: {e}"))
        })
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// In-memory store for exports, imports and legacy imports
#[derive(Default)]
pub struct MemoryRepository {
    exports: SnapshotStore,
    imports: SnapshotStore,
    legacy_imports: SnapshotStore,
    save_failure: AtomicBool,
}

impl MemoryRepository {
    /// Creates an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following save fail with a persistence failure
    pub fn set_save_failure(&self, fail: bool) {
        self.save_failure.store(fail, Ordering::SeqCst);
    }

    /// Number of stored exports
    pub async fn export_count(&self) -> usize {
        self.exports.len().await
    }

    /// Number of stored imports
    pub async fn import_count(&self) -> usize {
        self.imports.len().await
    }

    fn check_save(&self, key: &str) -> RepositoryResult<()> {
        if self.save_failure.load(Ordering::SeqCst) {
            tracing::debug!(key = %key, "Injected save failure");
            return Err(RepositoryError::PersistenceFailure(format!(
                "save of {key} rejected"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ExportRepository for MemoryRepository {
    async fn save(&self, export: &Export) -> RepositoryResult<()> {
        let key = export.id().to_string();
        self.check_save(&key)?;
        self.exports.put(key, &export.to_snapshot()).await
    }

    async fn find(&self, export_id: ExportId) -> RepositoryResult<Export> {
        let snapshot: ExportSnapshot = self.exports.get(&export_id.to_string()).await?;
        Export::from_snapshot(snapshot)
            .map_err(|e| RepositoryError::PersistenceFailure(e.to_string()))
    }
}

#[async_trait]
impl ImportRepository for MemoryRepository {
    async fn save(&self, import: &Import) -> RepositoryResult<()> {
        let key = import.id().to_string();
        self.check_save(&key)?;
        self.imports.put(key, &import.to_snapshot()).await
    }

    async fn find(&self, import_id: ImportId) -> RepositoryResult<Import> {
        let snapshot: ImportSnapshot = self.imports.get(&import_id.to_string()).await?;
        Import::from_snapshot(snapshot)
            .map_err(|e| RepositoryError::PersistenceFailure(e.to_string()))
    }
}

#[async_trait]
impl LegacyProjectImportRepository for MemoryRepository {
    async fn save(&self, import: &LegacyProjectImport) -> RepositoryResult<()> {
        let key = import.project_id().to_string();
        self.check_save(&key)?;
        self.legacy_imports.put(key, &import.to_snapshot()).await
    }

    async fn find(&self, project_id: ResourceId) -> RepositoryResult<LegacyProjectImport> {
        let snapshot: LegacyProjectImportSnapshot =
            self.legacy_imports.get(&project_id.to_string()).await?;
        LegacyProjectImport::from_snapshot(snapshot)
            .map_err(|e| RepositoryError::PersistenceFailure(e.to_string()))
    }
}
