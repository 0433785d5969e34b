//! Legacy project import command handlers

use super::{ensure_absent, CommandHandlers, Outcome};
use crate::adapters::api_events::ApiEventKind;
use crate::core::legacy::LegacyProjectImport;
use crate::domain::commands::{
    AddFileToLegacyProjectImport, CompleteLegacyProjectImportPiece,
    MarkLegacyProjectImportAsFailed, MarkLegacyProjectImportPieceAsFailed,
    RunLegacyProjectImport, StartLegacyProjectImport,
};
use crate::domain::events::DomainEvent;
use crate::domain::ids::{ComponentId, ResourceId};
use crate::domain::legacy::LegacyProjectImportFile;
use crate::domain::{CloneError, Result};
use crate::{log_error_with_context, log_failure_substitution};
use serde_json::json;

impl CommandHandlers {
    pub(super) async fn start_legacy_project_import(
        &self,
        command: StartLegacyProjectImport,
    ) -> Outcome {
        let project_id = command.project_id;
        let import =
            LegacyProjectImport::start(project_id, command.scenario_id, command.owner_id);

        let _guard = self.locks.acquire(&project_id.to_string()).await;
        match self.store_legacy_start(&import).await {
            Ok(()) => {
                tracing::info!(project_id = %project_id, "Legacy project import started");
                Outcome::empty()
            }
            // A second start leaves the existing import untouched
            Err(error) => legacy_outcome("StartLegacyProjectImport", project_id, error),
        }
    }

    async fn store_legacy_start(&self, import: &LegacyProjectImport) -> Result<()> {
        let project_id = import.project_id();
        ensure_absent(project_id, self.legacy_imports.find(project_id).await)?;
        self.legacy_imports.save(import).await?;
        Ok(())
    }

    pub(super) async fn add_file_to_legacy_project_import(
        &self,
        command: AddFileToLegacyProjectImport,
    ) -> Outcome {
        let AddFileToLegacyProjectImport { project_id, file } = command;
        let file_type = file.file_type;

        let _guard = self.locks.acquire(&project_id.to_string()).await;
        match self.store_legacy_file(project_id, file).await {
            Ok(()) => {
                tracing::info!(project_id = %project_id, file = %file_type, "Legacy file added");
                Outcome::empty()
            }
            Err(error) => legacy_outcome("AddFileToLegacyProjectImport", project_id, error),
        }
    }

    async fn store_legacy_file(
        &self,
        project_id: ResourceId,
        file: LegacyProjectImportFile,
    ) -> Result<()> {
        let import = self.legacy_imports.find(project_id).await?.add_file(file)?;
        self.legacy_imports.save(&import).await?;
        Ok(())
    }

    pub(super) async fn run_legacy_project_import(
        &self,
        command: RunLegacyProjectImport,
    ) -> Outcome {
        let project_id = command.project_id;

        let _guard = self.locks.acquire(&project_id.to_string()).await;
        match self.store_legacy_run(project_id).await {
            Ok(events) => {
                tracing::info!(
                    project_id = %project_id,
                    requested = events.iter().filter(|e| e.is_piece_request()).count(),
                    "Legacy project import running"
                );
                Outcome::events(events)
            }
            Err(error) => legacy_outcome("RunLegacyProjectImport", project_id, error),
        }
    }

    async fn store_legacy_run(&self, project_id: ResourceId) -> Result<Vec<DomainEvent>> {
        let (import, events) = self.legacy_imports.find(project_id).await?.run()?;
        self.legacy_imports.save(&import).await?;
        Ok(events)
    }

    pub(super) async fn complete_legacy_project_import_piece(
        &self,
        command: CompleteLegacyProjectImportPiece,
    ) -> Outcome {
        let CompleteLegacyProjectImportPiece {
            project_id,
            component_id,
            warnings,
        } = command;

        let _guard = self.locks.acquire(&project_id.to_string()).await;
        match self
            .store_legacy_completion(project_id, component_id, warnings)
            .await
        {
            Ok(events) => {
                tracing::info!(
                    project_id = %project_id,
                    component_id = %component_id,
                    duplicate = events.is_empty(),
                    "Legacy piece completed"
                );
                Outcome::events(events)
            }
            Err(error) => legacy_failure("CompleteLegacyProjectImportPiece", project_id, error),
        }
    }

    async fn store_legacy_completion(
        &self,
        project_id: ResourceId,
        component_id: ComponentId,
        warnings: Vec<String>,
    ) -> Result<Vec<DomainEvent>> {
        let import = self.legacy_imports.find(project_id).await?;
        let (next, events) = import.complete_piece(component_id, warnings)?;
        if !events.is_empty() {
            self.legacy_imports.save(&next).await?;
        }
        Ok(events)
    }

    pub(super) async fn mark_legacy_project_import_piece_as_failed(
        &self,
        command: MarkLegacyProjectImportPieceAsFailed,
    ) -> Outcome {
        let MarkLegacyProjectImportPieceAsFailed {
            project_id,
            component_id,
            errors,
        } = command;
        let reason = errors.join("; ");

        let _guard = self.locks.acquire(&project_id.to_string()).await;
        match self
            .store_legacy_piece_failure(project_id, component_id, errors)
            .await
        {
            Ok(false) => Outcome::empty(),
            Ok(true) => {
                tracing::warn!(
                    project_id = %project_id,
                    component_id = %component_id,
                    reason = %reason,
                    "Legacy piece failed"
                );
                Outcome::command(MarkLegacyProjectImportAsFailed { project_id, reason })
            }
            Err(error) => legacy_failure("MarkLegacyProjectImportPieceAsFailed", project_id, error),
        }
    }

    async fn store_legacy_piece_failure(
        &self,
        project_id: ResourceId,
        component_id: ComponentId,
        errors: Vec<String>,
    ) -> Result<bool> {
        let import = self.legacy_imports.find(project_id).await?;
        let (next, changed) = import.fail_piece(component_id, errors)?;
        if changed {
            self.legacy_imports.save(&next).await?;
        }
        Ok(changed)
    }

    pub(super) async fn mark_legacy_project_import_as_failed(
        &self,
        command: MarkLegacyProjectImportAsFailed,
    ) -> Outcome {
        let MarkLegacyProjectImportAsFailed { project_id, reason } = command;

        self.canceller.cancel(&project_id.to_string());

        {
            let _guard = self.locks.acquire(&project_id.to_string()).await;
            let stored = match self.legacy_imports.find(project_id).await {
                Ok(import) => {
                    self.legacy_imports
                        .save(&import.mark_as_failed(&reason))
                        .await
                }
                Err(error) => Err(error),
            };
            match stored {
                Ok(()) => self.canceller.release(&project_id.to_string()),
                Err(error) => {
                    log_error_with_context!(&error, "Failed to record legacy import failure");
                }
            }
        }

        tracing::warn!(project_id = %project_id, reason = %reason, "Legacy project import failed");
        self.notify(
            ApiEventKind::ProjectLegacyImportFailed,
            project_id,
            project_id,
            json!({ "projectId": project_id, "reason": reason }),
        )
        .await;
        Outcome::empty()
    }
}

/// Rule violations go back to the caller; everything else fails the import
fn legacy_outcome(command: &'static str, project_id: ResourceId, error: CloneError) -> Outcome {
    match error {
        CloneError::Aggregate(rule) => {
            tracing::info!(project_id = %project_id, reason = %rule, "{} rejected", command);
            Outcome::rejected(rule.to_string())
        }
        other => legacy_failure(command, project_id, other),
    }
}

fn legacy_failure(command: &'static str, project_id: ResourceId, error: CloneError) -> Outcome {
    log_failure_substitution!(command, project_id, error);
    Outcome::command(MarkLegacyProjectImportAsFailed {
        project_id,
        reason: error.to_string(),
    })
}
