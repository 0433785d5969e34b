//! Import command handlers

use super::{ensure_absent, CommandHandlers, Outcome};
use crate::adapters::api_events::ApiEventKind;
use crate::core::import::Import;
use crate::domain::commands::{
    CompletePiece, MarkImportAsFailed, MarkImportPieceAsFailed, RequestImport,
};
use crate::domain::events::DomainEvent;
use crate::domain::ids::{ComponentId, ImportId};
use crate::domain::{AggregateError, CloneError, Result};
use crate::{log_error_with_context, log_failure_substitution};
use serde_json::json;

impl CommandHandlers {
    pub(super) async fn request_import(&self, command: RequestImport) -> Outcome {
        let import_id = command.import_id;

        match self.create_import(&command).await {
            Ok(events) => {
                tracing::info!(
                    import_id = %import_id,
                    resource_id = %command.resource_id,
                    pieces = command.pieces.len(),
                    cloning = command.source_export.is_some(),
                    "Import requested"
                );
                Outcome::events(events)
            }
            // The existing import is left alone
            Err(CloneError::Aggregate(rule @ AggregateError::AlreadyStarted(_))) => {
                tracing::info!(import_id = %import_id, reason = %rule, "RequestImport rejected");
                Outcome::rejected(rule.to_string())
            }
            Err(error) => import_failure("RequestImport", import_id, error),
        }
    }

    async fn create_import(&self, command: &RequestImport) -> Result<Vec<DomainEvent>> {
        let (import, events) = Import::new_one(command)?;
        let _guard = self.locks.acquire(&import.id().to_string()).await;
        ensure_absent(import.id(), self.imports.find(import.id()).await)?;
        self.imports.save(&import).await?;
        Ok(events)
    }

    /// Completes an import piece; see [`Import::complete_piece`]
    pub(super) async fn complete_piece(&self, command: CompletePiece) -> Outcome {
        let CompletePiece {
            import_id,
            component_id,
            warnings,
        } = command;

        let _guard = self.locks.acquire(&import_id.to_string()).await;
        match self.store_piece_completion(import_id, component_id, warnings).await {
            Ok((batch, events)) => {
                tracing::info!(
                    import_id = %import_id,
                    component_id = %component_id,
                    batch = batch,
                    duplicate = events.is_empty(),
                    "Import piece completed"
                );
                Outcome::events(events)
            }
            Err(error) => import_failure("CompletePiece", import_id, error),
        }
    }

    async fn store_piece_completion(
        &self,
        import_id: ImportId,
        component_id: ComponentId,
        warnings: Vec<String>,
    ) -> Result<(u32, Vec<DomainEvent>)> {
        let import = self.imports.find(import_id).await?;
        let (next, events) = import.complete_piece(component_id, warnings)?;
        if !events.is_empty() {
            self.imports.save(&next).await?;
        }
        let batch = next.piece(component_id).map(|p| p.order).unwrap_or_default();
        Ok((batch, events))
    }

    pub(super) async fn mark_import_piece_as_failed(
        &self,
        command: MarkImportPieceAsFailed,
    ) -> Outcome {
        let MarkImportPieceAsFailed {
            import_id,
            component_id,
            errors,
        } = command;
        let reason = errors.join("; ");

        let _guard = self.locks.acquire(&import_id.to_string()).await;
        match self.store_piece_failure(import_id, component_id, errors).await {
            Ok(events) if events.is_empty() => Outcome::empty(),
            Ok(events) => {
                tracing::warn!(
                    import_id = %import_id,
                    component_id = %component_id,
                    reason = %reason,
                    "Import piece failed"
                );
                Outcome::events(events).and_command(MarkImportAsFailed { import_id, reason })
            }
            Err(error) => import_failure("MarkImportPieceAsFailed", import_id, error),
        }
    }

    async fn store_piece_failure(
        &self,
        import_id: ImportId,
        component_id: ComponentId,
        errors: Vec<String>,
    ) -> Result<Vec<DomainEvent>> {
        let import = self.imports.find(import_id).await?;
        let (next, events) = import.fail_piece(component_id, errors)?;
        if !events.is_empty() {
            self.imports.save(&next).await?;
        }
        Ok(events)
    }

    pub(super) async fn mark_import_as_failed(&self, command: MarkImportAsFailed) -> Outcome {
        let MarkImportAsFailed { import_id, reason } = command;

        self.canceller.cancel(&import_id.to_string());

        let failed = {
            let _guard = self.locks.acquire(&import_id.to_string()).await;
            self.record_import_failure(import_id, &reason).await
        };
        let import = match failed {
            Ok(import) => import,
            Err(error) => {
                log_error_with_context!(&error, "Failed to record import failure");
                return Outcome::empty();
            }
        };
        // Only a recorded failure lets go of the raised signal
        self.canceller.release(&import_id.to_string());

        tracing::warn!(import_id = %import_id, resource_id = %import.resource_id(), reason = %reason, "Import failed");
        self.notify_failure(
            ApiEventKind::import_failed(import.resource_kind()),
            import.resource_kind(),
            import.resource_id(),
            import_id,
            json!({
                "importId": import_id,
                "resourceId": import.resource_id(),
                "resourceKind": import.resource_kind(),
                "reason": reason,
            }),
        )
        .await;
        Outcome::empty()
    }

    async fn record_import_failure(&self, import_id: ImportId, reason: &str) -> Result<Import> {
        let import = self.imports.find(import_id).await?.mark_as_failed(reason);
        self.imports.save(&import).await?;
        Ok(import)
    }
}

fn import_failure(command: &'static str, import_id: ImportId, error: CloneError) -> Outcome {
    log_failure_substitution!(command, import_id, error);
    Outcome::command(MarkImportAsFailed {
        import_id,
        reason: error.to_string(),
    })
}
