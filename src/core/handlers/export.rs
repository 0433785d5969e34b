//! Export command handlers

use super::{ensure_absent, CommandHandlers, Outcome};
use crate::adapters::api_events::ApiEventKind;
use crate::adapters::queue::PieceJob;
use crate::core::export::Export;
use crate::domain::commands::{
    CompleteExportPiece, MarkExportAsFailed, MarkExportPieceAsFailed, RequestExport,
    SchedulePieceExport,
};
use crate::domain::events::DomainEvent;
use crate::domain::{AggregateError, CloneError, Command, Result};
use crate::{log_error_with_context, log_failure_substitution};
use serde_json::json;

impl CommandHandlers {
    pub(super) async fn request_export(&self, command: RequestExport) -> Outcome {
        let RequestExport {
            export_id,
            resource_id,
            resource_kind,
        } = command;

        match self.create_export(command).await {
            Ok(export) => {
                tracing::info!(
                    export_id = %export_id,
                    resource_id = %resource_id,
                    pieces = export.pieces().len(),
                    "Export requested"
                );
                Outcome::commands(
                    export
                        .pieces()
                        .iter()
                        .map(|piece| {
                            Command::from(SchedulePieceExport {
                                export_id,
                                component_id: piece.id,
                                resource_id,
                                piece: piece.kind,
                            })
                        })
                        .collect(),
                )
            }
            Err(CloneError::Aggregate(rule @ AggregateError::AlreadyStarted(_))) => {
                tracing::info!(export_id = %export_id, reason = %rule, "RequestExport rejected");
                Outcome::rejected(rule.to_string())
            }
            Err(error) => {
                log_failure_substitution!("RequestExport", export_id, error);
                Outcome::command(MarkExportAsFailed {
                    resource_id,
                    resource_kind,
                    export_id,
                    reason: error.to_string(),
                })
            }
        }
    }

    async fn create_export(&self, command: RequestExport) -> Result<Export> {
        let pieces = self
            .resource_pieces
            .resolve_for(command.resource_id, command.resource_kind)
            .await?;
        let export = Export::new_one(
            command.export_id,
            command.resource_id,
            command.resource_kind,
            pieces,
        )?;

        let _guard = self.locks.acquire(&command.export_id.to_string()).await;
        ensure_absent(command.export_id, self.exports.find(command.export_id).await)?;
        self.exports.save(&export).await?;
        Ok(export)
    }

    pub(super) async fn schedule_piece_export(&self, command: SchedulePieceExport) -> Outcome {
        let job = PieceJob::Export {
            export_id: command.export_id,
            component_id: command.component_id,
            resource_id: command.resource_id,
            piece: command.piece,
        };

        match self.queue.enqueue(job).await {
            Ok(()) => Outcome::empty(),
            Err(error) => {
                log_failure_substitution!("SchedulePieceExport", command.export_id, error);
                Outcome::command(MarkExportPieceAsFailed {
                    export_id: command.export_id,
                    component_id: command.component_id,
                    errors: vec![error.to_string()],
                })
            }
        }
    }

    pub(super) async fn complete_export_piece(&self, command: CompleteExportPiece) -> Outcome {
        let CompleteExportPiece {
            export_id,
            component_id,
            locations,
        } = command;

        let _guard = self.locks.acquire(&export_id.to_string()).await;
        let export = match self.exports.find(export_id).await {
            Ok(export) => export,
            Err(error) => {
                log_error_with_context!(&error, "Cannot complete piece of unknown export");
                return Outcome::empty();
            }
        };

        let completed = export
            .complete_piece(component_id, locations)
            .map_err(CloneError::from);
        match self.store_export(completed).await {
            Ok(events) => {
                tracing::info!(
                    export_id = %export_id,
                    component_id = %component_id,
                    duplicate = events.is_empty(),
                    "Export piece completed"
                );
                Outcome::events(events)
            }
            Err(error) => export_failure("CompleteExportPiece", &export, error),
        }
    }

    pub(super) async fn mark_export_piece_as_failed(
        &self,
        command: MarkExportPieceAsFailed,
    ) -> Outcome {
        let MarkExportPieceAsFailed {
            export_id,
            component_id,
            errors,
        } = command;
        let reason = errors.join("; ");

        let _guard = self.locks.acquire(&export_id.to_string()).await;
        let export = match self.exports.find(export_id).await {
            Ok(export) => export,
            Err(error) => {
                log_error_with_context!(&error, "Cannot fail piece of unknown export");
                return Outcome::empty();
            }
        };

        let failed = export
            .fail_piece(component_id, errors)
            .map_err(CloneError::from);
        match self.store_export(failed).await {
            Ok(events) if events.is_empty() => Outcome::empty(),
            Ok(events) => {
                tracing::warn!(
                    export_id = %export_id,
                    component_id = %component_id,
                    reason = %reason,
                    "Export piece failed"
                );
                Outcome::events(events).and_command(MarkExportAsFailed {
                    resource_id: export.resource_id(),
                    resource_kind: export.resource_kind(),
                    export_id,
                    reason,
                })
            }
            Err(error) => export_failure("MarkExportPieceAsFailed", &export, error),
        }
    }

    /// Saves a mutated export when the mutation staged events
    async fn store_export(
        &self,
        mutation: Result<(Export, Vec<DomainEvent>)>,
    ) -> Result<Vec<DomainEvent>> {
        let (next, events) = mutation?;
        if !events.is_empty() {
            self.exports.save(&next).await?;
        }
        Ok(events)
    }

    pub(super) async fn mark_export_as_failed(&self, command: MarkExportAsFailed) -> Outcome {
        let MarkExportAsFailed {
            resource_id,
            resource_kind,
            export_id,
            reason,
        } = command;

        self.canceller.cancel(&export_id.to_string());

        {
            let _guard = self.locks.acquire(&export_id.to_string()).await;
            let stored = match self.exports.find(export_id).await {
                Ok(export) => self.exports.save(&export.mark_as_failed(&reason)).await,
                Err(error) => Err(error),
            };
            match stored {
                Ok(()) => self.canceller.release(&export_id.to_string()),
                Err(error) => {
                    log_error_with_context!(&error, "Failed to record export failure");
                }
            }
        }

        tracing::warn!(export_id = %export_id, resource_id = %resource_id, reason = %reason, "Export failed");
        self.notify_failure(
            ApiEventKind::export_failed(resource_kind),
            resource_kind,
            resource_id,
            export_id,
            json!({ "exportId": export_id, "resourceId": resource_id, "resourceKind": resource_kind }),
        )
        .await;
        Outcome::empty()
    }
}

fn export_failure(command: &'static str, export: &Export, error: CloneError) -> Outcome {
    log_failure_substitution!(command, export.id(), error);
    Outcome::command(MarkExportAsFailed {
        resource_id: export.resource_id(),
        resource_kind: export.resource_kind(),
        export_id: export.id(),
        reason: error.to_string(),
    })
}
