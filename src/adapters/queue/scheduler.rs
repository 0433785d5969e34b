//! Piece job scheduling
//!
//! Subscribes to the event bus and puts import and legacy pieces on the job
//! queue once their aggregate requests them.

use super::{PieceJob, PieceJobQueue};
use crate::adapters::repository::{ImportRepository, LegacyProjectImportRepository};
use crate::core::bus::EventSubscriber;
use crate::domain::commands::{
    Command, MarkImportPieceAsFailed, MarkLegacyProjectImportPieceAsFailed,
};
use crate::domain::events::DomainEvent;
use crate::domain::ids::{ComponentId, ImportId, ResourceId};
use crate::domain::piece::{ClonePiece, LegacyProjectImportPiece};
use crate::domain::{CloneError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Turns piece-request events into jobs on the piece job queue
///
/// Looks up the files each piece reads from its aggregate. A piece that cannot
/// be enqueued is failed.
pub struct PieceJobScheduler {
    queue: Arc<dyn PieceJobQueue>,
    imports: Arc<dyn ImportRepository>,
    legacy_imports: Arc<dyn LegacyProjectImportRepository>,
}

impl PieceJobScheduler {
    pub fn new(
        queue: Arc<dyn PieceJobQueue>,
        imports: Arc<dyn ImportRepository>,
        legacy_imports: Arc<dyn LegacyProjectImportRepository>,
    ) -> Self {
        Self {
            queue,
            imports,
            legacy_imports,
        }
    }

    async fn schedule_import(
        &self,
        import_id: ImportId,
        component_id: ComponentId,
        piece: ClonePiece,
        resource_id: ResourceId,
    ) -> Result<()> {
        let import = self.imports.find(import_id).await?;
        let locations = import
            .piece(component_id)
            .map(|p| p.locations.clone())
            .ok_or_else(|| CloneError::Queue(format!("Piece {component_id} not in import")))?;

        self.queue
            .enqueue(PieceJob::Import {
                import_id,
                component_id,
                resource_id,
                piece,
                locations,
            })
            .await
    }

    async fn schedule_legacy(
        &self,
        project_id: ResourceId,
        component_id: ComponentId,
        piece: LegacyProjectImportPiece,
    ) -> Result<()> {
        let import = self.legacy_imports.find(project_id).await?;
        self.queue
            .enqueue(PieceJob::Legacy {
                project_id,
                scenario_id: import.scenario_id(),
                component_id,
                piece,
                files: import.files().to_vec(),
            })
            .await
    }
}

#[async_trait]
impl EventSubscriber for PieceJobScheduler {
    fn name(&self) -> &'static str {
        "PieceJobScheduler"
    }

    async fn on_event(&self, event: &DomainEvent) -> Vec<Command> {
        match *event {
            DomainEvent::PieceImportRequested {
                import_id,
                component_id,
                piece,
                resource_id,
            } => match self
                .schedule_import(import_id, component_id, piece, resource_id)
                .await
            {
                Ok(()) => Vec::new(),
                Err(error) => vec![MarkImportPieceAsFailed {
                    import_id,
                    component_id,
                    errors: vec![error.to_string()],
                }
                .into()],
            },
            DomainEvent::LegacyProjectImportPieceRequested {
                project_id,
                component_id,
                piece,
            } => match self.schedule_legacy(project_id, component_id, piece).await {
                Ok(()) => Vec::new(),
                Err(error) => vec![MarkLegacyProjectImportPieceAsFailed {
                    project_id,
                    component_id,
                    errors: vec![error.to_string()],
                }
                .into()],
            },
            _ => Vec::new(),
        }
    }
}
