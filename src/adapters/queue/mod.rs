//! Piece job queue
//!
//! The transport between the orchestration core and the piece workers. Export
//! pieces are enqueued by the `SchedulePieceExport` handler, import and legacy
//! pieces by the [`PieceJobScheduler`] reacting to piece-request events.

pub mod mpsc;
pub mod scheduler;

pub use mpsc::{MpscPieceJobQueue, PieceJobReceiver};
pub use scheduler::PieceJobScheduler;

use crate::domain::component::ComponentLocation;
use crate::domain::ids::{ComponentId, ExportId, ImportId, ResourceId};
use crate::domain::legacy::LegacyProjectImportFile;
use crate::domain::piece::{ClonePiece, LegacyProjectImportPiece};
use crate::domain::Result;
use async_trait::async_trait;

/// One unit of piece work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PieceJob {
    Export {
        export_id: ExportId,
        component_id: ComponentId,
        resource_id: ResourceId,
        piece: ClonePiece,
    },
    Import {
        import_id: ImportId,
        component_id: ComponentId,
        resource_id: ResourceId,
        piece: ClonePiece,
        locations: Vec<ComponentLocation>,
    },
    Legacy {
        project_id: ResourceId,
        scenario_id: ResourceId,
        component_id: ComponentId,
        piece: LegacyProjectImportPiece,
        files: Vec<LegacyProjectImportFile>,
    },
}

impl PieceJob {
    /// Id of the run the job belongs to, used for cancellation
    pub fn run_id(&self) -> String {
        match self {
            Self::Export { export_id, .. } => export_id.to_string(),
            Self::Import { import_id, .. } => import_id.to_string(),
            Self::Legacy { project_id, .. } => project_id.to_string(),
        }
    }

    pub fn component_id(&self) -> ComponentId {
        match self {
            Self::Export { component_id, .. }
            | Self::Import { component_id, .. }
            | Self::Legacy { component_id, .. } => *component_id,
        }
    }

    /// Piece name used in logs
    pub fn piece_name(&self) -> String {
        match self {
            Self::Export { piece, .. } | Self::Import { piece, .. } => piece.to_string(),
            Self::Legacy { piece, .. } => piece.to_string(),
        }
    }
}

/// Queue of piece jobs
#[async_trait]
pub trait PieceJobQueue: Send + Sync {
    /// Add a job; waits while the queue is full
    ///
    /// # Errors
    ///
    /// Returns a queue error if no worker is listening anymore.
    async fn enqueue(&self, job: PieceJob) -> Result<()>;
}
