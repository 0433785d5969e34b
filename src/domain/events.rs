//! Domain events
//!
//! Events are staged by aggregates and published by handlers only after the
//! aggregate that produced them has been persisted.

use crate::domain::ids::{ComponentId, ExportId, ImportId, ResourceId};
use crate::domain::piece::{ClonePiece, LegacyProjectImportPiece, ResourceKind};
use serde::{Deserialize, Serialize};

/// Every event emitted by the export, import and legacy import aggregates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// An export piece produced its files
    ExportPieceCompleted {
        export_id: ExportId,
        resource_id: ResourceId,
        component_id: ComponentId,
    },

    /// An export piece could not be produced
    ExportPieceFailed {
        export_id: ExportId,
        resource_id: ResourceId,
        component_id: ComponentId,
    },

    /// Every piece of an export produced its files
    AllPiecesExported {
        export_id: ExportId,
        resource_id: ResourceId,
        resource_kind: ResourceKind,
    },

    /// A new import was accepted
    ImportRequested {
        import_id: ImportId,
        resource_id: ResourceId,
        resource_kind: ResourceKind,
    },

    /// A piece is ready to be imported; picked up by the job transport
    PieceImportRequested {
        import_id: ImportId,
        component_id: ComponentId,
        piece: ClonePiece,
        resource_id: ResourceId,
    },

    /// A piece finished importing
    PieceImported {
        import_id: ImportId,
        resource_id: ResourceId,
        component_id: ComponentId,
    },

    /// A piece could not be imported
    ImportPieceFailed {
        import_id: ImportId,
        resource_id: ResourceId,
        component_id: ComponentId,
    },

    /// Every piece across every batch finished importing
    AllPiecesImported {
        import_id: ImportId,
        resource_id: ResourceId,
        resource_kind: ResourceKind,
        is_cloning: bool,
        /// Export the archive came from, set when cloning
        export_id: Option<ExportId>,
    },

    /// A legacy project import started processing its files
    LegacyProjectImportRequested { project_id: ResourceId },

    /// A legacy piece is ready to be processed
    LegacyProjectImportPieceRequested {
        project_id: ResourceId,
        component_id: ComponentId,
        piece: LegacyProjectImportPiece,
    },

    /// A legacy piece finished processing
    LegacyProjectImportPieceImported {
        project_id: ResourceId,
        component_id: ComponentId,
    },

    /// Every legacy piece finished processing
    AllLegacyProjectPiecesImported { project_id: ResourceId },
}

impl DomainEvent {
    /// Event name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::ExportPieceCompleted { .. } => "ExportPieceCompleted",
            Self::ExportPieceFailed { .. } => "ExportPieceFailed",
            Self::AllPiecesExported { .. } => "AllPiecesExported",
            Self::ImportRequested { .. } => "ImportRequested",
            Self::PieceImportRequested { .. } => "PieceImportRequested",
            Self::PieceImported { .. } => "PieceImported",
            Self::ImportPieceFailed { .. } => "ImportPieceFailed",
            Self::AllPiecesImported { .. } => "AllPiecesImported",
            Self::LegacyProjectImportRequested { .. } => "LegacyProjectImportRequested",
            Self::LegacyProjectImportPieceRequested { .. } => "LegacyProjectImportPieceRequested",
            Self::LegacyProjectImportPieceImported { .. } => "LegacyProjectImportPieceImported",
            Self::AllLegacyProjectPiecesImported { .. } => "AllLegacyProjectPiecesImported",
        }
    }

    /// Whether the event asks the transport to run a piece
    pub fn is_piece_request(&self) -> bool {
        matches!(
            self,
            Self::PieceImportRequested { .. } | Self::LegacyProjectImportPieceRequested { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = DomainEvent::AllLegacyProjectPiecesImported {
            project_id: ResourceId::new(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "all_legacy_project_pieces_imported");
    }

    #[test]
    fn test_piece_request_classification() {
        let requested = DomainEvent::PieceImportRequested {
            import_id: ImportId::new(),
            component_id: ComponentId::new(),
            piece: ClonePiece::ProjectMetadata,
            resource_id: ResourceId::new(),
        };
        let imported = DomainEvent::PieceImported {
            import_id: ImportId::new(),
            resource_id: ResourceId::new(),
            component_id: ComponentId::new(),
        };
        assert!(requested.is_piece_request());
        assert!(!imported.is_piece_request());
        assert_eq!(imported.name(), "PieceImported");
    }
}
