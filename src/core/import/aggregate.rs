//! Import aggregate
//!
//! Tracks one inbound import. Pieces are imported batch by batch: a batch is
//! requested once the previous one fully completed, and `AllPiecesImported`
//! is staged exactly once, when the last outstanding piece completes.

use crate::core::pieces::batch::{self, AggregateStatus, PieceCompletion};
use crate::domain::commands::RequestImport;
use crate::domain::component::PieceComponent;
use crate::domain::errors::AggregateError;
use crate::domain::events::DomainEvent;
use crate::domain::ids::{ComponentId, ExportId, ImportId, ResourceId, UserId};
use crate::domain::piece::{ClonePiece, ResourceKind};
use serde::{Deserialize, Serialize};

/// Persisted form of an [`Import`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSnapshot {
    pub id: ImportId,
    pub resource_id: ResourceId,
    pub project_id: ResourceId,
    pub owner_id: UserId,
    pub resource_kind: ResourceKind,
    pub archive_location: String,
    pub is_cloning: bool,
    #[serde(default)]
    pub export_id: Option<ExportId>,
    pub pieces: Vec<PieceComponent<ClonePiece>>,
}

/// One inbound import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    id: ImportId,
    resource_id: ResourceId,
    project_id: ResourceId,
    owner_id: UserId,
    resource_kind: ResourceKind,
    archive_location: String,
    is_cloning: bool,
    export_id: Option<ExportId>,
    pieces: Vec<PieceComponent<ClonePiece>>,
}

impl Import {
    /// Creates an import from a request, with every piece submitted
    ///
    /// Each piece is placed in the batch given by its kind's import order. The
    /// returned events announce the import and request the first batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the request has no pieces.
    pub fn new_one(request: &RequestImport) -> Result<(Self, Vec<DomainEvent>), AggregateError> {
        let pieces = request
            .pieces
            .iter()
            .map(|source| {
                PieceComponent::submitted(source.piece, source.piece.import_order())
                    .with_locations(source.locations.clone())
            })
            .collect::<Vec<_>>();
        batch::validate_pieces(&pieces)?;

        let import = Self {
            id: request.import_id,
            resource_id: request.resource_id,
            project_id: request.project_id,
            owner_id: request.owner_id,
            resource_kind: request.resource_kind,
            archive_location: request.archive_location.clone(),
            is_cloning: request.source_export.is_some(),
            export_id: request.source_export,
            pieces,
        };

        let mut events = vec![DomainEvent::ImportRequested {
            import_id: import.id,
            resource_id: import.resource_id,
            resource_kind: import.resource_kind,
        }];
        events.extend(import.piece_requests(batch::first_batch(&import.pieces)));

        Ok((import, events))
    }

    /// Rebuilds an import from its persisted form
    ///
    /// # Errors
    ///
    /// Returns an error if the pieces are empty or not unique, or if a cloning
    /// import does not reference its source export.
    pub fn from_snapshot(snapshot: ImportSnapshot) -> Result<Self, AggregateError> {
        batch::validate_pieces(&snapshot.pieces)?;
        if snapshot.is_cloning && snapshot.export_id.is_none() {
            return Err(AggregateError::MissingSourceExport);
        }

        Ok(Self {
            id: snapshot.id,
            resource_id: snapshot.resource_id,
            project_id: snapshot.project_id,
            owner_id: snapshot.owner_id,
            resource_kind: snapshot.resource_kind,
            archive_location: snapshot.archive_location,
            is_cloning: snapshot.is_cloning,
            export_id: snapshot.export_id,
            pieces: snapshot.pieces,
        })
    }

    /// Returns the persisted form of this import
    pub fn to_snapshot(&self) -> ImportSnapshot {
        ImportSnapshot {
            id: self.id,
            resource_id: self.resource_id,
            project_id: self.project_id,
            owner_id: self.owner_id,
            resource_kind: self.resource_kind,
            archive_location: self.archive_location.clone(),
            is_cloning: self.is_cloning,
            export_id: self.export_id,
            pieces: self.pieces.clone(),
        }
    }

    pub fn id(&self) -> ImportId {
        self.id
    }

    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    pub fn project_id(&self) -> ResourceId {
        self.project_id
    }

    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    pub fn resource_kind(&self) -> ResourceKind {
        self.resource_kind
    }

    pub fn archive_location(&self) -> &str {
        &self.archive_location
    }

    pub fn is_cloning(&self) -> bool {
        self.is_cloning
    }

    pub fn export_id(&self) -> Option<ExportId> {
        self.export_id
    }

    pub fn pieces(&self) -> &[PieceComponent<ClonePiece>] {
        &self.pieces
    }

    pub fn piece(&self, component_id: ComponentId) -> Option<&PieceComponent<ClonePiece>> {
        self.pieces.iter().find(|p| p.id == component_id)
    }

    /// Derived status of the import
    pub fn status(&self) -> AggregateStatus {
        batch::derive_status(&self.pieces)
    }

    /// Completes a piece
    ///
    /// 1. An unknown piece is an error.
    /// 2. A piece already in a terminal state is left alone and no event is
    ///    staged, so duplicate deliveries are harmless.
    /// 3. Otherwise the piece is completed and `PieceImported` is staged.
    /// 4. If that closed the piece's batch, the next batch is requested; if
    ///    there is no next batch and every piece completed, `AllPiecesImported`
    ///    is staged.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::PieceNotFound`] if the piece is unknown.
    pub fn complete_piece(
        &self,
        component_id: ComponentId,
        warnings: Vec<String>,
    ) -> Result<(Self, Vec<DomainEvent>), AggregateError> {
        let mut next = self.clone();
        let completion = batch::complete_piece(&mut next.pieces, component_id, warnings)?;

        if completion == PieceCompletion::Unchanged {
            return Ok((next, Vec::new()));
        }

        let mut events = vec![DomainEvent::PieceImported {
            import_id: self.id,
            resource_id: self.resource_id,
            component_id,
        }];

        match completion {
            PieceCompletion::NextBatch(pieces) => events.extend(next.piece_requests(pieces)),
            PieceCompletion::AllCompleted => events.push(DomainEvent::AllPiecesImported {
                import_id: self.id,
                resource_id: self.resource_id,
                resource_kind: self.resource_kind,
                is_cloning: self.is_cloning,
                export_id: self.export_id,
            }),
            PieceCompletion::Completed | PieceCompletion::Unchanged => {}
        }

        Ok((next, events))
    }

    /// Marks a single piece as failed
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::PieceNotFound`] if the piece is unknown.
    pub fn fail_piece(
        &self,
        component_id: ComponentId,
        errors: Vec<String>,
    ) -> Result<(Self, Vec<DomainEvent>), AggregateError> {
        let mut next = self.clone();
        if !batch::fail_piece(&mut next.pieces, component_id, errors)? {
            return Ok((next, Vec::new()));
        }

        let events = vec![DomainEvent::ImportPieceFailed {
            import_id: self.id,
            resource_id: self.resource_id,
            component_id,
        }];
        Ok((next, events))
    }

    /// Fails every pending piece with the given reason
    pub fn mark_as_failed(&self, reason: &str) -> Self {
        let mut next = self.clone();
        batch::fail_pending(&mut next.pieces, reason);
        next
    }

    fn piece_requests(&self, pieces: Vec<PieceComponent<ClonePiece>>) -> Vec<DomainEvent> {
        pieces
            .into_iter()
            .map(|piece| DomainEvent::PieceImportRequested {
                import_id: self.id,
                component_id: piece.id,
                piece: piece.kind,
                resource_id: self.resource_id,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::commands::ImportPieceSource;
    use crate::domain::component::ComponentLocation;

    fn request(pieces: &[ClonePiece], source_export: Option<ExportId>) -> RequestImport {
        RequestImport {
            import_id: ImportId::new(),
            resource_id: ResourceId::new(),
            project_id: ResourceId::new(),
            owner_id: UserId::new(),
            resource_kind: ResourceKind::Project,
            archive_location: "/archives/export.zip".to_string(),
            pieces: pieces
                .iter()
                .map(|piece| ImportPieceSource {
                    piece: *piece,
                    locations: vec![ComponentLocation::new(
                        format!("/files/{piece}"),
                        piece.relative_path(),
                    )],
                })
                .collect(),
            source_export,
        }
    }

    fn id_of(import: &Import, kind: ClonePiece) -> ComponentId {
        import
            .pieces()
            .iter()
            .find(|p| p.kind == kind)
            .map(|p| p.id)
            .unwrap()
    }

    #[test]
    fn test_new_one_requests_first_batch() {
        let request = request(
            &[
                ClonePiece::PlanningAreaGadm,
                ClonePiece::ProjectMetadata,
                ClonePiece::ExportConfig,
            ],
            None,
        );
        let (import, events) = Import::new_one(&request).unwrap();

        assert!(!import.is_cloning());
        assert_eq!(events[0].name(), "ImportRequested");
        let requested: Vec<_> = events.iter().filter(|e| e.is_piece_request()).collect();
        assert_eq!(requested.len(), 2);
        assert_eq!(import.pieces()[0].locations.len(), 1);
    }

    #[test]
    fn test_planning_grid_then_features_scenario() {
        let request = request(
            &[ClonePiece::PlanningUnitsGrid, ClonePiece::ProjectCustomFeatures],
            None,
        );
        let (import, _) = Import::new_one(&request).unwrap();
        let grid = id_of(&import, ClonePiece::PlanningUnitsGrid);
        let features = id_of(&import, ClonePiece::ProjectCustomFeatures);

        let (import, events) = import.complete_piece(grid, vec![]).unwrap();
        assert_eq!(
            events,
            vec![
                DomainEvent::PieceImported {
                    import_id: import.id(),
                    resource_id: import.resource_id(),
                    component_id: grid,
                },
                DomainEvent::PieceImportRequested {
                    import_id: import.id(),
                    component_id: features,
                    piece: ClonePiece::ProjectCustomFeatures,
                    resource_id: import.resource_id(),
                },
            ]
        );

        let (import, events) = import.complete_piece(features, vec![]).unwrap();
        assert_eq!(
            events,
            vec![
                DomainEvent::PieceImported {
                    import_id: import.id(),
                    resource_id: import.resource_id(),
                    component_id: features,
                },
                DomainEvent::AllPiecesImported {
                    import_id: import.id(),
                    resource_id: import.resource_id(),
                    resource_kind: ResourceKind::Project,
                    is_cloning: false,
                    export_id: None,
                },
            ]
        );
        assert_eq!(import.status(), AggregateStatus::FullyImported);
    }

    #[test]
    fn test_completion_stores_warnings() {
        let request = request(&[ClonePiece::ProjectMetadata], None);
        let (import, _) = Import::new_one(&request).unwrap();
        let id = import.pieces()[0].id;
        let warnings = vec!["metadata description truncated".to_string()];

        let (import, _) = import.complete_piece(id, warnings.clone()).unwrap();
        assert_eq!(import.piece(id).unwrap().warnings, warnings);
    }

    #[test]
    fn test_cloning_import_carries_export_id() {
        let export_id = ExportId::new();
        let request = request(&[ClonePiece::ProjectMetadata], Some(export_id));
        let (import, _) = Import::new_one(&request).unwrap();
        let id = import.pieces()[0].id;

        let (_, events) = import.complete_piece(id, vec![]).unwrap();
        assert!(matches!(
            events.last(),
            Some(DomainEvent::AllPiecesImported { is_cloning: true, export_id: Some(e), .. }) if *e == export_id
        ));
    }

    #[test]
    fn test_fail_piece_emits_once() {
        let request = request(&[ClonePiece::ProjectMetadata], None);
        let (import, _) = Import::new_one(&request).unwrap();
        let id = import.pieces()[0].id;

        let (import, events) = import.fail_piece(id, vec!["bad".to_string()]).unwrap();
        assert_eq!(events.len(), 1);
        let (_, events) = import.fail_piece(id, vec![]).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_snapshot_rejects_cloning_without_export() {
        let request = request(&[ClonePiece::ProjectMetadata], None);
        let (import, _) = Import::new_one(&request).unwrap();
        let mut snapshot = import.to_snapshot();
        snapshot.is_cloning = true;

        assert_eq!(
            Import::from_snapshot(snapshot),
            Err(AggregateError::MissingSourceExport)
        );
    }
}
