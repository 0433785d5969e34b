//! Export aggregate
//!
//! Tracks one outbound export as a set of piece snapshots. Export pieces have
//! no ordering between them: every piece is scheduled as soon as the export is
//! persisted, and the export is finished once all of them produced their files.

use crate::core::pieces::batch::{self, AggregateStatus, PieceCompletion};
use crate::domain::commands::ImportPieceSource;
use crate::domain::component::{ComponentLocation, PieceComponent};
use crate::domain::errors::AggregateError;
use crate::domain::events::DomainEvent;
use crate::domain::ids::{ComponentId, ExportId, ResourceId};
use crate::domain::piece::{ClonePiece, ResourceKind};
use serde::{Deserialize, Serialize};

/// Persisted form of an [`Export`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSnapshot {
    pub id: ExportId,
    pub resource_id: ResourceId,
    pub resource_kind: ResourceKind,
    pub pieces: Vec<PieceComponent<ClonePiece>>,
}

/// One outbound export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    id: ExportId,
    resource_id: ResourceId,
    resource_kind: ResourceKind,
    pieces: Vec<PieceComponent<ClonePiece>>,
}

impl Export {
    /// Creates a fresh export with every piece pending
    ///
    /// No event is staged; the handler persists the export directly and then
    /// schedules its pieces.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::NoPieces`] if `pieces` is empty.
    pub fn new_one(
        id: ExportId,
        resource_id: ResourceId,
        resource_kind: ResourceKind,
        pieces: Vec<ClonePiece>,
    ) -> Result<Self, AggregateError> {
        let pieces = pieces
            .into_iter()
            .map(|piece| PieceComponent::submitted(piece, 0))
            .collect::<Vec<_>>();
        batch::validate_pieces(&pieces)?;

        Ok(Self {
            id,
            resource_id,
            resource_kind,
            pieces,
        })
    }

    /// Rebuilds an export from its persisted form
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot has no pieces or duplicate piece ids.
    pub fn from_snapshot(snapshot: ExportSnapshot) -> Result<Self, AggregateError> {
        batch::validate_pieces(&snapshot.pieces)?;
        Ok(Self {
            id: snapshot.id,
            resource_id: snapshot.resource_id,
            resource_kind: snapshot.resource_kind,
            pieces: snapshot.pieces,
        })
    }

    /// Returns the persisted form of this export
    pub fn to_snapshot(&self) -> ExportSnapshot {
        ExportSnapshot {
            id: self.id,
            resource_id: self.resource_id,
            resource_kind: self.resource_kind,
            pieces: self.pieces.clone(),
        }
    }

    pub fn id(&self) -> ExportId {
        self.id
    }

    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    pub fn resource_kind(&self) -> ResourceKind {
        self.resource_kind
    }

    pub fn pieces(&self) -> &[PieceComponent<ClonePiece>] {
        &self.pieces
    }

    /// Derived status of the export
    pub fn status(&self) -> AggregateStatus {
        batch::derive_status(&self.pieces)
    }

    /// Whether every piece produced its files
    pub fn is_finished(&self) -> bool {
        batch::all_completed(&self.pieces)
    }

    /// Records the files produced by a piece
    ///
    /// Returns the updated export and the events to publish once it has been
    /// persisted. Completing an already finished piece changes nothing and
    /// stages no event.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::PieceNotFound`] if the piece is unknown.
    pub fn complete_piece(
        &self,
        component_id: ComponentId,
        locations: Vec<ComponentLocation>,
    ) -> Result<(Self, Vec<DomainEvent>), AggregateError> {
        let mut next = self.clone();
        let completion = batch::complete_piece(&mut next.pieces, component_id, Vec::new())?;

        if completion == PieceCompletion::Unchanged {
            return Ok((next, Vec::new()));
        }

        if let Some(piece) = next.pieces.iter_mut().find(|p| p.id == component_id) {
            piece.locations = locations;
        }

        let mut events = vec![DomainEvent::ExportPieceCompleted {
            export_id: self.id,
            resource_id: self.resource_id,
            component_id,
        }];

        if completion == PieceCompletion::AllCompleted {
            events.push(DomainEvent::AllPiecesExported {
                export_id: self.id,
                resource_id: self.resource_id,
                resource_kind: self.resource_kind,
            });
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

        let events = vec![DomainEvent::ExportPieceFailed {
            export_id: self.id,
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

    /// Import sources built from the produced files, for chaining a clone
    pub fn import_sources(&self) -> Vec<ImportPieceSource> {
        self.pieces
            .iter()
            .filter(|p| p.is_completed())
            .map(|p| ImportPieceSource {
                piece: p.kind,
                locations: p.locations.clone(),
            })
            .collect()
    }
}
