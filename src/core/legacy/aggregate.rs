//! Legacy project import aggregate
//!
//! A legacy import is opened for uploads, collects the externally authored
//! project files, and is then run: its pieces are resolved from the uploaded
//! files and processed batch by batch like a regular import.

use crate::core::pieces::batch::{self, AggregateStatus, PieceCompletion};
use crate::domain::component::PieceComponent;
use crate::domain::errors::AggregateError;
use crate::domain::events::DomainEvent;
use crate::domain::ids::{ComponentId, ImportId, ResourceId, UserId};
use crate::domain::legacy::{LegacyProjectImportFile, LegacyProjectImportFileType};
use crate::domain::piece::LegacyProjectImportPiece;
use serde::{Deserialize, Serialize};

/// Persisted form of a [`LegacyProjectImport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyProjectImportSnapshot {
    pub id: ImportId,
    pub project_id: ResourceId,
    pub scenario_id: ResourceId,
    pub owner_id: UserId,
    #[serde(default)]
    pub files: Vec<LegacyProjectImportFile>,
    #[serde(default)]
    pub pieces: Vec<PieceComponent<LegacyProjectImportPiece>>,
    pub is_accepting_files: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyProjectImport {
    id: ImportId,
    project_id: ResourceId,
    scenario_id: ResourceId,
    owner_id: UserId,
    files: Vec<LegacyProjectImportFile>,
    pieces: Vec<PieceComponent<LegacyProjectImportPiece>>,
    is_accepting_files: bool,
}

impl LegacyProjectImport {
    /// Opens a legacy import for file uploads
    pub fn start(project_id: ResourceId, scenario_id: ResourceId, owner_id: UserId) -> Self {
        Self {
            id: ImportId::new(),
            project_id,
            scenario_id,
            owner_id,
            files: Vec::new(),
            pieces: Vec::new(),
            is_accepting_files: true,
        }
    }

    /// Rebuilds a legacy import from its persisted form
    ///
    /// # Errors
    ///
    /// Returns an error if two pieces share an id.
    pub fn from_snapshot(snapshot: LegacyProjectImportSnapshot) -> Result<Self, AggregateError> {
        if !snapshot.pieces.is_empty() {
            batch::validate_pieces(&snapshot.pieces)?;
        }

        Ok(Self {
            id: snapshot.id,
            project_id: snapshot.project_id,
            scenario_id: snapshot.scenario_id,
            owner_id: snapshot.owner_id,
            files: snapshot.files,
            pieces: snapshot.pieces,
            is_accepting_files: snapshot.is_accepting_files,
        })
    }

    pub fn to_snapshot(&self) -> LegacyProjectImportSnapshot {
        LegacyProjectImportSnapshot {
            id: self.id,
            project_id: self.project_id,
            scenario_id: self.scenario_id,
            owner_id: self.owner_id,
            files: self.files.clone(),
            pieces: self.pieces.clone(),
            is_accepting_files: self.is_accepting_files,
        }
    }

    pub fn id(&self) -> ImportId {
        self.id
    }

    pub fn project_id(&self) -> ResourceId {
        self.project_id
    }

    pub fn scenario_id(&self) -> ResourceId {
        self.scenario_id
    }

    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    pub fn files(&self) -> &[LegacyProjectImportFile] {
        &self.files
    }

    pub fn pieces(&self) -> &[PieceComponent<LegacyProjectImportPiece>] {
        &self.pieces
    }

    pub fn is_accepting_files(&self) -> bool {
        self.is_accepting_files
    }

    /// Derived status; an import still collecting files is in progress
    pub fn status(&self) -> AggregateStatus {
        if self.pieces.is_empty() {
            return match self.is_accepting_files {
                true => AggregateStatus::InProgress,
                false => AggregateStatus::Failed,
            };
        }
        batch::derive_status(&self.pieces)
    }

    /// Adds an uploaded file, replacing any previous file of the same type
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::NotAcceptingFiles`] once the import has run.
    pub fn add_file(&self, file: LegacyProjectImportFile) -> Result<Self, AggregateError> {
        if !self.is_accepting_files {
            return Err(AggregateError::NotAcceptingFiles);
        }

        let mut next = self.clone();
        next.files.retain(|f| f.file_type != file.file_type);
        next.files.push(file);
        Ok(next)
    }

    /// Stops accepting files and requests the first batch of pieces
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::NotAcceptingFiles`] if the import already ran,
    /// or [`AggregateError::MissingRequiredFiles`] naming every mandatory file
    /// that was not uploaded.
    pub fn run(&self) -> Result<(Self, Vec<DomainEvent>), AggregateError> {
        if !self.is_accepting_files {
            return Err(AggregateError::NotAcceptingFiles);
        }

        let missing = LegacyProjectImportFileType::REQUIRED
            .iter()
            .filter(|required| !self.has_file(**required))
            .map(|required| required.file_name().to_string())
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(AggregateError::MissingRequiredFiles(missing));
        }

        let mut next = self.clone();
        next.pieces = self
            .resolve_pieces()
            .into_iter()
            .map(|piece| PieceComponent::submitted(piece, piece.order()))
            .collect();
        next.is_accepting_files = false;

        let mut events = vec![DomainEvent::LegacyProjectImportRequested {
            project_id: self.project_id,
        }];
        events.extend(next.piece_requests(batch::first_batch(&next.pieces)));

        Ok((next, events))
    }

    /// Completes a piece
    ///
    /// Follows the same batch rules as a regular import: duplicate completions
    /// are ignored, the next batch is requested once the current one is done,
    /// and `AllLegacyProjectPiecesImported` is staged after the last piece.
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

        let mut events = vec![DomainEvent::LegacyProjectImportPieceImported {
            project_id: self.project_id,
            component_id,
        }];

        match completion {
            PieceCompletion::NextBatch(pieces) => events.extend(next.piece_requests(pieces)),
            PieceCompletion::AllCompleted => events.push(DomainEvent::AllLegacyProjectPiecesImported {
                project_id: self.project_id,
            }),
            PieceCompletion::Completed | PieceCompletion::Unchanged => {}
        }

        Ok((next, events))
    }

    /// Marks a single piece as failed
    ///
    /// Returns whether the piece changed.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::PieceNotFound`] if the piece is unknown.
    pub fn fail_piece(
        &self,
        component_id: ComponentId,
        errors: Vec<String>,
    ) -> Result<(Self, bool), AggregateError> {
        let mut next = self.clone();
        let changed = batch::fail_piece(&mut next.pieces, component_id, errors)?;
        Ok((next, changed))
    }

    /// Fails every pending piece and closes the import for uploads
    pub fn mark_as_failed(&self, reason: &str) -> Self {
        let mut next = self.clone();
        batch::fail_pending(&mut next.pieces, reason);
        next.is_accepting_files = false;
        next
    }

    fn has_file(&self, file_type: LegacyProjectImportFileType) -> bool {
        self.files.iter().any(|f| f.file_type == file_type)
    }

    fn resolve_pieces(&self) -> Vec<LegacyProjectImportPiece> {
        LegacyProjectImportPiece::ALL
            .into_iter()
            .filter(|piece| {
                *piece != LegacyProjectImportPiece::Solutions
                    || self.has_file(LegacyProjectImportFileType::Output)
            })
            .collect()
    }

    fn piece_requests(
        &self,
        pieces: Vec<PieceComponent<LegacyProjectImportPiece>>,
    ) -> Vec<DomainEvent> {
        pieces
            .into_iter()
            .map(|piece| DomainEvent::LegacyProjectImportPieceRequested {
                project_id: self.project_id,
                component_id: piece.id,
                piece: piece.kind,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_required_files() -> LegacyProjectImport {
        let mut import =
            LegacyProjectImport::start(ResourceId::new(), ResourceId::new(), UserId::new());
        for file_type in LegacyProjectImportFileType::REQUIRED {
            let file = LegacyProjectImportFile::new(format!("/tmp/{file_type}"), file_type);
            import = import.add_file(file).unwrap();
        }
        import
    }

    fn id_of(import: &LegacyProjectImport, kind: LegacyProjectImportPiece) -> ComponentId {
        import
            .pieces()
            .iter()
            .find(|p| p.kind == kind)
            .map(|p| p.id)
            .unwrap()
    }

    #[test]
    fn test_add_file_replaces_same_type() {
        let import = LegacyProjectImport::start(ResourceId::new(), ResourceId::new(), UserId::new());
        let import = import
            .add_file(LegacyProjectImportFile::new("/a/pu.dat", LegacyProjectImportFileType::PuDat))
            .unwrap()
            .add_file(LegacyProjectImportFile::new("/b/pu.dat", LegacyProjectImportFileType::PuDat))
            .unwrap();

        assert_eq!(import.files().len(), 1);
        assert_eq!(import.files()[0].location, "/b/pu.dat");
    }

    #[test]
    fn test_run_requires_mandatory_files() {
        let import = LegacyProjectImport::start(ResourceId::new(), ResourceId::new(), UserId::new())
            .add_file(LegacyProjectImportFile::new("/a/pu.dat", LegacyProjectImportFileType::PuDat))
            .unwrap();

        match import.run() {
            Err(AggregateError::MissingRequiredFiles(missing)) => {
                assert_eq!(missing.len(), 4);
                assert!(missing.contains(&"grid.zip".to_string()));
                assert!(!missing.contains(&"pu.dat".to_string()));
            }
            other => panic!("expected missing files, got {other:?}"),
        }
    }

    #[test]
    fn test_run_requests_planning_grid_first() {
        let (import, events) = with_required_files().run().unwrap();

        assert!(!import.is_accepting_files());
        assert_eq!(import.pieces().len(), 4);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[1],
            DomainEvent::LegacyProjectImportPieceRequested {
                piece: LegacyProjectImportPiece::PlanningGrid,
                ..
            }
        ));
    }

    #[test]
    fn test_output_file_adds_solutions_piece() {
        let import = with_required_files()
            .add_file(LegacyProjectImportFile::new(
                "/tmp/output.zip",
                LegacyProjectImportFileType::Output,
            ))
            .unwrap();
        let (import, _) = import.run().unwrap();
        assert!(import
            .pieces()
            .iter()
            .any(|p| p.kind == LegacyProjectImportPiece::Solutions));
    }

    #[test]
    fn test_files_rejected_after_run() {
        let (import, _) = with_required_files().run().unwrap();
        let result = import.add_file(LegacyProjectImportFile::new(
            "/tmp/bound.dat",
            LegacyProjectImportFileType::BoundDat,
        ));
        assert_eq!(result, Err(AggregateError::NotAcceptingFiles));
        assert_eq!(import.run().map(|_| ()), Err(AggregateError::NotAcceptingFiles));
    }

    #[test]
    fn test_batches_complete_in_order() {
        let (import, _) = with_required_files().run().unwrap();
        let grid = id_of(&import, LegacyProjectImportPiece::PlanningGrid);
        let pus = id_of(&import, LegacyProjectImportPiece::ScenarioPusData);
        let features = id_of(&import, LegacyProjectImportPiece::Features);
        let spec = id_of(&import, LegacyProjectImportPiece::FeaturesSpecification);

        let (import, events) = import.complete_piece(grid, vec![]).unwrap();
        assert_eq!(events.iter().filter(|e| e.is_piece_request()).count(), 2);

        // Batch 1 still has an outstanding piece
        let (import, events) = import.complete_piece(features, vec![]).unwrap();
        assert_eq!(events.len(), 1);

        let (import, events) = import.complete_piece(pus, vec![]).unwrap();
        assert!(matches!(
            events.last(),
            Some(DomainEvent::LegacyProjectImportPieceRequested {
                piece: LegacyProjectImportPiece::FeaturesSpecification,
                ..
            })
        ));

        let (import, events) = import.complete_piece(spec, vec![]).unwrap();
        assert_eq!(
            events.last(),
            Some(&DomainEvent::AllLegacyProjectPiecesImported {
                project_id: import.project_id()
            })
        );
        assert_eq!(import.status(), AggregateStatus::FullyImported);
    }

    #[test]
    fn test_mark_as_failed_closes_uploads() {
        let import = with_required_files();
        let failed = import.mark_as_failed("upload cancelled");
        assert!(!failed.is_accepting_files());
        assert_eq!(failed.status(), AggregateStatus::Failed);
    }
}
