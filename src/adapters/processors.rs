//! File-backed piece processors
//!
//! Reference processors that move piece data through a [`FileRepository`]: the
//! export processor writes one JSON document per piece, the import processor
//! reads them back, and the legacy processor checks the uploaded files each
//! piece depends on. The CLI simulation runs on these.

use crate::adapters::files::FileRepository;
use crate::core::processors::{
    ExportPieceInput, ExportPieceOutput, ImportPieceInput, LegacyPieceInput, PieceProcessor,
    PieceWarnings, Processors,
};
use crate::domain::component::ComponentLocation;
use crate::domain::legacy::LegacyProjectImportFileType;
use crate::domain::piece::{ClonePiece, LegacyProjectImportPiece};
use crate::domain::{CloneError, Result};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

/// Writes each export piece as a JSON document
pub struct FileExportProcessor {
    files: Arc<dyn FileRepository>,
    failing: HashSet<ClonePiece>,
}

impl FileExportProcessor {
    pub fn new(files: Arc<dyn FileRepository>) -> Self {
        Self {
            files,
            failing: HashSet::new(),
        }
    }

    /// Makes the given piece fail
    pub fn failing(mut self, piece: ClonePiece) -> Self {
        self.failing.insert(piece);
        self
    }
}

#[async_trait]
impl PieceProcessor<ClonePiece, ExportPieceInput, ExportPieceOutput> for FileExportProcessor {
    fn is_supported(&self, _piece: &ClonePiece) -> bool {
        true
    }

    async fn run(&self, input: ExportPieceInput) -> Result<ExportPieceOutput> {
        if self.failing.contains(&input.piece) {
            return Err(CloneError::Processor(format!(
                "Export of {} failed",
                input.piece
            )));
        }

        let document = json!({
            "piece": input.piece,
            "resourceId": input.resource_id,
            "exportId": input.export_id,
        });
        let bytes = serde_json::to_vec_pretty(&document)?;
        let uri = self.files.save(&mut bytes.as_slice(), "json").await?;

        Ok(ExportPieceOutput {
            locations: vec![ComponentLocation::new(uri, input.piece.relative_path())],
        })
    }
}

/// Reads back the JSON documents of an import piece
pub struct FileImportProcessor {
    files: Arc<dyn FileRepository>,
    failing: HashSet<ClonePiece>,
}

impl FileImportProcessor {
    pub fn new(files: Arc<dyn FileRepository>) -> Self {
        Self {
            files,
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, piece: ClonePiece) -> Self {
        self.failing.insert(piece);
        self
    }
}

#[async_trait]
impl PieceProcessor<ClonePiece, ImportPieceInput, PieceWarnings> for FileImportProcessor {
    fn is_supported(&self, _piece: &ClonePiece) -> bool {
        true
    }

    async fn run(&self, input: ImportPieceInput) -> Result<PieceWarnings> {
        if self.failing.contains(&input.piece) {
            return Err(CloneError::Processor(format!(
                "Import of {} failed",
                input.piece
            )));
        }

        let mut warnings = Vec::new();
        if input.locations.is_empty() {
            warnings.push(format!("{} has no files in the archive", input.piece));
        }
        for location in &input.locations {
            let bytes = self.files.get(&location.uri).await?;
            let document: serde_json::Value = serde_json::from_slice(&bytes)?;
            if document.get("piece") != Some(&json!(input.piece)) {
                warnings.push(format!(
                    "{} does not describe {}",
                    location.relative_path, input.piece
                ));
            }
        }

        Ok(PieceWarnings { warnings })
    }
}

/// Checks that the files a legacy piece reads were uploaded and are readable
pub struct FileLegacyProcessor {
    files: Arc<dyn FileRepository>,
    failing: HashSet<LegacyProjectImportPiece>,
}

impl FileLegacyProcessor {
    pub fn new(files: Arc<dyn FileRepository>) -> Self {
        Self {
            files,
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, piece: LegacyProjectImportPiece) -> Self {
        self.failing.insert(piece);
        self
    }

    fn inputs_of(piece: LegacyProjectImportPiece) -> &'static [LegacyProjectImportFileType] {
        use LegacyProjectImportFileType::*;
        match piece {
            LegacyProjectImportPiece::PlanningGrid => &[PlanningGridShapefile],
            LegacyProjectImportPiece::ScenarioPusData => &[PuDat],
            LegacyProjectImportPiece::Features => &[SpecDat],
            LegacyProjectImportPiece::FeaturesSpecification => &[InputDat, SpecDat, PuvsprDat],
            LegacyProjectImportPiece::Solutions => &[Output],
        }
    }
}

#[async_trait]
impl PieceProcessor<LegacyProjectImportPiece, LegacyPieceInput, PieceWarnings>
    for FileLegacyProcessor
{
    fn is_supported(&self, _piece: &LegacyProjectImportPiece) -> bool {
        true
    }

    async fn run(&self, input: LegacyPieceInput) -> Result<PieceWarnings> {
        if self.failing.contains(&input.piece) {
            return Err(CloneError::Processor(format!(
                "Legacy piece {} failed",
                input.piece
            )));
        }

        for file_type in Self::inputs_of(input.piece) {
            let file = input
                .files
                .iter()
                .find(|f| f.file_type == *file_type)
                .ok_or_else(|| {
                    CloneError::Processor(format!("{} needs {}", input.piece, file_type))
                })?;
            self.files.get(&file.location).await?;
        }

        let mut warnings = Vec::new();
        if input.piece == LegacyProjectImportPiece::PlanningGrid
            && !input
                .files
                .iter()
                .any(|f| f.file_type == LegacyProjectImportFileType::BoundDat)
        {
            warnings.push("No bound.dat uploaded; planning unit boundaries are empty".to_string());
        }
        Ok(PieceWarnings { warnings })
    }
}

/// Pieces the file processors should fail, for exercising failure paths
#[derive(Debug, Clone, Default)]
pub struct FailingPieces {
    pub export: Option<ClonePiece>,
    pub import: Option<ClonePiece>,
    pub legacy: Option<LegacyProjectImportPiece>,
}

/// Registers the file processors for every piece kind
///
/// # Errors
///
/// Returns a processor error if a piece kind ends up registered twice.
pub fn file_processors(files: Arc<dyn FileRepository>, failing: FailingPieces) -> Result<Processors> {
    let mut export = FileExportProcessor::new(Arc::clone(&files));
    if let Some(piece) = failing.export {
        export = export.failing(piece);
    }
    let mut import = FileImportProcessor::new(Arc::clone(&files));
    if let Some(piece) = failing.import {
        import = import.failing(piece);
    }
    let mut legacy = FileLegacyProcessor::new(files);
    if let Some(piece) = failing.legacy {
        legacy = legacy.failing(piece);
    }

    let mut processors = Processors::default();
    processors.export.register_all(ClonePiece::ALL, Arc::new(export))?;
    processors.import.register_all(ClonePiece::ALL, Arc::new(import))?;
    processors
        .legacy
        .register_all(LegacyProjectImportPiece::ALL, Arc::new(legacy))?;
    Ok(processors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::files::LocalFileRepository;
    use crate::domain::ids::{ComponentId, ExportId, ImportId, ResourceId};
    use crate::domain::legacy::LegacyProjectImportFile;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_exported_piece_imports_without_warnings() {
        let dir = TempDir::new().unwrap();
        let files: Arc<dyn FileRepository> = Arc::new(LocalFileRepository::new(dir.path()));
        let export = FileExportProcessor::new(Arc::clone(&files));
        let import = FileImportProcessor::new(files);

        let output = export
            .run(ExportPieceInput {
                export_id: ExportId::new(),
                component_id: ComponentId::new(),
                resource_id: ResourceId::new(),
                piece: ClonePiece::ProjectMetadata,
            })
            .await
            .unwrap();
        assert_eq!(output.locations[0].relative_path, "project-metadata.json");

        let result = import
            .run(ImportPieceInput {
                import_id: ImportId::new(),
                component_id: ComponentId::new(),
                resource_id: ResourceId::new(),
                piece: ClonePiece::ProjectMetadata,
                locations: output.locations,
            })
            .await
            .unwrap();
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_legacy_piece_needs_its_files() {
        let dir = TempDir::new().unwrap();
        let files: Arc<dyn FileRepository> = Arc::new(LocalFileRepository::new(dir.path()));
        let legacy = FileLegacyProcessor::new(Arc::clone(&files));
        let uri = files.save(&mut &b"grid"[..], "zip").await.unwrap();

        let mut input = LegacyPieceInput {
            project_id: ResourceId::new(),
            scenario_id: ResourceId::new(),
            component_id: ComponentId::new(),
            piece: LegacyProjectImportPiece::PlanningGrid,
            files: vec![LegacyProjectImportFile::new(
                uri,
                LegacyProjectImportFileType::PlanningGridShapefile,
            )],
        };
        let result = legacy.run(input.clone()).await.unwrap();
        assert_eq!(result.warnings.len(), 1);

        input.piece = LegacyProjectImportPiece::Features;
        assert!(legacy.run(input).await.is_err());
    }

    #[test]
    fn test_file_processors_cover_every_piece() {
        let dir = TempDir::new().unwrap();
        let files: Arc<dyn FileRepository> = Arc::new(LocalFileRepository::new(dir.path()));
        let processors = file_processors(files, FailingPieces::default()).unwrap();

        assert_eq!(processors.export.len(), ClonePiece::ALL.len());
        assert_eq!(processors.import.len(), ClonePiece::ALL.len());
        assert_eq!(processors.legacy.len(), LegacyProjectImportPiece::ALL.len());
    }
}
