//! Commands
//!
//! Each command is a plain struct handled by exactly one handler. The
//! [`Command`] enum wraps them so sagas and handlers can emit follow-up work
//! without knowing who executes it.

use crate::domain::component::ComponentLocation;
use crate::domain::ids::{ComponentId, ExportId, ImportId, ResourceId, UserId};
use crate::domain::legacy::LegacyProjectImportFile;
use crate::domain::piece::{ClonePiece, ResourceKind};

/// Start exporting a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestExport {
    /// Id the new export will be stored under
    pub export_id: ExportId,
    pub resource_id: ResourceId,
    pub resource_kind: ResourceKind,
}

impl RequestExport {
    /// Creates the command with a fresh export id
    pub fn new(resource_id: ResourceId, resource_kind: ResourceKind) -> Self {
        Self {
            export_id: ExportId::new(),
            resource_id,
            resource_kind,
        }
    }
}

/// Enqueue the job producing one export piece
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePieceExport {
    pub export_id: ExportId,
    pub component_id: ComponentId,
    pub resource_id: ResourceId,
    pub piece: ClonePiece,
}

/// Record the files produced by an export piece
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteExportPiece {
    pub export_id: ExportId,
    pub component_id: ComponentId,
    pub locations: Vec<ComponentLocation>,
}

/// Record that an export piece could not be produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkExportPieceAsFailed {
    pub export_id: ExportId,
    pub component_id: ComponentId,
    pub errors: Vec<String>,
}

/// Fail a whole export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkExportAsFailed {
    pub resource_id: ResourceId,
    pub resource_kind: ResourceKind,
    pub export_id: ExportId,
    pub reason: String,
}

/// Notify that an export produced every piece
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkExportAsFinished {
    pub export_id: ExportId,
}

/// Source of one piece of an import: its kind and the archive files it reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPieceSource {
    pub piece: ClonePiece,
    pub locations: Vec<ComponentLocation>,
}

/// Start importing an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestImport {
    /// Id the new import will be stored under
    pub import_id: ImportId,
    pub resource_id: ResourceId,
    pub project_id: ResourceId,
    pub owner_id: UserId,
    pub resource_kind: ResourceKind,
    pub archive_location: String,
    pub pieces: Vec<ImportPieceSource>,
    /// Export that produced the archive; makes this import a clone
    pub source_export: Option<ExportId>,
}

/// Record that an import piece finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletePiece {
    pub import_id: ImportId,
    pub component_id: ComponentId,
    pub warnings: Vec<String>,
}

/// Record that an import piece could not be imported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkImportPieceAsFailed {
    pub import_id: ImportId,
    pub component_id: ComponentId,
    pub errors: Vec<String>,
}

/// Fail a whole import
///
/// The import is addressed by its repository key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkImportAsFailed {
    pub import_id: ImportId,
    pub reason: String,
}

/// Notify that an import finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkImportAsFinished {
    pub import_id: ImportId,
    pub resource_id: ResourceId,
    pub resource_kind: ResourceKind,
}

/// Notify that a clone (paired export and import) finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkCloneAsFinished {
    pub export_id: ExportId,
    pub resource_id: ResourceId,
    pub resource_kind: ResourceKind,
}

/// Open a legacy project import for file uploads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartLegacyProjectImport {
    pub project_id: ResourceId,
    pub scenario_id: ResourceId,
    pub owner_id: UserId,
}

/// Attach an uploaded file to a legacy project import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddFileToLegacyProjectImport {
    pub project_id: ResourceId,
    pub file: LegacyProjectImportFile,
}

/// Stop accepting files and start processing a legacy project import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLegacyProjectImport {
    pub project_id: ResourceId,
}

/// Record that a legacy piece finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteLegacyProjectImportPiece {
    pub project_id: ResourceId,
    pub component_id: ComponentId,
    pub warnings: Vec<String>,
}

/// Record that a legacy piece could not be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkLegacyProjectImportPieceAsFailed {
    pub project_id: ResourceId,
    pub component_id: ComponentId,
    pub errors: Vec<String>,
}

/// Fail a whole legacy project import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkLegacyProjectImportAsFailed {
    pub project_id: ResourceId,
    pub reason: String,
}

/// Notify that a legacy project import finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkLegacyProjectImportAsFinished {
    pub project_id: ResourceId,
}

/// Any command the dispatcher can route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    RequestExport(RequestExport),
    SchedulePieceExport(SchedulePieceExport),
    CompleteExportPiece(CompleteExportPiece),
    MarkExportPieceAsFailed(MarkExportPieceAsFailed),
    MarkExportAsFailed(MarkExportAsFailed),
    MarkExportAsFinished(MarkExportAsFinished),
    RequestImport(RequestImport),
    CompletePiece(CompletePiece),
    MarkImportPieceAsFailed(MarkImportPieceAsFailed),
    MarkImportAsFailed(MarkImportAsFailed),
    MarkImportAsFinished(MarkImportAsFinished),
    MarkCloneAsFinished(MarkCloneAsFinished),
    StartLegacyProjectImport(StartLegacyProjectImport),
    AddFileToLegacyProjectImport(AddFileToLegacyProjectImport),
    RunLegacyProjectImport(RunLegacyProjectImport),
    CompleteLegacyProjectImportPiece(CompleteLegacyProjectImportPiece),
    MarkLegacyProjectImportPieceAsFailed(MarkLegacyProjectImportPieceAsFailed),
    MarkLegacyProjectImportAsFailed(MarkLegacyProjectImportAsFailed),
    MarkLegacyProjectImportAsFinished(MarkLegacyProjectImportAsFinished),
}

macro_rules! command_conversions {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Command {
                fn from(command: $variant) -> Self {
                    Command::$variant(command)
                }
            }
        )*

        impl Command {
            /// Command name used in logs
            pub fn name(&self) -> &'static str {
                match self {
                    $(Command::$variant(_) => stringify!($variant),)*
                }
            }
        }
    };
}

command_conversions!(
    RequestExport,
    SchedulePieceExport,
    CompleteExportPiece,
    MarkExportPieceAsFailed,
    MarkExportAsFailed,
    MarkExportAsFinished,
    RequestImport,
    CompletePiece,
    MarkImportPieceAsFailed,
    MarkImportAsFailed,
    MarkImportAsFinished,
    MarkCloneAsFinished,
    StartLegacyProjectImport,
    AddFileToLegacyProjectImport,
    RunLegacyProjectImport,
    CompleteLegacyProjectImportPiece,
    MarkLegacyProjectImportPieceAsFailed,
    MarkLegacyProjectImportAsFailed,
    MarkLegacyProjectImportAsFinished,
);

impl Command {
    /// Whether this command reports a failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Command::MarkExportPieceAsFailed(_)
                | Command::MarkExportAsFailed(_)
                | Command::MarkImportPieceAsFailed(_)
                | Command::MarkImportAsFailed(_)
                | Command::MarkLegacyProjectImportPieceAsFailed(_)
                | Command::MarkLegacyProjectImportAsFailed(_)
        )
    }
}
