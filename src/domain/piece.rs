//! Piece kinds and resource kinds
//!
//! A composite resource is exported and imported as a fixed, statically known
//! set of pieces. The enums here enumerate them, together with the batch each
//! piece belongs to on import.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of cloneable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A planning project and everything attached to it
    Project,
    /// A single scenario of a project
    Scenario,
}

impl ResourceKind {
    /// Returns the lowercase name used in notification kinds and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Scenario => "scenario",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "project" => Ok(Self::Project),
            "scenario" => Ok(Self::Scenario),
            other => Err(format!(
                "Invalid resource kind '{other}'. Must be one of: project, scenario"
            )),
        }
    }
}

/// Piece of a cloneable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClonePiece {
    ExportConfig,
    ProjectMetadata,
    PlanningAreaGadm,
    PlanningAreaCustom,
    PlanningAreaCustomGeojson,
    PlanningUnitsGrid,
    PlanningUnitsGridGeojson,
    ProjectCustomProtectedAreas,
    ProjectCustomFeatures,
    ScenarioMetadata,
    ScenarioProtectedAreas,
    ScenarioPlanningUnitsData,
    ScenarioFeaturesData,
    FeaturesSpecification,
    ScenarioInputFolder,
    MarxanExecutionMetadata,
    ScenarioRunResults,
    ScenarioOutputFolder,
}

impl ClonePiece {
    /// Every piece kind, in declaration order
    pub const ALL: [ClonePiece; 18] = [
        ClonePiece::ExportConfig,
        ClonePiece::ProjectMetadata,
        ClonePiece::PlanningAreaGadm,
        ClonePiece::PlanningAreaCustom,
        ClonePiece::PlanningAreaCustomGeojson,
        ClonePiece::PlanningUnitsGrid,
        ClonePiece::PlanningUnitsGridGeojson,
        ClonePiece::ProjectCustomProtectedAreas,
        ClonePiece::ProjectCustomFeatures,
        ClonePiece::ScenarioMetadata,
        ClonePiece::ScenarioProtectedAreas,
        ClonePiece::ScenarioPlanningUnitsData,
        ClonePiece::ScenarioFeaturesData,
        ClonePiece::FeaturesSpecification,
        ClonePiece::ScenarioInputFolder,
        ClonePiece::MarxanExecutionMetadata,
        ClonePiece::ScenarioRunResults,
        ClonePiece::ScenarioOutputFolder,
    ];

    /// Batch this piece belongs to when imported
    ///
    /// Metadata comes first, then the planning area and grid that everything
    /// else references, then project-level layers, then scenario data, then
    /// run outputs.
    pub fn import_order(&self) -> u32 {
        match self {
            Self::ExportConfig | Self::ProjectMetadata => 0,
            Self::PlanningAreaGadm
            | Self::PlanningAreaCustom
            | Self::PlanningAreaCustomGeojson
            | Self::PlanningUnitsGrid
            | Self::PlanningUnitsGridGeojson => 1,
            Self::ProjectCustomProtectedAreas
            | Self::ProjectCustomFeatures
            | Self::ScenarioMetadata => 2,
            Self::ScenarioProtectedAreas
            | Self::ScenarioPlanningUnitsData
            | Self::ScenarioFeaturesData
            | Self::FeaturesSpecification
            | Self::ScenarioInputFolder
            | Self::MarxanExecutionMetadata => 3,
            Self::ScenarioRunResults | Self::ScenarioOutputFolder => 4,
        }
    }

    /// Archive-relative path of the piece's primary file
    pub fn relative_path(&self) -> &'static str {
        match self {
            Self::ExportConfig => "config.json",
            Self::ProjectMetadata => "project-metadata.json",
            Self::PlanningAreaGadm => "planning-area/gadm.json",
            Self::PlanningAreaCustom => "planning-area/custom.json",
            Self::PlanningAreaCustomGeojson => "planning-area/custom.geojson",
            Self::PlanningUnitsGrid => "planning-units/grid.json",
            Self::PlanningUnitsGridGeojson => "planning-units/grid.geojson",
            Self::ProjectCustomProtectedAreas => "protected-areas/custom.json",
            Self::ProjectCustomFeatures => "features/custom.json",
            Self::ScenarioMetadata => "scenario/metadata.json",
            Self::ScenarioProtectedAreas => "scenario/protected-areas.json",
            Self::ScenarioPlanningUnitsData => "scenario/planning-units-data.json",
            Self::ScenarioFeaturesData => "scenario/features-data.json",
            Self::FeaturesSpecification => "scenario/features-specification.json",
            Self::ScenarioInputFolder => "scenario/input.zip",
            Self::MarxanExecutionMetadata => "scenario/marxan-execution-metadata.json",
            Self::ScenarioRunResults => "scenario/run-results.json",
            Self::ScenarioOutputFolder => "scenario/output.zip",
        }
    }
}

impl fmt::Display for ClonePiece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Piece of a legacy (externally authored) project import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegacyProjectImportPiece {
    PlanningGrid,
    ScenarioPusData,
    Features,
    FeaturesSpecification,
    Solutions,
}

impl LegacyProjectImportPiece {
    /// Every legacy piece kind, in declaration order
    pub const ALL: [LegacyProjectImportPiece; 5] = [
        LegacyProjectImportPiece::PlanningGrid,
        LegacyProjectImportPiece::ScenarioPusData,
        LegacyProjectImportPiece::Features,
        LegacyProjectImportPiece::FeaturesSpecification,
        LegacyProjectImportPiece::Solutions,
    ];

    /// Batch this piece belongs to
    pub fn order(&self) -> u32 {
        match self {
            Self::PlanningGrid => 0,
            Self::ScenarioPusData | Self::Features => 1,
            Self::FeaturesSpecification => 2,
            Self::Solutions => 3,
        }
    }
}

impl fmt::Display for LegacyProjectImportPiece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Status of a single piece
///
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    /// Waiting to be processed, or being processed
    #[default]
    Submitted,
    /// Processed successfully
    Completed,
    /// Processing failed
    Failed,
}

impl ComponentStatus {
    /// Whether the status can no longer change
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Submitted)
    }
}
