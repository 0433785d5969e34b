//! Files uploaded for a legacy project import

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of a file uploaded for a legacy project import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegacyProjectImportFileType {
    PlanningGridShapefile,
    InputDat,
    PuDat,
    SpecDat,
    PuvsprDat,
    BoundDat,
    Output,
}

impl LegacyProjectImportFileType {
    /// Files a legacy project import cannot run without
    pub const REQUIRED: [LegacyProjectImportFileType; 5] = [
        LegacyProjectImportFileType::PlanningGridShapefile,
        LegacyProjectImportFileType::InputDat,
        LegacyProjectImportFileType::PuDat,
        LegacyProjectImportFileType::SpecDat,
        LegacyProjectImportFileType::PuvsprDat,
    ];

    /// Conventional file name of this type
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::PlanningGridShapefile => "grid.zip",
            Self::InputDat => "input.dat",
            Self::PuDat => "pu.dat",
            Self::SpecDat => "spec.dat",
            Self::PuvsprDat => "puvspr.dat",
            Self::BoundDat => "bound.dat",
            Self::Output => "output.zip",
        }
    }
}

impl fmt::Display for LegacyProjectImportFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// A file uploaded for a legacy project import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyProjectImportFile {
    /// Storage location of the uploaded file
    pub location: String,

    /// What the file contains
    #[serde(rename = "type")]
    pub file_type: LegacyProjectImportFileType,
}

impl LegacyProjectImportFile {
    /// Creates a new file reference
    pub fn new(location: impl Into<String>, file_type: LegacyProjectImportFileType) -> Self {
        Self {
            location: location.into(),
            file_type,
        }
    }
}
