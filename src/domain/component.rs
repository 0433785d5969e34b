//! Piece component snapshots and their output locations

use crate::domain::ids::ComponentId;
use crate::domain::piece::ComponentStatus;
use serde::{Deserialize, Serialize};

/// Where a piece's output lives: a storage URI plus its path inside the archive
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentLocation {
    /// Storage URI returned by the file repository
    pub uri: String,

    /// Path of the file relative to the archive root
    pub relative_path: String,
}

impl ComponentLocation {
    /// Creates a new component location
    pub fn new(uri: impl Into<String>, relative_path: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            relative_path: relative_path.into(),
        }
    }
}

/// One independently processable piece of an export or import
///
/// `K` is the piece kind enumeration of the owning aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceComponent<K> {
    /// Piece identifier, unique within its aggregate
    pub id: ComponentId,

    /// Which piece this is
    pub kind: K,

    /// Processing status
    #[serde(default)]
    pub status: ComponentStatus,

    /// Batch number; batch `n + 1` starts only after batch `n` completes
    #[serde(default)]
    pub order: u32,

    /// Errors reported when the piece failed
    #[serde(default)]
    pub errors: Vec<String>,

    /// Non-fatal warnings reported by the piece processor
    #[serde(default)]
    pub warnings: Vec<String>,

    /// Files produced (export) or consumed (import) by this piece
    #[serde(default)]
    pub locations: Vec<ComponentLocation>,
}

impl<K> PieceComponent<K> {
    /// Creates a submitted piece in the given batch
    pub fn submitted(kind: K, order: u32) -> Self {
        Self {
            id: ComponentId::new(),
            kind,
            status: ComponentStatus::Submitted,
            order,
            errors: Vec::new(),
            warnings: Vec::new(),
            locations: Vec::new(),
        }
    }

    /// Sets the piece locations
    pub fn with_locations(mut self, locations: Vec<ComponentLocation>) -> Self {
        self.locations = locations;
        self
    }

    /// Check if the piece completed successfully
    pub fn is_completed(&self) -> bool {
        self.status == ComponentStatus::Completed
    }

    /// Check if the piece failed
    pub fn is_failed(&self) -> bool {
        self.status == ComponentStatus::Failed
    }

    /// Mark the piece as completed with the processor's warnings
    pub fn mark_completed(&mut self, warnings: Vec<String>) {
        self.status = ComponentStatus::Completed;
        self.warnings = warnings;
    }

    /// Mark the piece as failed
    pub fn mark_failed(&mut self, errors: Vec<String>) {
        self.status = ComponentStatus::Failed;
        self.errors = errors;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::piece::ClonePiece;

    #[test]
    fn test_submitted_piece_defaults() {
        let piece = PieceComponent::submitted(ClonePiece::ProjectMetadata, 0);
        assert_eq!(piece.status, ComponentStatus::Submitted);
        assert!(piece.errors.is_empty());
        assert!(piece.warnings.is_empty());
        assert!(piece.locations.is_empty());
    }

    #[test]
    fn test_mark_completed_records_warnings() {
        let mut piece = PieceComponent::submitted(ClonePiece::PlanningUnitsGrid, 1);
        piece.mark_completed(vec!["grid has orphan cells".to_string()]);
        assert!(piece.is_completed());
        assert_eq!(piece.warnings, vec!["grid has orphan cells".to_string()]);
    }

    #[test]
    fn test_mark_failed_records_errors() {
        let mut piece = PieceComponent::submitted(ClonePiece::ScenarioRunResults, 4);
        piece.mark_failed(vec!["archive truncated".to_string()]);
        assert!(piece.is_failed());
        assert_eq!(piece.errors.len(), 1);
    }

    #[test]
    fn test_location_serializes_camel_case() {
        let location = ComponentLocation::new("/tmp/a.json", "project-metadata.json");
        let json = serde_json::to_value(&location).unwrap();
        assert_eq!(json["relativePath"], "project-metadata.json");
    }

    #[test]
    fn test_snapshot_deserializes_with_defaults() {
        let json = serde_json::json!({
            "id": "7d44b88c-4199-4bad-97dc-d78268e01398",
            "kind": "features-specification"
        });
        let piece: PieceComponent<ClonePiece> = serde_json::from_value(json).unwrap();
        assert_eq!(piece.kind, ClonePiece::FeaturesSpecification);
        assert_eq!(piece.status, ComponentStatus::Submitted);
        assert_eq!(piece.order, 0);
    }
}
