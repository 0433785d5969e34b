//! Resource piece resolution
//!
//! Decides which export pieces make up a resource. The real answer depends on
//! the resource's data (custom planning area or GADM, protected areas, run
//! results); the static resolver covers the common project and scenario shapes.

use crate::domain::ids::ResourceId;
use crate::domain::piece::{ClonePiece, ResourceKind};
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Resolves the pieces to export for a resource
#[async_trait]
pub trait ResourcePieces: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the resource is unknown to the resolver.
    async fn resolve_for(&self, resource_id: ResourceId, kind: ResourceKind)
        -> Result<Vec<ClonePiece>>;
}

/// Fixed piece lists per resource kind, overridable per resource
#[derive(Debug, Clone, Default)]
pub struct StaticResourcePieces {
    overrides: HashMap<ResourceId, Vec<ClonePiece>>,
}

impl StaticResourcePieces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `pieces` for one resource instead of its kind's defaults
    pub fn with_pieces(mut self, resource_id: ResourceId, pieces: Vec<ClonePiece>) -> Self {
        self.overrides.insert(resource_id, pieces);
        self
    }

    /// Default pieces of a resource kind
    pub fn defaults(kind: ResourceKind) -> Vec<ClonePiece> {
        match kind {
            ResourceKind::Project => vec![
                ClonePiece::ExportConfig,
                ClonePiece::ProjectMetadata,
                ClonePiece::PlanningAreaGadm,
                ClonePiece::PlanningUnitsGrid,
                ClonePiece::ProjectCustomFeatures,
                ClonePiece::ScenarioMetadata,
                ClonePiece::ScenarioPlanningUnitsData,
                ClonePiece::ScenarioFeaturesData,
            ],
            ResourceKind::Scenario => vec![
                ClonePiece::ExportConfig,
                ClonePiece::ScenarioMetadata,
                ClonePiece::ScenarioProtectedAreas,
                ClonePiece::ScenarioPlanningUnitsData,
                ClonePiece::ScenarioFeaturesData,
                ClonePiece::ScenarioRunResults,
            ],
        }
    }
}

#[async_trait]
impl ResourcePieces for StaticResourcePieces {
    async fn resolve_for(
        &self,
        resource_id: ResourceId,
        kind: ResourceKind,
    ) -> Result<Vec<ClonePiece>> {
        Ok(self
            .overrides
            .get(&resource_id)
            .cloned()
            .unwrap_or_else(|| Self::defaults(kind)))
    }
}
