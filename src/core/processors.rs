//! Piece processors
//!
//! A processor does the actual work of one piece kind: it writes the files of
//! an export piece, or reads them back into the target resource for an import
//! piece. Processors are registered explicitly at startup, one per piece kind.

use crate::domain::component::ComponentLocation;
use crate::domain::ids::{ComponentId, ExportId, ImportId, ResourceId};
use crate::domain::legacy::LegacyProjectImportFile;
use crate::domain::piece::{ClonePiece, LegacyProjectImportPiece};
use crate::domain::{CloneError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;

/// Work for one piece kind
///
/// `P` is the piece kind, `I` the job input and `O` the result reported back
/// to the aggregate.
#[async_trait]
pub trait PieceProcessor<P, I, O>: Send + Sync {
    fn is_supported(&self, piece: &P) -> bool;

    async fn run(&self, input: I) -> Result<O>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPieceInput {
    pub export_id: ExportId,
    pub component_id: ComponentId,
    pub resource_id: ResourceId,
    pub piece: ClonePiece,
}

/// Files produced by an export piece
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportPieceOutput {
    pub locations: Vec<ComponentLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPieceInput {
    pub import_id: ImportId,
    pub component_id: ComponentId,
    pub resource_id: ResourceId,
    pub piece: ClonePiece,
    pub locations: Vec<ComponentLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyPieceInput {
    pub project_id: ResourceId,
    pub scenario_id: ResourceId,
    pub component_id: ComponentId,
    pub piece: LegacyProjectImportPiece,
    pub files: Vec<LegacyProjectImportFile>,
}

/// Non-fatal findings of an import or legacy piece
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PieceWarnings {
    pub warnings: Vec<String>,
}

pub type ExportPieceProcessor = dyn PieceProcessor<ClonePiece, ExportPieceInput, ExportPieceOutput>;
pub type ImportPieceProcessor = dyn PieceProcessor<ClonePiece, ImportPieceInput, PieceWarnings>;
pub type LegacyPieceProcessor =
    dyn PieceProcessor<LegacyProjectImportPiece, LegacyPieceInput, PieceWarnings>;

/// Table of processors keyed by piece kind
pub struct ProcessorRegistry<P, I, O> {
    processors: HashMap<P, Arc<dyn PieceProcessor<P, I, O>>>,
}

impl<P, I, O> Default for ProcessorRegistry<P, I, O> {
    fn default() -> Self {
        Self {
            processors: HashMap::new(),
        }
    }
}

impl<P, I, O> ProcessorRegistry<P, I, O>
where
    P: Copy + Eq + Hash + Display,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the processor of one piece kind
    ///
    /// # Errors
    ///
    /// Returns a processor error if the piece kind already has a processor or
    /// if the processor does not support it.
    pub fn register(
        &mut self,
        piece: P,
        processor: Arc<dyn PieceProcessor<P, I, O>>,
    ) -> Result<()> {
        if !processor.is_supported(&piece) {
            return Err(CloneError::Processor(format!(
                "Processor does not support piece {piece}"
            )));
        }
        if self.processors.contains_key(&piece) {
            return Err(CloneError::Processor(format!(
                "Piece {piece} already has a processor"
            )));
        }
        self.processors.insert(piece, processor);
        Ok(())
    }

    /// Registers one processor for every kind in `pieces` it supports
    ///
    /// # Errors
    ///
    /// Returns a processor error if one of the supported kinds is already taken.
    pub fn register_all(
        &mut self,
        pieces: impl IntoIterator<Item = P>,
        processor: Arc<dyn PieceProcessor<P, I, O>>,
    ) -> Result<()> {
        for piece in pieces {
            if processor.is_supported(&piece) {
                self.register(piece, Arc::clone(&processor))?;
            }
        }
        Ok(())
    }

    pub fn resolve(&self, piece: &P) -> Option<Arc<dyn PieceProcessor<P, I, O>>> {
        self.processors.get(piece).cloned()
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

/// The three registries used by the piece worker
#[derive(Default)]
pub struct Processors {
    pub export: ProcessorRegistry<ClonePiece, ExportPieceInput, ExportPieceOutput>,
    pub import: ProcessorRegistry<ClonePiece, ImportPieceInput, PieceWarnings>,
    pub legacy: ProcessorRegistry<LegacyProjectImportPiece, LegacyPieceInput, PieceWarnings>,
}
