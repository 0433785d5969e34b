//! Batch-ordered piece completion
//!
//! Pieces are grouped by their `order` into batches. A batch is requested only
//! once every piece of the previous populated batch has completed, and the
//! aggregate is fully imported once every piece of every batch has completed.
//! These functions hold that logic for every aggregate; they perform no I/O.

use crate::domain::component::PieceComponent;
use crate::domain::errors::AggregateError;
use crate::domain::ids::ComponentId;
use std::collections::HashSet;

/// State of an aggregate derived from its pieces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateStatus {
    /// Pieces of the active batch are still being processed
    InProgress,
    /// A batch just completed and none of the next batch has finished yet
    CurrentBatchComplete,
    /// Every piece of every batch completed
    FullyImported,
    /// At least one piece failed
    Failed,
}

/// Outcome of completing a piece
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PieceCompletion<K> {
    /// The piece was already in a terminal state; nothing changed
    Unchanged,
    /// The piece completed; its batch still has outstanding pieces
    Completed,
    /// The piece closed its batch; these are the pieces of the next batch
    NextBatch(Vec<PieceComponent<K>>),
    /// The piece was the last outstanding piece of the aggregate
    AllCompleted,
}

/// Checks that piece ids are unique and that there is at least one piece
pub fn validate_pieces<K>(pieces: &[PieceComponent<K>]) -> Result<(), AggregateError> {
    if pieces.is_empty() {
        return Err(AggregateError::NoPieces);
    }

    let mut seen = HashSet::with_capacity(pieces.len());
    for piece in pieces {
        if !seen.insert(piece.id) {
            return Err(AggregateError::DuplicatePiece(piece.id));
        }
    }
    Ok(())
}

/// Pieces of the lowest populated batch
pub fn first_batch<K: Clone>(pieces: &[PieceComponent<K>]) -> Vec<PieceComponent<K>> {
    match pieces.iter().map(|p| p.order).min() {
        Some(first) => batch(pieces, first),
        None => Vec::new(),
    }
}

/// Pieces with the given order
pub fn batch<K: Clone>(pieces: &[PieceComponent<K>], order: u32) -> Vec<PieceComponent<K>> {
    pieces.iter().filter(|p| p.order == order).cloned().collect()
}

/// Whether every piece with the given order has completed
pub fn is_batch_complete<K>(pieces: &[PieceComponent<K>], order: u32) -> bool {
    pieces
        .iter()
        .filter(|p| p.order == order)
        .all(|p| p.is_completed())
}

/// Whether every piece across every batch has completed
pub fn all_completed<K>(pieces: &[PieceComponent<K>]) -> bool {
    pieces.iter().all(|p| p.is_completed())
}

/// Lowest populated batch after `order`
///
/// Batch numbers may have gaps, so "next" means the next one that has pieces.
pub fn next_batch_order<K>(pieces: &[PieceComponent<K>], order: u32) -> Option<u32> {
    pieces.iter().map(|p| p.order).filter(|o| *o > order).min()
}

/// Completes a piece and works out what has to happen next
///
/// # Errors
///
/// Returns [`AggregateError::PieceNotFound`] if no piece has the given id.
pub fn complete_piece<K: Clone>(
    pieces: &mut [PieceComponent<K>],
    component_id: ComponentId,
    warnings: Vec<String>,
) -> Result<PieceCompletion<K>, AggregateError> {
    let piece = pieces
        .iter_mut()
        .find(|p| p.id == component_id)
        .ok_or(AggregateError::PieceNotFound(component_id))?;

    // Duplicate deliveries and completions racing a failure land here
    if piece.status.is_terminal() {
        return Ok(PieceCompletion::Unchanged);
    }

    piece.mark_completed(warnings);
    let current_batch = piece.order;

    if !is_batch_complete(pieces, current_batch) {
        return Ok(PieceCompletion::Completed);
    }

    if let Some(next) = next_batch_order(pieces, current_batch) {
        return Ok(PieceCompletion::NextBatch(batch(pieces, next)));
    }

    if all_completed(pieces) {
        Ok(PieceCompletion::AllCompleted)
    } else {
        Ok(PieceCompletion::Completed)
    }
}

/// Fails a single piece
///
/// Returns `false` when the piece was already terminal and nothing changed.
///
/// # Errors
///
/// Returns [`AggregateError::PieceNotFound`] if no piece has the given id.
pub fn fail_piece<K>(
    pieces: &mut [PieceComponent<K>],
    component_id: ComponentId,
    errors: Vec<String>,
) -> Result<bool, AggregateError> {
    let piece = pieces
        .iter_mut()
        .find(|p| p.id == component_id)
        .ok_or(AggregateError::PieceNotFound(component_id))?;

    if piece.status.is_terminal() {
        return Ok(false);
    }

    piece.mark_failed(errors);
    Ok(true)
}

/// Fails every piece that has not reached a terminal state
///
/// Returns the number of pieces that changed.
pub fn fail_pending<K>(pieces: &mut [PieceComponent<K>], reason: &str) -> usize {
    let mut failed = 0;
    for piece in pieces.iter_mut().filter(|p| !p.status.is_terminal()) {
        piece.mark_failed(vec![reason.to_string()]);
        failed += 1;
    }
    failed
}

/// Derives the aggregate status from its pieces
pub fn derive_status<K>(pieces: &[PieceComponent<K>]) -> AggregateStatus {
    if pieces.iter().any(|p| p.is_failed()) {
        return AggregateStatus::Failed;
    }
    if all_completed(pieces) {
        return AggregateStatus::FullyImported;
    }

    let active = pieces
        .iter()
        .filter(|p| !p.is_completed())
        .map(|p| p.order)
        .min()
        .unwrap_or_default();

    let active_started = pieces
        .iter()
        .any(|p| p.order == active && p.is_completed());
    let earlier_done = pieces.iter().any(|p| p.order < active);

    if earlier_done && !active_started {
        AggregateStatus::CurrentBatchComplete
    } else {
        AggregateStatus::InProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::piece::{ClonePiece, ComponentStatus};

    fn pieces(spec: &[(ClonePiece, u32)]) -> Vec<PieceComponent<ClonePiece>> {
        spec.iter()
            .map(|(kind, order)| PieceComponent::submitted(*kind, *order))
            .collect()
    }

    #[test]
    fn test_completing_unknown_piece_fails() {
        let mut pieces = pieces(&[(ClonePiece::ProjectMetadata, 0)]);
        let missing = ComponentId::new();
        let result = complete_piece(&mut pieces, missing, vec![]);
        assert_eq!(result, Err(AggregateError::PieceNotFound(missing)));
    }

    #[test]
    fn test_completing_twice_is_unchanged() {
        let mut pieces = pieces(&[
            (ClonePiece::ProjectMetadata, 0),
            (ClonePiece::PlanningAreaGadm, 1),
        ]);
        let id = pieces[0].id;

        let first = complete_piece(&mut pieces, id, vec!["w".to_string()]).unwrap();
        assert!(matches!(first, PieceCompletion::NextBatch(_)));

        let second = complete_piece(&mut pieces, id, vec![]).unwrap();
        assert_eq!(second, PieceCompletion::Unchanged);
        assert_eq!(pieces[0].warnings, vec!["w".to_string()]);
    }

    #[test]
    fn test_next_batch_only_after_whole_batch() {
        let mut pieces = pieces(&[
            (ClonePiece::PlanningAreaGadm, 0),
            (ClonePiece::PlanningUnitsGrid, 0),
            (ClonePiece::ProjectCustomFeatures, 1),
        ]);
        let (a, b) = (pieces[0].id, pieces[1].id);

        assert_eq!(
            complete_piece(&mut pieces, a, vec![]).unwrap(),
            PieceCompletion::Completed
        );

        match complete_piece(&mut pieces, b, vec![]).unwrap() {
            PieceCompletion::NextBatch(next) => {
                assert_eq!(next.len(), 1);
                assert_eq!(next[0].kind, ClonePiece::ProjectCustomFeatures);
            }
            other => panic!("expected next batch, got {other:?}"),
        }
    }

    #[test]
    fn test_gaps_between_batches_are_skipped() {
        let mut pieces = pieces(&[
            (ClonePiece::ProjectMetadata, 0),
            (ClonePiece::ScenarioRunResults, 4),
        ]);
        let id = pieces[0].id;
        match complete_piece(&mut pieces, id, vec![]).unwrap() {
            PieceCompletion::NextBatch(next) => assert_eq!(next[0].order, 4),
            other => panic!("expected next batch, got {other:?}"),
        }
    }

    #[test]
    fn test_last_piece_completes_all() {
        let mut pieces = pieces(&[
            (ClonePiece::ProjectMetadata, 0),
            (ClonePiece::PlanningAreaGadm, 1),
        ]);
        let (a, b) = (pieces[0].id, pieces[1].id);
        complete_piece(&mut pieces, a, vec![]).unwrap();
        assert_eq!(
            complete_piece(&mut pieces, b, vec![]).unwrap(),
            PieceCompletion::AllCompleted
        );
    }

    #[test]
    fn test_last_batch_with_failed_piece_never_completes_all() {
        let mut pieces = pieces(&[
            (ClonePiece::ProjectMetadata, 0),
            (ClonePiece::ExportConfig, 0),
        ]);
        let (a, b) = (pieces[0].id, pieces[1].id);
        assert!(fail_piece(&mut pieces, b, vec!["boom".to_string()]).unwrap());
        assert_eq!(
            complete_piece(&mut pieces, a, vec![]).unwrap(),
            PieceCompletion::Completed
        );
        assert_eq!(derive_status(&pieces), AggregateStatus::Failed);
    }

    #[test]
    fn test_completing_failed_piece_is_unchanged() {
        let mut pieces = pieces(&[(ClonePiece::ProjectMetadata, 0)]);
        let id = pieces[0].id;
        fail_piece(&mut pieces, id, vec![]).unwrap();
        assert_eq!(
            complete_piece(&mut pieces, id, vec![]).unwrap(),
            PieceCompletion::Unchanged
        );
        assert_eq!(pieces[0].status, ComponentStatus::Failed);
    }

    #[test]
    fn test_fail_pending_skips_terminal_pieces() {
        let mut pieces = pieces(&[
            (ClonePiece::ProjectMetadata, 0),
            (ClonePiece::PlanningAreaGadm, 1),
            (ClonePiece::PlanningUnitsGrid, 1),
        ]);
        let id = pieces[0].id;
        complete_piece(&mut pieces, id, vec![]).unwrap();

        assert_eq!(fail_pending(&mut pieces, "cancelled"), 2);
        assert!(pieces[0].is_completed());
        assert_eq!(pieces[1].errors, vec!["cancelled".to_string()]);
    }

    #[test]
    fn test_derive_status_transitions() {
        let mut pieces = pieces(&[
            (ClonePiece::ProjectMetadata, 0),
            (ClonePiece::PlanningAreaGadm, 1),
            (ClonePiece::PlanningUnitsGrid, 1),
        ]);
        assert_eq!(derive_status(&pieces), AggregateStatus::InProgress);

        let (a, b, c) = (pieces[0].id, pieces[1].id, pieces[2].id);
        complete_piece(&mut pieces, a, vec![]).unwrap();
        assert_eq!(derive_status(&pieces), AggregateStatus::CurrentBatchComplete);

        complete_piece(&mut pieces, b, vec![]).unwrap();
        assert_eq!(derive_status(&pieces), AggregateStatus::InProgress);

        complete_piece(&mut pieces, c, vec![]).unwrap();
        assert_eq!(derive_status(&pieces), AggregateStatus::FullyImported);
    }

    #[test]
    fn test_validate_pieces() {
        let empty: Vec<PieceComponent<ClonePiece>> = Vec::new();
        assert_eq!(validate_pieces(&empty), Err(AggregateError::NoPieces));

        let mut dup = pieces(&[
            (ClonePiece::ProjectMetadata, 0),
            (ClonePiece::ExportConfig, 0),
        ]);
        dup[1].id = dup[0].id;
        assert_eq!(
            validate_pieces(&dup),
            Err(AggregateError::DuplicatePiece(dup[0].id))
        );
    }

    #[test]
    fn test_first_batch_uses_lowest_order() {
        let pieces = pieces(&[
            (ClonePiece::PlanningAreaGadm, 1),
            (ClonePiece::ProjectMetadata, 0),
            (ClonePiece::ExportConfig, 0),
        ]);
        let first = first_batch(&pieces);
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|p| p.order == 0));
    }
}
