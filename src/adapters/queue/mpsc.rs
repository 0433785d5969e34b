//! Bounded in-process job queue on a tokio mpsc channel

use super::{PieceJob, PieceJobQueue};
use crate::domain::{CloneError, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Sending half of the job queue
#[derive(Clone)]
pub struct MpscPieceJobQueue {
    sender: mpsc::Sender<PieceJob>,
}

/// Receiving half of the job queue, drained by the piece worker
pub struct PieceJobReceiver {
    receiver: mpsc::Receiver<PieceJob>,
}

impl MpscPieceJobQueue {
    /// Creates a queue holding at most `capacity` pending jobs
    pub fn new(capacity: usize) -> (Self, PieceJobReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, PieceJobReceiver { receiver })
    }
}

impl PieceJobReceiver {
    /// Next job, or `None` once every sender is dropped
    pub async fn recv(&mut self) -> Option<PieceJob> {
        self.receiver.recv().await
    }
}

#[async_trait]
impl PieceJobQueue for MpscPieceJobQueue {
    async fn enqueue(&self, job: PieceJob) -> Result<()> {
        tracing::debug!(
            run_id = %job.run_id(),
            component_id = %job.component_id(),
            piece = %job.piece_name(),
            "Enqueuing piece job"
        );
        self.sender
            .send(job)
            .await
            .map_err(|e| CloneError::Queue(format!("Piece job queue closed: {}", e.0.piece_name())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{ComponentId, ExportId, ResourceId};
    use crate::domain::piece::ClonePiece;

    fn job() -> PieceJob {
        PieceJob::Export {
            export_id: ExportId::new(),
            component_id: ComponentId::new(),
            resource_id: ResourceId::new(),
            piece: ClonePiece::ProjectMetadata,
        }
    }

    #[tokio::test]
    async fn test_enqueue_then_receive() {
        let (queue, mut receiver) = MpscPieceJobQueue::new(4);
        let job = job();
        queue.enqueue(job.clone()).await.unwrap();
        assert_eq!(receiver.recv().await, Some(job));
    }

    #[tokio::test]
    async fn test_enqueue_after_receiver_dropped_fails() {
        let (queue, receiver) = MpscPieceJobQueue::new(1);
        drop(receiver);
        let result = queue.enqueue(job()).await;
        assert!(matches!(result, Err(CloneError::Queue(_))));
    }
}
