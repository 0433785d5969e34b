//! Cooperative cancellation of piece work
//!
//! Each run (an export, import or legacy import) owns one signal. Failing the
//! aggregate raises it, and the piece worker abandons any job of that run that
//! has not finished yet instead of completing it into a dead aggregate.
//!
//! Signals are dropped once the run has ended. Tokens taken before that keep
//! the last value they saw, so a job running at the time still observes the
//! cancellation. A signal nobody watches and nobody raised is pruned.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;

/// Raises and releases the cancellation signal of a run
pub trait RunCanceller: Send + Sync {
    fn cancel(&self, run_id: &str);

    /// Forgets the signal of a run that has ended
    fn release(&self, run_id: &str);
}

/// Receiving side of a run's cancellation signal
#[derive(Debug, Clone)]
pub struct CancellationToken {
    receiver: watch::Receiver<bool>,
}

impl CancellationToken {
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the run is cancelled
    ///
    /// Never resolves if the registry is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        if self.receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Cancellation signals of every run, created on first use
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    signals: Mutex<HashMap<String, watch::Sender<bool>>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token observing the signal of `run_id`
    pub fn token(&self, run_id: &str) -> CancellationToken {
        let mut signals = self.signals.lock().unwrap_or_else(PoisonError::into_inner);
        prune(&mut signals);
        let sender = signals
            .entry(run_id.to_string())
            .or_insert_with(|| watch::channel(false).0);
        CancellationToken {
            receiver: sender.subscribe(),
        }
    }

    pub fn is_cancelled(&self, run_id: &str) -> bool {
        self.signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(run_id)
            .map(|sender| *sender.borrow())
            .unwrap_or(false)
    }

    /// Number of signals still tracked
    pub fn len(&self) -> usize {
        let mut signals = self.signals.lock().unwrap_or_else(PoisonError::into_inner);
        prune(&mut signals);
        signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drops signals that were never raised and have no live token
fn prune(signals: &mut HashMap<String, watch::Sender<bool>>) {
    signals.retain(|_, sender| *sender.borrow() || sender.receiver_count() > 0);
}

impl RunCanceller for CancellationRegistry {
    fn cancel(&self, run_id: &str) {
        let mut signals = self.signals.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = signals
            .entry(run_id.to_string())
            .or_insert_with(|| watch::channel(false).0);
        sender.send_replace(true);
        tracing::info!(run_id = %run_id, "Run cancelled");
    }

    fn release(&self, run_id: &str) {
        let mut signals = self.signals.lock().unwrap_or_else(PoisonError::into_inner);
        signals.remove(run_id);
        prune(&mut signals);
    }
}
