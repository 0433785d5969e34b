//! Piece worker
//!
//! Drains the piece job queue. Each job runs its processor under the run's
//! cancellation signal and the configured timeout, then reports back through
//! the dispatcher with the matching completion or piece-failure command. A job
//! whose run was cancelled reports nothing: its aggregate already failed.

use crate::adapters::queue::{PieceJob, PieceJobReceiver};
use crate::core::bus::{CommandDispatcher, DispatchReport};
use crate::core::cancellation::{CancellationRegistry, CancellationToken};
use crate::core::processors::{
    ExportPieceInput, ImportPieceInput, LegacyPieceInput, PieceProcessor, Processors,
};
use crate::domain::commands::{
    Command, CompleteExportPiece, CompleteLegacyProjectImportPiece, CompletePiece,
    MarkExportPieceAsFailed, MarkImportPieceAsFailed, MarkLegacyProjectImportPieceAsFailed,
};
use crate::domain::{CloneError, Result};
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Notify, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

/// Worker settings
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    /// Jobs running at the same time
    pub concurrency: usize,

    /// Longest a single processor may run
    pub piece_timeout: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            piece_timeout: Duration::from_secs(300),
        }
    }
}

/// Counters of one worker run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub jobs_completed: usize,
    pub jobs_failed: usize,
    pub jobs_cancelled: usize,
}

/// How a single job ended
#[derive(Debug)]
enum JobResult {
    Reported(Command),
    Cancelled,
}

/// Runs piece jobs and feeds their results back into the dispatcher
pub struct PieceWorker {
    processors: Arc<Processors>,
    dispatcher: Arc<CommandDispatcher>,
    cancellation: Arc<CancellationRegistry>,
    settings: WorkerSettings,
    stats: Mutex<WorkerStats>,
    report: tokio::sync::Mutex<DispatchReport>,
    in_flight: AtomicUsize,
    idle: Notify,
}

impl PieceWorker {
    pub fn new(
        processors: Arc<Processors>,
        dispatcher: Arc<CommandDispatcher>,
        cancellation: Arc<CancellationRegistry>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            processors,
            dispatcher,
            cancellation,
            settings,
            stats: Mutex::new(WorkerStats::default()),
            report: tokio::sync::Mutex::new(DispatchReport::default()),
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
        }
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Everything the completion commands of this worker dispatched
    pub async fn report(&self) -> DispatchReport {
        self.report.lock().await.clone()
    }

    /// Waits until no job is executing
    ///
    /// Returns `false` if `timeout` elapses first.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.idle.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.in_flight.load(Ordering::SeqCst) == 0 {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }

    /// Drains `jobs` until the queue closes or `shutdown` turns true
    ///
    /// Jobs already started are awaited before returning.
    pub async fn run(self: Arc<Self>, mut jobs: PieceJobReceiver, mut shutdown: watch::Receiver<bool>) {
        let permits = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let mut running = JoinSet::new();
        let mut shutdown_open = true;

        tracing::info!(
            concurrency = self.settings.concurrency,
            timeout_secs = self.settings.piece_timeout.as_secs(),
            "Piece worker started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let job = tokio::select! {
                job = jobs.recv() => job,
                changed = shutdown.changed(), if shutdown_open => {
                    shutdown_open = changed.is_ok();
                    continue;
                }
            };
            let Some(job) = job else {
                break;
            };

            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };
            let worker = Arc::clone(&self);
            running.spawn(async move { worker.run_job(job, permit).await });

            while let Some(joined) = running.try_join_next() {
                if let Err(error) = joined {
                    tracing::error!(error = %error, "Piece job task panicked");
                }
            }
        }

        while let Some(joined) = running.join_next().await {
            if let Err(error) = joined {
                tracing::error!(error = %error, "Piece job task panicked");
            }
        }

        tracing::info!(stats = ?self.stats(), "Piece worker stopped");
    }

    /// Runs one job and dispatches its result
    async fn run_job(&self, job: PieceJob, permit: OwnedSemaphorePermit) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.report_job(job, permit).await;
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// The permit only covers the processor
    ///
    /// Dispatching a completion can enqueue the next batch, which waits for
    /// room on the queue. Only the worker loop makes room, and it needs a free
    /// permit to take the next job.
    async fn report_job(&self, job: PieceJob, permit: OwnedSemaphorePermit) {
        let run_id = job.run_id();
        let component_id = job.component_id();
        let piece = job.piece_name();

        let result = self.process(job).await;
        drop(permit);
        let command = match result {
            JobResult::Cancelled => {
                tracing::info!(run_id = %run_id, component_id = %component_id, piece = %piece, "Piece job cancelled");
                self.count(|stats| stats.jobs_cancelled += 1);
                return;
            }
            JobResult::Reported(command) => command,
        };

        if command.is_failure() {
            self.count(|stats| stats.jobs_failed += 1);
        } else {
            self.count(|stats| stats.jobs_completed += 1);
        }

        let report = self.dispatcher.dispatch(command).await;
        self.report.lock().await.merge(report);
    }

    async fn process(&self, job: PieceJob) -> JobResult {
        let mut token = self.cancellation.token(&job.run_id());
        if token.is_cancelled() {
            return JobResult::Cancelled;
        }

        let timeout = self.settings.piece_timeout;
        match job {
            PieceJob::Export {
                export_id,
                component_id,
                resource_id,
                piece,
            } => {
                let input = ExportPieceInput {
                    export_id,
                    component_id,
                    resource_id,
                    piece,
                };
                let processor = self.processors.export.resolve(&piece);
                match guarded(run_processor(processor, piece, input), timeout, &mut token).await {
                    None => JobResult::Cancelled,
                    Some(Ok(output)) => JobResult::Reported(
                        CompleteExportPiece {
                            export_id,
                            component_id,
                            locations: output.locations,
                        }
                        .into(),
                    ),
                    Some(Err(error)) => JobResult::Reported(
                        MarkExportPieceAsFailed {
                            export_id,
                            component_id,
                            errors: vec![error.to_string()],
                        }
                        .into(),
                    ),
                }
            }
            PieceJob::Import {
                import_id,
                component_id,
                resource_id,
                piece,
                locations,
            } => {
                let input = ImportPieceInput {
                    import_id,
                    component_id,
                    resource_id,
                    piece,
                    locations,
                };
                let processor = self.processors.import.resolve(&piece);
                match guarded(run_processor(processor, piece, input), timeout, &mut token).await {
                    None => JobResult::Cancelled,
                    Some(Ok(output)) => JobResult::Reported(
                        CompletePiece {
                            import_id,
                            component_id,
                            warnings: output.warnings,
                        }
                        .into(),
                    ),
                    Some(Err(error)) => JobResult::Reported(
                        MarkImportPieceAsFailed {
                            import_id,
                            component_id,
                            errors: vec![error.to_string()],
                        }
                        .into(),
                    ),
                }
            }
            PieceJob::Legacy {
                project_id,
                scenario_id,
                component_id,
                piece,
                files,
            } => {
                let input = LegacyPieceInput {
                    project_id,
                    scenario_id,
                    component_id,
                    piece,
                    files,
                };
                let processor = self.processors.legacy.resolve(&piece);
                match guarded(run_processor(processor, piece, input), timeout, &mut token).await {
                    None => JobResult::Cancelled,
                    Some(Ok(output)) => JobResult::Reported(
                        CompleteLegacyProjectImportPiece {
                            project_id,
                            component_id,
                            warnings: output.warnings,
                        }
                        .into(),
                    ),
                    Some(Err(error)) => JobResult::Reported(
                        MarkLegacyProjectImportPieceAsFailed {
                            project_id,
                            component_id,
                            errors: vec![error.to_string()],
                        }
                        .into(),
                    ),
                }
            }
        }
    }

    fn count(&self, update: impl FnOnce(&mut WorkerStats)) {
        update(&mut self.stats.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

async fn run_processor<P: Display, I, O>(
    processor: Option<Arc<dyn PieceProcessor<P, I, O>>>,
    piece: P,
    input: I,
) -> Result<O> {
    match processor {
        Some(processor) => processor.run(input).await,
        None => Err(CloneError::Processor(format!(
            "No processor registered for piece {piece}"
        ))),
    }
}

/// Runs `work` until it finishes, times out, or the run is cancelled
///
/// Returns `None` on cancellation.
async fn guarded<T>(
    work: impl Future<Output = Result<T>>,
    timeout: Duration,
    token: &mut CancellationToken,
) -> Option<Result<T>> {
    tokio::select! {
        _ = token.cancelled() => None,
        finished = tokio::time::timeout(timeout, work) => Some(finished.unwrap_or_else(|_| {
            Err(CloneError::Processor(format!(
                "Piece processing timed out after {}s",
                timeout.as_secs()
            )))
        })),
    }
}
