//! Clone coordinator
//!
//! Wires the in-memory ports, the command handlers, the event bus and the piece
//! worker into one engine, and drives whole runs through it: a clone (export
//! followed by a cloning import of its archive) or a legacy project import.
//! A run ends when its terminal API event is stored, when its aggregate is seen
//! failed, or when the run timeout elapses.

use crate::adapters::api_events::{ApiEventKind, InMemoryApiEvents};
use crate::adapters::pieces::ResourcePieces;
use crate::adapters::queue::{MpscPieceJobQueue, PieceJobReceiver, PieceJobScheduler};
use crate::adapters::repository::{
    ExportRepository, ImportRepository, LegacyProjectImportRepository, MemoryRepository,
};
use crate::core::bus::{CommandDispatcher, DispatchReport, EventBus};
use crate::core::cancellation::CancellationRegistry;
use crate::core::handlers::{CommandHandlers, HandlerPorts};
use crate::core::pieces::batch::AggregateStatus;
use crate::core::processors::Processors;
use crate::core::sagas::default_sagas;
use crate::core::summary::{RunOutcome, RunSummary};
use crate::core::worker::{PieceWorker, WorkerSettings, WorkerStats};
use crate::domain::commands::{
    AddFileToLegacyProjectImport, RequestExport, RequestImport, RunLegacyProjectImport,
    StartLegacyProjectImport,
};
use crate::domain::ids::{ExportId, ImportId, ResourceId, UserId};
use crate::domain::legacy::LegacyProjectImportFile;
use crate::domain::piece::ResourceKind;
use crate::domain::{CloneError, Result};
use crate::{log_run_complete, log_run_start};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// How often a waiting run re-checks its aggregate
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Longest the summary waits for in-flight jobs after a run ended
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Coordinator settings
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorSettings {
    pub worker: WorkerSettings,

    /// Capacity of the piece job queue
    pub queue_capacity: usize,

    /// Longest a whole run may take
    pub run_timeout: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            worker: WorkerSettings::default(),
            queue_capacity: 256,
            run_timeout: Duration::from_secs(600),
        }
    }
}

/// A resource to clone
#[derive(Debug, Clone, Copy)]
pub struct CloneRequest {
    pub resource_id: ResourceId,
    pub resource_kind: ResourceKind,
    pub owner_id: UserId,

    /// Project a cloned scenario is placed in; a cloned project is its own
    pub project_id: Option<ResourceId>,
}

impl CloneRequest {
    pub fn project(resource_id: ResourceId, owner_id: UserId) -> Self {
        Self {
            resource_id,
            resource_kind: ResourceKind::Project,
            owner_id,
            project_id: None,
        }
    }

    pub fn scenario(resource_id: ResourceId, project_id: ResourceId, owner_id: UserId) -> Self {
        Self {
            resource_id,
            resource_kind: ResourceKind::Scenario,
            owner_id,
            project_id: Some(project_id),
        }
    }
}

/// A legacy project upload to import
#[derive(Debug, Clone)]
pub struct LegacyImportRequest {
    pub project_id: ResourceId,
    pub scenario_id: ResourceId,
    pub owner_id: UserId,
    pub files: Vec<LegacyProjectImportFile>,
}

/// Engine running clones and legacy imports on in-memory ports
pub struct CloneCoordinator {
    repository: Arc<MemoryRepository>,
    api_events: Arc<InMemoryApiEvents>,
    cancellation: Arc<CancellationRegistry>,
    dispatcher: Arc<CommandDispatcher>,
    worker: Arc<PieceWorker>,
    jobs: Mutex<Option<PieceJobReceiver>>,
    settings: CoordinatorSettings,
}

impl CloneCoordinator {
    /// Create a coordinator with fresh in-memory ports
    pub fn new(
        processors: Processors,
        resource_pieces: Arc<dyn ResourcePieces>,
        settings: CoordinatorSettings,
    ) -> Self {
        let repository = Arc::new(MemoryRepository::new());
        let api_events = Arc::new(InMemoryApiEvents::new());
        let cancellation = Arc::new(CancellationRegistry::new());
        let (queue, jobs) = MpscPieceJobQueue::new(settings.queue_capacity);
        let queue = Arc::new(queue);

        let handlers = CommandHandlers::new(HandlerPorts {
            exports: repository.clone(),
            imports: repository.clone(),
            legacy_imports: repository.clone(),
            api_events: api_events.clone(),
            queue: queue.clone(),
            resource_pieces,
            canceller: cancellation.clone(),
        });
        let scheduler = PieceJobScheduler::new(queue, repository.clone(), repository.clone());
        let bus = EventBus::new()
            .with_sagas(default_sagas())
            .subscribe(Arc::new(scheduler));
        let dispatcher = Arc::new(CommandDispatcher::new(handlers, bus));

        let worker = Arc::new(PieceWorker::new(
            Arc::new(processors),
            Arc::clone(&dispatcher),
            Arc::clone(&cancellation),
            settings.worker,
        ));

        Self {
            repository,
            api_events,
            cancellation,
            dispatcher,
            worker,
            jobs: Mutex::new(Some(jobs)),
            settings,
        }
    }

    pub fn repository(&self) -> Arc<MemoryRepository> {
        Arc::clone(&self.repository)
    }

    pub fn api_events(&self) -> Arc<InMemoryApiEvents> {
        Arc::clone(&self.api_events)
    }

    pub fn cancellation(&self) -> Arc<CancellationRegistry> {
        Arc::clone(&self.cancellation)
    }

    pub fn dispatcher(&self) -> Arc<CommandDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn worker(&self) -> Arc<PieceWorker> {
        Arc::clone(&self.worker)
    }

    /// Spawn the piece worker
    ///
    /// # Errors
    ///
    /// Returns an error if the worker was already started.
    pub async fn start(&self, shutdown: watch::Receiver<bool>) -> Result<JoinHandle<()>> {
        let jobs = self
            .jobs
            .lock()
            .await
            .take()
            .ok_or_else(|| CloneError::Other("Piece worker already started".to_string()))?;
        let worker = Arc::clone(&self.worker);
        Ok(tokio::spawn(worker.run(jobs, shutdown)))
    }

    /// Export a resource and import the archive as a new resource
    ///
    /// # Errors
    ///
    /// Returns a repository error if the finished export cannot be read back.
    pub async fn clone_resource(&self, request: CloneRequest) -> Result<RunSummary> {
        let started = Instant::now();
        let deadline = started + self.settings.run_timeout;
        let kind = request.resource_kind;
        let (worker_before, stats_before) = self.worker_snapshot().await;
        log_run_start!("clone", request.resource_id);

        let export = RequestExport::new(request.resource_id, kind);
        let export_id = export.export_id;
        let mut report = self.dispatcher.dispatch(export).await;

        let mut outcome = self
            .await_terminal(
                request.resource_id,
                ApiEventKind::export_finished(kind),
                ApiEventKind::export_failed(kind),
                deadline,
                || self.export_failed(export_id),
            )
            .await;

        if outcome == RunOutcome::Finished {
            let export = ExportRepository::find(self.repository.as_ref(), export_id).await?;
            let target = ResourceId::new();
            let import = RequestImport {
                import_id: ImportId::new(),
                resource_id: target,
                project_id: request.project_id.unwrap_or(target),
                owner_id: request.owner_id,
                resource_kind: kind,
                archive_location: format!("export://{export_id}"),
                pieces: export.import_sources(),
                source_export: Some(export_id),
            };
            let import_id = import.import_id;
            tracing::info!(
                export_id = %export_id,
                import_id = %import_id,
                target = %target,
                "Export finished, importing clone"
            );
            report.merge(self.dispatcher.dispatch(import).await);

            outcome = self
                .await_terminal(
                    target,
                    ApiEventKind::clone_finished(kind),
                    ApiEventKind::import_failed(kind),
                    deadline,
                    || self.import_failed(import_id),
                )
                .await;
        }

        Ok(self
            .summarize("clone", outcome, report, worker_before, stats_before, started)
            .await)
    }

    /// Start a legacy project import, upload its files and run it
    pub async fn legacy_import(&self, request: LegacyImportRequest) -> RunSummary {
        let started = Instant::now();
        let deadline = started + self.settings.run_timeout;
        let project_id = request.project_id;
        let (worker_before, stats_before) = self.worker_snapshot().await;
        log_run_start!("legacy-import", project_id);

        let mut report = self
            .dispatcher
            .dispatch(StartLegacyProjectImport {
                project_id,
                scenario_id: request.scenario_id,
                owner_id: request.owner_id,
            })
            .await;
        // A project that already has an import is never touched again
        let files = if report.rejections.is_empty() {
            request.files
        } else {
            Vec::new()
        };
        for file in files {
            report.merge(
                self.dispatcher
                    .dispatch(AddFileToLegacyProjectImport { project_id, file })
                    .await,
            );
        }
        if report.rejections.is_empty() {
            report.merge(
                self.dispatcher
                    .dispatch(RunLegacyProjectImport { project_id })
                    .await,
            );
        }

        let outcome = if report.rejections.is_empty() {
            self.await_terminal(
                project_id,
                ApiEventKind::ProjectLegacyImportFinished,
                Some(ApiEventKind::ProjectLegacyImportFailed),
                deadline,
                || self.legacy_import_failed(project_id),
            )
            .await
        } else {
            RunOutcome::Failed
        };

        self.summarize("legacy-import", outcome, report, worker_before, stats_before, started)
            .await
    }

    /// Waits for the finished or failed API event of `topic`
    ///
    /// `aggregate_failed` catches failures that publish no API event.
    async fn await_terminal<F, Fut>(
        &self,
        topic: ResourceId,
        finished: ApiEventKind,
        failed: Option<ApiEventKind>,
        deadline: Instant,
        aggregate_failed: F,
    ) -> RunOutcome
    where
        F: Fn() -> Fut,
        Fut: Future<Output = bool>,
    {
        let mut kinds = vec![finished];
        kinds.extend(failed);

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(topic = %topic, "Run timed out");
                return RunOutcome::TimedOut;
            }

            let slice = remaining.min(POLL_INTERVAL);
            match self.api_events.wait_for(topic, &kinds, slice).await {
                Some(event) if event.kind == finished => return RunOutcome::Finished,
                Some(_) => return RunOutcome::Failed,
                None if aggregate_failed().await => return RunOutcome::Failed,
                None => {}
            }
        }
    }

    async fn export_failed(&self, export_id: ExportId) -> bool {
        ExportRepository::find(self.repository.as_ref(), export_id)
            .await
            .is_ok_and(|export| export.status() == AggregateStatus::Failed)
    }

    async fn import_failed(&self, import_id: ImportId) -> bool {
        ImportRepository::find(self.repository.as_ref(), import_id)
            .await
            .is_ok_and(|import| import.status() == AggregateStatus::Failed)
    }

    async fn legacy_import_failed(&self, project_id: ResourceId) -> bool {
        LegacyProjectImportRepository::find(self.repository.as_ref(), project_id)
            .await
            .is_ok_and(|import| import.status() == AggregateStatus::Failed)
    }

    async fn worker_snapshot(&self) -> (DispatchReport, WorkerStats) {
        (self.worker.report().await, self.worker.stats())
    }

    async fn summarize(
        &self,
        run: &str,
        outcome: RunOutcome,
        mut report: DispatchReport,
        worker_before: DispatchReport,
        stats_before: WorkerStats,
        started: Instant,
    ) -> RunSummary {
        if !self.worker.wait_idle(SETTLE_TIMEOUT).await {
            tracing::warn!(run = %run, "Piece jobs still running after the run ended");
        }
        report.merge(self.worker.report().await.since(&worker_before));

        let stats = self.worker.stats();
        let stats = WorkerStats {
            jobs_completed: stats.jobs_completed - stats_before.jobs_completed,
            jobs_failed: stats.jobs_failed - stats_before.jobs_failed,
            jobs_cancelled: stats.jobs_cancelled - stats_before.jobs_cancelled,
        };

        let duration = started.elapsed();
        log_run_complete!(run, report.commands.len(), duration);
        RunSummary::from_report(run, outcome, &report, &stats).with_duration(duration)
    }
}
