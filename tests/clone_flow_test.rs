//! Integration tests for the clone workflow
//!
//! These tests verify that:
//! - A project clone exports every piece and imports it batch by batch
//! - The clone finishes with both a clone and an import notification
//! - A batch larger than the job queue still finishes
//! - A finished run leaves no cancellation signal behind
//! - A failing piece fails the run, cancels it and leaves other batches alone
//! - The dispatcher fans out sagas in order

use clonework::adapters::api_events::ApiEventKind;
use clonework::adapters::files::{FileRepository, LocalFileRepository};
use clonework::adapters::pieces::StaticResourcePieces;
use clonework::adapters::processors::{file_processors, FailingPieces};
use clonework::adapters::repository::ImportRepository;
use clonework::core::coordinator::{CloneCoordinator, CloneRequest, CoordinatorSettings};
use clonework::core::pieces::AggregateStatus;
use clonework::core::summary::RunOutcome;
use clonework::domain::commands::{Command, CompletePiece, ImportPieceSource, RequestImport};
use clonework::domain::events::DomainEvent;
use clonework::domain::{
    ClonePiece, ComponentLocation, ExportId, ImportId, ResourceId, ResourceKind, UserId,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;

fn settings() -> CoordinatorSettings {
    let mut settings = CoordinatorSettings::default();
    settings.worker.piece_timeout = Duration::from_secs(5);
    settings.run_timeout = Duration::from_secs(20);
    settings
}

fn coordinator(dir: &TempDir, failing: FailingPieces) -> CloneCoordinator {
    coordinator_with(dir, failing, settings())
}

fn coordinator_with(
    dir: &TempDir,
    failing: FailingPieces,
    settings: CoordinatorSettings,
) -> CloneCoordinator {
    let files: Arc<dyn FileRepository> = Arc::new(LocalFileRepository::new(dir.path()));
    let processors = file_processors(files, failing).unwrap();
    CloneCoordinator::new(processors, Arc::new(StaticResourcePieces::new()), settings)
}

/// Imports of `events` in the order they were published, by piece batch
fn requested_batches(events: &[DomainEvent]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|event| match event {
            DomainEvent::PieceImportRequested { piece, .. } => Some(piece.import_order()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_project_clone_finishes() {
    let dir = TempDir::new().unwrap();
    let coordinator = coordinator(&dir, FailingPieces::default());
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    coordinator.start(shutdown_rx).await.unwrap();

    let summary = coordinator
        .clone_resource(CloneRequest::project(ResourceId::new(), UserId::new()))
        .await
        .unwrap();

    assert_eq!(summary.outcome, RunOutcome::Finished);
    assert!(summary.is_successful(), "{summary:?}");

    let pieces = StaticResourcePieces::defaults(ResourceKind::Project).len();
    // Every piece is exported once and imported once
    assert_eq!(summary.pieces_completed, pieces * 2);
    assert_eq!(summary.pieces_failed, 0);

    let api_events = coordinator.api_events();
    assert_eq!(
        api_events
            .of_kind(ApiEventKind::ProjectExportFinished)
            .await
            .len(),
        1
    );
    assert_eq!(
        api_events
            .of_kind(ApiEventKind::ProjectCloneFinished)
            .await
            .len(),
        1
    );
    assert_eq!(
        api_events
            .of_kind(ApiEventKind::ProjectImportFinished)
            .await
            .len(),
        1
    );
    assert!(coordinator.cancellation().is_empty());
}

#[tokio::test]
async fn test_scenario_clone_finishes() {
    let dir = TempDir::new().unwrap();
    let coordinator = coordinator(&dir, FailingPieces::default());
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    coordinator.start(shutdown_rx).await.unwrap();

    let summary = coordinator
        .clone_resource(CloneRequest::scenario(
            ResourceId::new(),
            ResourceId::new(),
            UserId::new(),
        ))
        .await
        .unwrap();

    assert_eq!(summary.outcome, RunOutcome::Finished);
    let finished = coordinator
        .api_events()
        .of_kind(ApiEventKind::ScenarioCloneFinished)
        .await;
    assert_eq!(finished.len(), 1);
}

#[tokio::test]
async fn test_batch_larger_than_queue_finishes() {
    let dir = TempDir::new().unwrap();
    let mut settings = settings();
    settings.queue_capacity = 1;
    settings.worker.concurrency = 1;
    let coordinator = coordinator_with(&dir, FailingPieces::default(), settings);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    coordinator.start(shutdown_rx).await.unwrap();

    // The scenario data batch holds more pieces than the queue
    let summary = coordinator
        .clone_resource(CloneRequest::scenario(
            ResourceId::new(),
            ResourceId::new(),
            UserId::new(),
        ))
        .await
        .unwrap();

    assert_eq!(summary.outcome, RunOutcome::Finished, "{summary:?}");
    let pieces = StaticResourcePieces::defaults(ResourceKind::Scenario).len();
    assert_eq!(summary.pieces_completed, pieces * 2);
    assert!(coordinator.cancellation().is_empty());
}

#[tokio::test]
async fn test_failed_import_piece_fails_the_clone() {
    let dir = TempDir::new().unwrap();
    let failing = FailingPieces {
        import: Some(ClonePiece::PlanningUnitsGrid),
        ..FailingPieces::default()
    };
    let coordinator = coordinator(&dir, failing);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    coordinator.start(shutdown_rx).await.unwrap();

    let summary = coordinator
        .clone_resource(CloneRequest::project(ResourceId::new(), UserId::new()))
        .await
        .unwrap();

    assert_eq!(summary.outcome, RunOutcome::Failed);
    assert!(!summary.is_successful());
    assert!(summary.pieces_failed >= 1);

    let api_events = coordinator.api_events();
    assert_eq!(
        api_events
            .of_kind(ApiEventKind::ProjectImportFailed)
            .await
            .len(),
        1
    );
    assert!(api_events
        .of_kind(ApiEventKind::ProjectCloneFinished)
        .await
        .is_empty());

    // Later batches were never requested
    let report = coordinator.worker().report().await;
    assert!(requested_batches(&report.events).iter().all(|batch| *batch <= 1));
}

#[tokio::test]
async fn test_failed_export_piece_fails_the_clone() {
    let dir = TempDir::new().unwrap();
    let failing = FailingPieces {
        export: Some(ClonePiece::ProjectMetadata),
        ..FailingPieces::default()
    };
    let coordinator = coordinator(&dir, failing);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    coordinator.start(shutdown_rx).await.unwrap();

    let summary = coordinator
        .clone_resource(CloneRequest::project(ResourceId::new(), UserId::new()))
        .await
        .unwrap();

    assert_eq!(summary.outcome, RunOutcome::Failed);
    let api_events = coordinator.api_events();
    assert_eq!(
        api_events
            .of_kind(ApiEventKind::ProjectExportFailed)
            .await
            .len(),
        1
    );
    assert_eq!(coordinator.repository().import_count().await, 0);
}

#[tokio::test]
async fn test_worker_starts_once() {
    let dir = TempDir::new().unwrap();
    let coordinator = coordinator(&dir, FailingPieces::default());
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    assert!(coordinator.start(shutdown_rx.clone()).await.is_ok());
    assert!(coordinator.start(shutdown_rx).await.is_err());
}

/// Drives an import by hand through the dispatcher, without a worker
#[tokio::test]
async fn test_dispatcher_requests_batches_in_order() {
    let dir = TempDir::new().unwrap();
    let coordinator = coordinator(&dir, FailingPieces::default());
    let dispatcher = coordinator.dispatcher();
    let repository = coordinator.repository();

    let resource_id = ResourceId::new();
    let export_id = ExportId::new();
    let pieces = [
        ClonePiece::ScenarioMetadata,
        ClonePiece::ProjectMetadata,
        ClonePiece::PlanningUnitsGrid,
        ClonePiece::ExportConfig,
    ];
    let request = RequestImport {
        import_id: ImportId::new(),
        resource_id,
        project_id: resource_id,
        owner_id: UserId::new(),
        resource_kind: ResourceKind::Project,
        archive_location: format!("export://{export_id}"),
        pieces: pieces
            .iter()
            .map(|piece| ImportPieceSource {
                piece: *piece,
                locations: vec![ComponentLocation::new("unused", piece.relative_path())],
            })
            .collect(),
        source_export: Some(export_id),
    };
    let import_id = request.import_id;

    let report = dispatcher.dispatch(request).await;
    assert_eq!(requested_batches(&report.events), vec![0, 0]);

    // Completing the last piece of a batch requests the next one
    for (batch, next) in [(0, vec![1]), (1, vec![2]), (2, vec![])] {
        let import = repository.find(import_id).await.unwrap();
        let component_ids: Vec<_> = import
            .pieces()
            .iter()
            .filter(|p| p.order == batch)
            .map(|p| p.id)
            .collect();

        let mut requested = Vec::new();
        for component_id in component_ids {
            let report = dispatcher
                .dispatch(CompletePiece {
                    import_id,
                    component_id,
                    warnings: Vec::new(),
                })
                .await;
            requested.extend(requested_batches(&report.events));
        }
        assert_eq!(requested, next, "after batch {batch}");
    }

    let import = repository.find(import_id).await.unwrap();
    assert_eq!(import.status(), AggregateStatus::FullyImported);

    let clone_finished = coordinator
        .api_events()
        .of_kind(ApiEventKind::ProjectCloneFinished)
        .await;
    assert_eq!(clone_finished.len(), 1);
    assert_eq!(clone_finished[0].topic, resource_id);
}

#[tokio::test]
async fn test_cloning_fan_out_order() {
    let dir = TempDir::new().unwrap();
    let coordinator = coordinator(&dir, FailingPieces::default());
    let dispatcher = coordinator.dispatcher();

    let resource_id = ResourceId::new();
    let request = RequestImport {
        import_id: ImportId::new(),
        resource_id,
        project_id: resource_id,
        owner_id: UserId::new(),
        resource_kind: ResourceKind::Project,
        archive_location: "export://archive".to_string(),
        pieces: vec![ImportPieceSource {
            piece: ClonePiece::ProjectMetadata,
            locations: Vec::new(),
        }],
        source_export: Some(ExportId::new()),
    };
    let import_id = request.import_id;
    dispatcher.dispatch(request).await;

    let import = coordinator.repository().find(import_id).await.unwrap();
    let report = dispatcher
        .dispatch(CompletePiece {
            import_id,
            component_id: import.pieces()[0].id,
            warnings: Vec::new(),
        })
        .await;

    let commands: Vec<_> = report.commands.iter().map(Command::name).collect();
    assert_eq!(
        commands,
        vec!["CompletePiece", "MarkCloneAsFinished", "MarkImportAsFinished"]
    );
    assert_eq!(
        report.event_names(),
        vec!["PieceImported", "AllPiecesImported"]
    );
}
