//! Integration tests for legacy project imports
//!
//! These tests verify that:
//! - An import with every required file runs all its pieces and finishes
//! - Missing required files reject the run
//! - A failing piece fails the import and publishes one failure notification
//! - Solutions are only imported when solver output was uploaded
//! - A project's import cannot be started twice
//! - Ended runs leave no cancellation signal behind

use clonework::adapters::api_events::ApiEventKind;
use clonework::adapters::files::{FileRepository, LocalFileRepository};
use clonework::adapters::pieces::StaticResourcePieces;
use clonework::adapters::processors::{file_processors, FailingPieces};
use clonework::adapters::repository::LegacyProjectImportRepository;
use clonework::core::coordinator::{CloneCoordinator, CoordinatorSettings, LegacyImportRequest};
use clonework::core::pieces::AggregateStatus;
use clonework::core::summary::RunOutcome;
use clonework::domain::commands::AddFileToLegacyProjectImport;
use clonework::domain::{
    LegacyProjectImportFile, LegacyProjectImportFileType, LegacyProjectImportPiece, ResourceId,
    UserId,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;

struct Fixture {
    _dir: TempDir,
    files: Arc<dyn FileRepository>,
    coordinator: CloneCoordinator,
    _shutdown: watch::Sender<bool>,
}

async fn fixture(failing: FailingPieces) -> Fixture {
    let dir = TempDir::new().unwrap();
    let files: Arc<dyn FileRepository> = Arc::new(LocalFileRepository::new(dir.path()));

    let mut settings = CoordinatorSettings::default();
    settings.worker.piece_timeout = Duration::from_secs(5);
    settings.run_timeout = Duration::from_secs(20);

    let processors = file_processors(Arc::clone(&files), failing).unwrap();
    let coordinator =
        CloneCoordinator::new(processors, Arc::new(StaticResourcePieces::new()), settings);
    let (shutdown, shutdown_rx) = watch::channel(false);
    coordinator.start(shutdown_rx).await.unwrap();

    Fixture {
        _dir: dir,
        files,
        coordinator,
        _shutdown: shutdown,
    }
}

async fn upload(
    files: &dyn FileRepository,
    types: &[LegacyProjectImportFileType],
) -> Vec<LegacyProjectImportFile> {
    let mut uploaded = Vec::new();
    for file_type in types {
        let content = format!("{}\n", file_type.file_name());
        let uri = files.save(&mut content.as_bytes(), "dat").await.unwrap();
        uploaded.push(LegacyProjectImportFile::new(uri, *file_type));
    }
    uploaded
}

fn request(project_id: ResourceId, files: Vec<LegacyProjectImportFile>) -> LegacyImportRequest {
    LegacyImportRequest {
        project_id,
        scenario_id: ResourceId::new(),
        owner_id: UserId::new(),
        files,
    }
}

fn piece_kinds(
    import: &clonework::core::legacy::LegacyProjectImport,
) -> Vec<LegacyProjectImportPiece> {
    let mut kinds: Vec<_> = import.pieces().iter().map(|p| p.kind).collect();
    kinds.sort_by_key(|kind| kind.order());
    kinds
}

#[tokio::test]
async fn test_legacy_import_finishes() {
    let fixture = fixture(FailingPieces::default()).await;
    let files = upload(
        fixture.files.as_ref(),
        &LegacyProjectImportFileType::REQUIRED,
    )
    .await;
    let project_id = ResourceId::new();

    let summary = fixture
        .coordinator
        .legacy_import(request(project_id, files))
        .await;

    assert_eq!(summary.outcome, RunOutcome::Finished);
    assert!(summary.is_successful(), "{summary:?}");
    // Solutions is skipped without solver output
    assert_eq!(
        summary.pieces_completed,
        LegacyProjectImportPiece::ALL.len() - 1
    );

    let finished = fixture
        .coordinator
        .api_events()
        .of_kind(ApiEventKind::ProjectLegacyImportFinished)
        .await;
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].topic, project_id);
    assert!(fixture.coordinator.cancellation().is_empty());

    let repository = fixture.coordinator.repository();
    let import = repository.find(project_id).await.unwrap();
    assert_eq!(import.status(), AggregateStatus::FullyImported);
    assert!(!import.is_accepting_files());
    assert!(!piece_kinds(&import).contains(&LegacyProjectImportPiece::Solutions));

    // The planning grid warns about the missing bound.dat
    let grid = import
        .pieces()
        .iter()
        .find(|p| p.kind == LegacyProjectImportPiece::PlanningGrid)
        .unwrap();
    assert_eq!(grid.warnings.len(), 1);
}

#[tokio::test]
async fn test_legacy_import_with_solutions() {
    let fixture = fixture(FailingPieces::default()).await;
    let mut types = LegacyProjectImportFileType::REQUIRED.to_vec();
    types.push(LegacyProjectImportFileType::BoundDat);
    types.push(LegacyProjectImportFileType::Output);
    let files = upload(fixture.files.as_ref(), &types).await;
    let project_id = ResourceId::new();

    let summary = fixture
        .coordinator
        .legacy_import(request(project_id, files))
        .await;

    assert_eq!(summary.outcome, RunOutcome::Finished);
    assert_eq!(summary.pieces_completed, LegacyProjectImportPiece::ALL.len());

    let import = fixture
        .coordinator
        .repository()
        .find(project_id)
        .await
        .unwrap();
    assert_eq!(piece_kinds(&import).last(), Some(&LegacyProjectImportPiece::Solutions));
    assert!(import.pieces().iter().all(|p| p.warnings.is_empty()));
}

#[tokio::test]
async fn test_missing_required_files_reject_the_run() {
    let fixture = fixture(FailingPieces::default()).await;
    let files = upload(
        fixture.files.as_ref(),
        &[
            LegacyProjectImportFileType::PlanningGridShapefile,
            LegacyProjectImportFileType::InputDat,
        ],
    )
    .await;
    let project_id = ResourceId::new();

    let summary = fixture
        .coordinator
        .legacy_import(request(project_id, files))
        .await;

    assert_eq!(summary.outcome, RunOutcome::Failed);
    assert_eq!(summary.rejections.len(), 1);
    assert!(summary.rejections[0].contains("pu.dat"));
    assert_eq!(summary.pieces_completed, 0);

    // A rejected run leaves the import open for more uploads
    let import = fixture
        .coordinator
        .repository()
        .find(project_id)
        .await
        .unwrap();
    assert!(import.is_accepting_files());
    assert!(import.pieces().is_empty());
}

#[tokio::test]
async fn test_failing_piece_fails_the_legacy_import() {
    let failing = FailingPieces {
        legacy: Some(LegacyProjectImportPiece::Features),
        ..FailingPieces::default()
    };
    let fixture = fixture(failing).await;
    let files = upload(
        fixture.files.as_ref(),
        &LegacyProjectImportFileType::REQUIRED,
    )
    .await;
    let project_id = ResourceId::new();

    let summary = fixture
        .coordinator
        .legacy_import(request(project_id, files))
        .await;

    assert_eq!(summary.outcome, RunOutcome::Failed);
    assert!(summary.pieces_failed >= 1);

    let api_events = fixture.coordinator.api_events();
    let failed = api_events
        .of_kind(ApiEventKind::ProjectLegacyImportFailed)
        .await;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].topic, project_id);
    assert!(api_events
        .of_kind(ApiEventKind::ProjectLegacyImportFinished)
        .await
        .is_empty());

    let import = fixture
        .coordinator
        .repository()
        .find(project_id)
        .await
        .unwrap();
    assert_eq!(import.status(), AggregateStatus::Failed);
    assert!(fixture.coordinator.cancellation().is_empty());
}

#[tokio::test]
async fn test_second_start_keeps_the_finished_import() {
    let fixture = fixture(FailingPieces::default()).await;
    let files = upload(
        fixture.files.as_ref(),
        &LegacyProjectImportFileType::REQUIRED,
    )
    .await;
    let project_id = ResourceId::new();
    let first = fixture
        .coordinator
        .legacy_import(request(project_id, files.clone()))
        .await;
    assert_eq!(first.outcome, RunOutcome::Finished);

    let second = fixture
        .coordinator
        .legacy_import(request(project_id, files))
        .await;

    assert_eq!(second.outcome, RunOutcome::Failed);
    assert_eq!(second.rejections.len(), 1, "{second:?}");
    assert!(second.rejections[0].starts_with("Already started"));
    assert_eq!(second.pieces_completed, 0);

    let import = fixture
        .coordinator
        .repository()
        .find(project_id)
        .await
        .unwrap();
    assert_eq!(import.status(), AggregateStatus::FullyImported);
    assert_eq!(
        piece_kinds(&import).len(),
        LegacyProjectImportPiece::ALL.len() - 1
    );
    assert_eq!(
        fixture
            .coordinator
            .api_events()
            .of_kind(ApiEventKind::ProjectLegacyImportFinished)
            .await
            .len(),
        1
    );
}

#[tokio::test]
async fn test_files_are_rejected_after_the_run() {
    let fixture = fixture(FailingPieces::default()).await;
    let files = upload(
        fixture.files.as_ref(),
        &LegacyProjectImportFileType::REQUIRED,
    )
    .await;
    let project_id = ResourceId::new();
    fixture
        .coordinator
        .legacy_import(request(project_id, files))
        .await;

    let report = fixture
        .coordinator
        .dispatcher()
        .dispatch(AddFileToLegacyProjectImport {
            project_id,
            file: LegacyProjectImportFile::new(
                "file:///late/bound.dat",
                LegacyProjectImportFileType::BoundDat,
            ),
        })
        .await;

    assert_eq!(report.rejections.len(), 1);
    assert!(report.events.is_empty());
    assert_eq!(report.failures(), 0);

    let import = fixture
        .coordinator
        .repository()
        .find(project_id)
        .await
        .unwrap();
    assert!(import
        .files()
        .iter()
        .all(|f| f.file_type != LegacyProjectImportFileType::BoundDat));
}
