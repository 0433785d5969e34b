//! Integration tests for concurrent commands on one aggregate
//!
//! These tests verify that:
//! - Concurrent completions of the last pieces stage exactly one final event
//! - Duplicate completions racing each other are applied once
//! - Commands on different aggregates do not block each other

use clonework::adapters::api_events::InMemoryApiEvents;
use clonework::adapters::pieces::StaticResourcePieces;
use clonework::adapters::queue::MpscPieceJobQueue;
use clonework::adapters::repository::{ImportRepository, MemoryRepository};
use clonework::core::cancellation::CancellationRegistry;
use clonework::core::handlers::{CommandHandlers, HandlerPorts};
use clonework::core::pieces::AggregateStatus;
use clonework::domain::commands::{Command, CompletePiece, ImportPieceSource, RequestImport};
use clonework::domain::{
    ClonePiece, ComponentLocation, ComponentStatus, DomainEvent, ImportId, ResourceId,
    ResourceKind, UserId,
};
use futures::future::join_all;
use std::sync::Arc;

fn handlers(repository: Arc<MemoryRepository>) -> CommandHandlers {
    // Import pieces are enqueued by the bus, never by the handlers
    let (queue, _jobs) = MpscPieceJobQueue::new(1);

    CommandHandlers::new(HandlerPorts {
        exports: repository.clone(),
        imports: repository.clone(),
        legacy_imports: repository,
        api_events: Arc::new(InMemoryApiEvents::new()),
        queue: Arc::new(queue),
        resource_pieces: Arc::new(StaticResourcePieces::new()),
        canceller: Arc::new(CancellationRegistry::new()),
    })
}

async fn create_import(handlers: &CommandHandlers, pieces: &[ClonePiece]) -> ImportId {
    let resource_id = ResourceId::new();
    let request = RequestImport {
        import_id: ImportId::new(),
        resource_id,
        project_id: resource_id,
        owner_id: UserId::new(),
        resource_kind: ResourceKind::Project,
        archive_location: "/archives/export.zip".to_string(),
        pieces: pieces
            .iter()
            .map(|piece| ImportPieceSource {
                piece: *piece,
                locations: vec![ComponentLocation::new(
                    format!("/archives/{}", piece.relative_path()),
                    piece.relative_path(),
                )],
            })
            .collect(),
        source_export: None,
    };
    let import_id = request.import_id;
    let outcome = handlers.handle(request.into()).await;
    assert!(outcome.commands.is_empty(), "{outcome:?}");
    import_id
}

fn count(events: &[DomainEvent], name: &str) -> usize {
    events.iter().filter(|e| e.name() == name).count()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_completions_finish_once() {
    let repository = Arc::new(MemoryRepository::new());
    let handlers = Arc::new(handlers(repository.clone()));

    // Every piece is in the first batch
    let pieces = [ClonePiece::ExportConfig, ClonePiece::ProjectMetadata];
    let import_id = create_import(&handlers, &pieces).await;
    let import = repository.find(import_id).await.unwrap();

    let tasks = import.pieces().iter().map(|piece| {
        let handlers = Arc::clone(&handlers);
        let command: Command = CompletePiece {
            import_id,
            component_id: piece.id,
            warnings: Vec::new(),
        }
        .into();
        tokio::spawn(async move { handlers.handle(command).await })
    });
    let events: Vec<DomainEvent> = join_all(tasks)
        .await
        .into_iter()
        .flat_map(|outcome| outcome.unwrap().events)
        .collect();

    assert_eq!(count(&events, "PieceImported"), pieces.len());
    assert_eq!(count(&events, "AllPiecesImported"), 1);

    let import = repository.find(import_id).await.unwrap();
    assert_eq!(import.status(), AggregateStatus::FullyImported);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_duplicates_apply_once() {
    let repository = Arc::new(MemoryRepository::new());
    let handlers = Arc::new(handlers(repository.clone()));

    let import_id = create_import(
        &handlers,
        &[ClonePiece::ProjectMetadata, ClonePiece::PlanningUnitsGrid],
    )
    .await;
    let import = repository.find(import_id).await.unwrap();
    let component_id = import
        .pieces()
        .iter()
        .find(|p| p.kind == ClonePiece::ProjectMetadata)
        .map(|p| p.id)
        .unwrap();

    let tasks = (0..8).map(|_| {
        let handlers = Arc::clone(&handlers);
        tokio::spawn(async move {
            handlers
                .handle(
                    CompletePiece {
                        import_id,
                        component_id,
                        warnings: Vec::new(),
                    }
                    .into(),
                )
                .await
        })
    });
    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|outcome| outcome.unwrap())
        .collect();

    let events: Vec<DomainEvent> = outcomes.iter().flat_map(|o| o.events.clone()).collect();
    assert_eq!(count(&events, "PieceImported"), 1);
    // The grid batch is requested exactly once
    assert_eq!(count(&events, "PieceImportRequested"), 1);
    assert!(outcomes.iter().all(|o| o.commands.is_empty()));

    let import = repository.find(import_id).await.unwrap();
    assert_eq!(
        import.piece(component_id).unwrap().status,
        ComponentStatus::Completed
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_separate_imports_complete_independently() {
    let repository = Arc::new(MemoryRepository::new());
    let handlers = Arc::new(handlers(repository.clone()));

    let mut import_ids = Vec::new();
    for _ in 0..4 {
        import_ids.push(create_import(&handlers, &[ClonePiece::ProjectMetadata]).await);
    }

    let mut tasks = Vec::new();
    for import_id in &import_ids {
        let import = repository.find(*import_id).await.unwrap();
        let handlers = Arc::clone(&handlers);
        let command: Command = CompletePiece {
            import_id: *import_id,
            component_id: import.pieces()[0].id,
            warnings: Vec::new(),
        }
        .into();
        tasks.push(tokio::spawn(async move { handlers.handle(command).await }));
    }

    for outcome in join_all(tasks).await {
        let outcome = outcome.unwrap();
        assert_eq!(count(&outcome.events, "AllPiecesImported"), 1);
    }
    for import_id in import_ids {
        let import = repository.find(import_id).await.unwrap();
        assert_eq!(import.status(), AggregateStatus::FullyImported);
    }
}
