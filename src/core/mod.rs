//! Core orchestration for Clonework.
//!
//! # Modules
//!
//! - [`export`], [`import`], [`legacy`] - The three aggregates
//! - [`pieces`] - Batch-ordered piece bookkeeping shared by the aggregates
//! - [`handlers`] - Command handlers with failure substitution
//! - [`sagas`] - Event to command reactions
//! - [`bus`] - Event bus and command dispatcher
//! - [`worker`] - Piece job execution under cancellation and timeout
//! - [`coordinator`] - In-memory engine driving whole runs
//!
//! # Clone Workflow
//!
//! 1. **Export**: `RequestExport` resolves the resource's pieces and schedules
//!    one job per piece
//! 2. **Archive**: every piece reports its files with `CompleteExportPiece`
//! 3. **Import**: `RequestImport` with the export as source requests the first
//!    batch of pieces
//! 4. **Batches**: each completed batch requests the next one, in import order
//! 5. **Finish**: `AllPiecesImported` leads to `MarkCloneAsFinished` and
//!    `MarkImportAsFinished`, which publish API events
//!
//! Any local failure along the way becomes a `Mark*AsFailed` command.
//!
//! # Example
//!
//! ```rust,no_run
//! use clonework::adapters::pieces::StaticResourcePieces;
//! use clonework::core::coordinator::{CloneCoordinator, CloneRequest, CoordinatorSettings};
//! use clonework::core::processors::Processors;
//! use clonework::domain::{ResourceId, UserId};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = CloneCoordinator::new(
//!     Processors::default(),
//!     Arc::new(StaticResourcePieces::new()),
//!     CoordinatorSettings::default(),
//! );
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! coordinator.start(shutdown_rx).await?;
//!
//! let summary = coordinator
//!     .clone_resource(CloneRequest::project(ResourceId::new(), UserId::new()))
//!     .await?;
//! summary.log_summary();
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod cancellation;
pub mod coordinator;
pub mod export;
pub mod handlers;
pub mod import;
pub mod legacy;
pub mod locks;
pub mod pieces;
pub mod processors;
pub mod sagas;
pub mod summary;
pub mod worker;
