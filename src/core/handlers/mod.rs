//! Command handlers
//!
//! One handler per command. A handler that changes an aggregate holds the
//! aggregate's lock across find, mutate and save, and only returns the staged
//! events once the save succeeded.
//!
//! Handlers never return errors. A local failure (missing aggregate, missing
//! piece, failed save) is logged and replaced by the matching `Mark*AsFailed`
//! command, so the command and event stream stays the only record of what
//! happened. Requests the caller got wrong (uploading to a legacy import that
//! already ran, running it without its mandatory files) are reported as a
//! rejection instead.

mod export;
mod import;
mod legacy;
mod lifecycle;

use crate::adapters::api_events::ApiEventSink;
use crate::adapters::pieces::ResourcePieces;
use crate::adapters::queue::PieceJobQueue;
use crate::adapters::repository::{
    ExportRepository, ImportRepository, LegacyProjectImportRepository, RepositoryResult,
};
use crate::core::cancellation::RunCanceller;
use crate::core::locks::AggregateLocks;
use crate::domain::commands::Command;
use crate::domain::errors::{AggregateError, RepositoryError};
use crate::domain::events::DomainEvent;
use crate::domain::Result;
use std::fmt::Display;
use std::sync::Arc;

/// What handling a command produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Events to publish; only ever staged by a persisted aggregate
    pub events: Vec<DomainEvent>,

    /// Follow-up commands
    pub commands: Vec<Command>,

    /// Why the command was refused, when it was
    pub rejection: Option<String>,
}

impl Outcome {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn events(events: Vec<DomainEvent>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    pub fn command(command: impl Into<Command>) -> Self {
        Self {
            commands: vec![command.into()],
            ..Self::default()
        }
    }

    pub fn commands(commands: Vec<Command>) -> Self {
        Self {
            commands,
            ..Self::default()
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            rejection: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Adds a follow-up command
    pub fn and_command(mut self, command: impl Into<Command>) -> Self {
        self.commands.push(command.into());
        self
    }
}

/// Ports the handlers work against
#[derive(Clone)]
pub struct HandlerPorts {
    pub exports: Arc<dyn ExportRepository>,
    pub imports: Arc<dyn ImportRepository>,
    pub legacy_imports: Arc<dyn LegacyProjectImportRepository>,
    pub api_events: Arc<dyn ApiEventSink>,
    pub queue: Arc<dyn PieceJobQueue>,
    pub resource_pieces: Arc<dyn ResourcePieces>,
    pub canceller: Arc<dyn RunCanceller>,
}

/// Every command handler, sharing one set of ports and aggregate locks
pub struct CommandHandlers {
    exports: Arc<dyn ExportRepository>,
    imports: Arc<dyn ImportRepository>,
    legacy_imports: Arc<dyn LegacyProjectImportRepository>,
    api_events: Arc<dyn ApiEventSink>,
    queue: Arc<dyn PieceJobQueue>,
    resource_pieces: Arc<dyn ResourcePieces>,
    canceller: Arc<dyn RunCanceller>,
    locks: AggregateLocks,
}

impl CommandHandlers {
    pub fn new(ports: HandlerPorts) -> Self {
        Self {
            exports: ports.exports,
            imports: ports.imports,
            legacy_imports: ports.legacy_imports,
            api_events: ports.api_events,
            queue: ports.queue,
            resource_pieces: ports.resource_pieces,
            canceller: ports.canceller,
            locks: AggregateLocks::new(),
        }
    }

    /// Routes a command to its handler
    pub async fn handle(&self, command: Command) -> Outcome {
        tracing::debug!(command = command.name(), "Handling command");

        match command {
            Command::RequestExport(c) => self.request_export(c).await,
            Command::SchedulePieceExport(c) => self.schedule_piece_export(c).await,
            Command::CompleteExportPiece(c) => self.complete_export_piece(c).await,
            Command::MarkExportPieceAsFailed(c) => self.mark_export_piece_as_failed(c).await,
            Command::MarkExportAsFailed(c) => self.mark_export_as_failed(c).await,
            Command::MarkExportAsFinished(c) => self.mark_export_as_finished(c).await,
            Command::RequestImport(c) => self.request_import(c).await,
            Command::CompletePiece(c) => self.complete_piece(c).await,
            Command::MarkImportPieceAsFailed(c) => self.mark_import_piece_as_failed(c).await,
            Command::MarkImportAsFailed(c) => self.mark_import_as_failed(c).await,
            Command::MarkImportAsFinished(c) => self.mark_import_as_finished(c).await,
            Command::MarkCloneAsFinished(c) => self.mark_clone_as_finished(c).await,
            Command::StartLegacyProjectImport(c) => self.start_legacy_project_import(c).await,
            Command::AddFileToLegacyProjectImport(c) => self.add_file_to_legacy_project_import(c).await,
            Command::RunLegacyProjectImport(c) => self.run_legacy_project_import(c).await,
            Command::CompleteLegacyProjectImportPiece(c) => {
                self.complete_legacy_project_import_piece(c).await
            }
            Command::MarkLegacyProjectImportPieceAsFailed(c) => {
                self.mark_legacy_project_import_piece_as_failed(c).await
            }
            Command::MarkLegacyProjectImportAsFailed(c) => {
                self.mark_legacy_project_import_as_failed(c).await
            }
            Command::MarkLegacyProjectImportAsFinished(c) => {
                self.mark_legacy_project_import_as_finished(c).await
            }
        }
    }
}

/// Fails with [`AggregateError::AlreadyStarted`] when `found` loaded an aggregate
///
/// Creating handlers call this under the aggregate lock, so a repeated request
/// can never overwrite a run that is in progress or already finished.
fn ensure_absent<T>(key: impl Display, found: RepositoryResult<T>) -> Result<()> {
    match found {
        Ok(_) => Err(AggregateError::AlreadyStarted(key.to_string()).into()),
        Err(RepositoryError::NotFound(_)) => Ok(()),
        Err(error) => Err(error.into()),
    }
}
