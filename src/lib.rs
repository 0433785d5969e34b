// Clonework - Piece-based project clone and import engine
// Copyright (c) 2025 Clonework Contributors
// Licensed under the MIT License

//! # Clonework - piece-based clone and import engine
//!
//! Clonework moves a project or scenario between platform instances as a set of
//! independently processed **pieces** (metadata, planning grid, features,
//! run results, ...).
//!
//! ## Overview
//!
//! - **Export** splits a resource into pieces and records the files each one
//!   produces
//! - **Import** recreates a resource from an archive, piece by piece, in
//!   dependency batches: a batch starts only when every piece of the previous
//!   batch completed
//! - **Clone** chains the two and publishes a combined notification
//! - **Legacy project import** builds a project from uploaded solver files
//!
//! ## Architecture
//!
//! - [`domain`] - Identifiers, piece kinds, commands, events and errors
//! - [`core`] - Aggregates, command handlers, sagas, bus and piece worker
//! - [`adapters`] - Repository, file storage, notification and queue ports
//!   with in-memory and local-disk implementations
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//! - [`cli`] - Command-line interface
//!
//! ## Commands and Failure Substitution
//!
//! Every state change goes through a command handler. A handler never returns
//! an error: when something local goes wrong (aggregate missing, piece unknown,
//! save failed) it answers with the matching `Mark*AsFailed` command instead,
//! and emits no events. Events are only published after the aggregate was
//! saved.
//!
//! ```rust,no_run
//! use clonework::core::handlers::{CommandHandlers, HandlerPorts};
//! use clonework::domain::commands::{Command, CompletePiece};
//! use clonework::domain::{ComponentId, ImportId};
//!
//! # async fn example(ports: HandlerPorts) {
//! let handlers = CommandHandlers::new(ports);
//! let outcome = handlers
//!     .handle(Command::from(CompletePiece {
//!         import_id: ImportId::new(),
//!         component_id: ComponentId::new(),
//!         warnings: Vec::new(),
//!     }))
//!     .await;
//!
//! // Unknown import: no events, one MarkImportAsFailed
//! assert!(outcome.events.is_empty());
//! assert_eq!(outcome.commands[0].name(), "MarkImportAsFailed");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`domain::Result`], whose error is
//! [`domain::CloneError`]:
//!
//! ```rust,no_run
//! use clonework::domain::CloneError;
//!
//! fn example() -> Result<(), CloneError> {
//!     let config = clonework::config::load_config("clonework.toml")?;
//!     println!("{}", config.worker.concurrency);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
