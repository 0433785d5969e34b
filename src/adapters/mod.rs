//! Ports to everything outside the orchestration core, with the reference
//! implementations used by the CLI and the tests.
//!
//! - [`repository`] - Aggregate persistence (in-memory, with save-failure injection)
//! - [`files`] - File repository for piece outputs (local disk)
//! - [`api_events`] - Lifecycle notifications (in-memory)
//! - [`queue`] - Piece job transport (tokio mpsc)
//! - [`pieces`] - Which pieces make up a resource
//! - [`processors`] - File-backed piece processors
//!
//! # Design Pattern
//!
//! Each port is an `async_trait` trait object injected as `Arc<dyn Port>`, so
//! the handlers never depend on a concrete technology:
//!
//! ```rust
//! use clonework::adapters::repository::{ImportRepository, MemoryRepository};
//! use std::sync::Arc;
//!
//! let repository = Arc::new(MemoryRepository::new());
//! let imports: Arc<dyn ImportRepository> = repository.clone();
//! # let _ = imports;
//! ```

pub mod api_events;
pub mod files;
pub mod pieces;
pub mod processors;
pub mod queue;
pub mod repository;
