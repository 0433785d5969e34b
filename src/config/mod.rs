//! Configuration management for Clonework.
//!
//! TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `CLONEWORK_<SECTION>_<KEY>` environment overrides
//! - Default values for every setting
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use clonework::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("clonework.toml")?;
//! println!("Piece files: {}", config.storage.files_path);
//! println!("Concurrency: {}", config.worker.concurrency);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Application settings (log level)
//! - [`StorageConfig`] - Local file repository directory
//! - [`WorkerConfig`] - Piece worker concurrency, timeouts and queue size
//! - [`LoggingConfig`] - Logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [storage]
//! files_path = "${CLONEWORK_DATA}/files"
//!
//! [worker]
//! concurrency = 4
//! piece_timeout_secs = 300
//! queue_capacity = 1024
//!
//! [logging]
//! local_enabled = true
//! local_path = "./logs"
//! local_rotation = "daily"
//! ```

pub mod loader;
pub mod schema;

pub use loader::load_config;
pub use schema::{ApplicationConfig, CloneworkConfig, LoggingConfig, StorageConfig, WorkerConfig};
