//! Configuration schema types

use crate::core::coordinator::CoordinatorSettings;
use crate::core::worker::WorkerSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main Clonework configuration
///
/// This is the root configuration structure that maps to the TOML file. Every
/// section has defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloneworkConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Where piece files are stored
    #[serde(default)]
    pub storage: StorageConfig,

    /// Piece worker settings
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CloneworkConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.storage.validate()?;
        self.worker.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Piece file storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory of the local file repository
    #[serde(default = "default_files_path")]
    pub files_path: String,
}

impl StorageConfig {
    fn validate(&self) -> Result<(), String> {
        if self.files_path.trim().is_empty() {
            return Err("storage.files_path cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            files_path: default_files_path(),
        }
    }
}

/// Piece worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Piece jobs running at the same time
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Longest a single piece processor may run, in seconds
    #[serde(default = "default_piece_timeout_secs")]
    pub piece_timeout_secs: u64,

    /// Capacity of the piece job queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Longest a whole run may take before it is reported as timed out
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

impl WorkerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 || self.concurrency > 256 {
            return Err(format!(
                "worker.concurrency must be between 1 and 256, got {}",
                self.concurrency
            ));
        }
        if self.piece_timeout_secs == 0 {
            return Err("worker.piece_timeout_secs must be > 0".to_string());
        }
        if self.queue_capacity == 0 {
            return Err("worker.queue_capacity must be > 0".to_string());
        }
        if self.run_timeout_secs == 0 {
            return Err("worker.run_timeout_secs must be > 0".to_string());
        }
        Ok(())
    }

    /// Settings of the coordinator built from this section
    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            worker: WorkerSettings {
                concurrency: self.concurrency,
                piece_timeout: Duration::from_secs(self.piece_timeout_secs),
            },
            queue_capacity: self.queue_capacity,
            run_timeout: Duration::from_secs(self.run_timeout_secs),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            piece_timeout_secs: default_piece_timeout_secs(),
            queue_capacity: default_queue_capacity(),
            run_timeout_secs: default_run_timeout_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,

    /// Maximum log file size in MB
    #[serde(default = "default_local_max_size_mb")]
    pub local_max_size_mb: usize,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_max_size_mb == 0 {
            return Err("logging.local_max_size_mb must be > 0".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
            local_max_size_mb: default_local_max_size_mb(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_files_path() -> String {
    "./clonework-files".to_string()
}

fn default_concurrency() -> usize {
    4
}

fn default_piece_timeout_secs() -> u64 {
    300
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_run_timeout_secs() -> u64 {
    600
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

fn default_local_max_size_mb() -> usize {
    100
}
