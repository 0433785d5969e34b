//! Logging and observability
//!
//! Structured logging built on `tracing`:
//! - Console output for development
//! - JSON-formatted log files with daily or hourly rotation
//! - Log level taken from configuration, overridable with `RUST_LOG`
//!
//! # Example
//!
//! ```no_run
//! use clonework::logging::init_logging;
//! use clonework::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log that a handler replaced a local failure with a failure command
///
/// # Example
///
/// ```no_run
/// use clonework::log_failure_substitution;
/// use clonework::domain::ImportId;
///
/// let import_id = ImportId::new();
/// log_failure_substitution!("CompletePiece", &import_id, "piece not found");
/// ```
#[macro_export]
macro_rules! log_failure_substitution {
    ($command:expr, $aggregate_id:expr, $reason:expr) => {
        tracing::warn!(
            command = $command,
            aggregate_id = %$aggregate_id,
            reason = %$reason,
            "Substituting local failure with failure command"
        );
    };
}

/// Log the start of a clone or legacy import run
///
/// # Example
///
/// ```no_run
/// use clonework::log_run_start;
/// use clonework::domain::ResourceId;
///
/// let resource_id = ResourceId::new();
/// log_run_start!("clone", &resource_id);
/// ```
#[macro_export]
macro_rules! log_run_start {
    ($run:expr, $resource_id:expr) => {
        tracing::info!(
            run = $run,
            resource_id = %$resource_id,
            "Starting run"
        );
    };
}

/// Log the end of a run
///
/// # Example
///
/// ```no_run
/// use clonework::log_run_complete;
/// use std::time::Duration;
///
/// log_run_complete!("clone", 42, Duration::from_secs(3));
/// ```
#[macro_export]
macro_rules! log_run_complete {
    ($run:expr, $commands:expr, $duration:expr) => {
        tracing::info!(
            run = $run,
            commands = $commands,
            duration_ms = $duration.as_millis() as u64,
            "Run completed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use clonework::log_error_with_context;
/// use clonework::domain::CloneError;
///
/// let error = CloneError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
