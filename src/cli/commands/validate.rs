//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Clonework configuration file.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    ///
    /// `load_config` validates while loading, so a loaded configuration is valid.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                println!();
                return Ok(2); // Configuration error exit code
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Files Path: {}", config.storage.files_path);
        println!("  Worker Concurrency: {}", config.worker.concurrency);
        println!("  Piece Timeout: {}s", config.worker.piece_timeout_secs);
        println!("  Queue Capacity: {}", config.worker.queue_capacity);
        println!("  Run Timeout: {}s", config.worker.run_timeout_secs);
        println!(
            "  File Logging: {}",
            if config.logging.local_enabled {
                format!("{} ({})", config.logging.local_path, config.logging.local_rotation)
            } else {
                "disabled".to_string()
            }
        );
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_validate_missing_file_is_configuration_error() {
        let code = ValidateArgs {}.execute("does-not-exist.toml").await.unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_validate_rejects_zero_concurrency() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[worker]\nconcurrency = 0\n").unwrap();
        file.flush().unwrap();

        let path = file.path().to_string_lossy().to_string();
        assert_eq!(ValidateArgs {}.execute(&path).await.unwrap(), 2);
    }
}
