//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "clonework.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Clonework configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Validate configuration: clonework validate-config");
                println!("  3. Try a clone: clonework simulate");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(5) // Fatal error exit code
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Clonework Configuration File

[application]
log_level = "info"

[storage]
files_path = "./clonework-files"

[worker]
concurrency = 4
piece_timeout_secs = 300
queue_capacity = 1024
run_timeout_secs = 600

[logging]
local_enabled = false
local_path = "./logs"
local_rotation = "daily"
local_max_size_mb = 100
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# Clonework Configuration File
#
# Every setting has a default; remove what you do not need to change.
# Values may reference environment variables with ${VAR_NAME}, and any
# setting can be overridden with CLONEWORK_<SECTION>_<KEY>.

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
log_level = "info"

# ============================================================================
# Piece File Storage
# ============================================================================
[storage]
# Directory where piece processors write and read piece files
files_path = "./clonework-files"
# files_path = "${CLONEWORK_DATA}/files"

# ============================================================================
# Piece Worker
# ============================================================================
[worker]
# Piece jobs running at the same time (1-256)
concurrency = 4

# Longest a single piece processor may run before the piece fails
piece_timeout_secs = 300

# Capacity of the piece job queue; keep it above the largest piece count
queue_capacity = 1024

# Longest a whole run may take before it is reported as timed out
run_timeout_secs = 600

# ============================================================================
# Logging Configuration
# ============================================================================
[logging]
# Write JSON logs to a rotating file in addition to the console
local_enabled = false

# Directory of the log files
local_path = "./logs"

# Log rotation (daily or hourly)
local_rotation = "daily"

# Maximum log file size in MB
local_max_size_mb = 100
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CloneworkConfig;
    use tempfile::TempDir;

    #[test]
    fn test_generated_configs_parse_and_validate() {
        for content in [
            InitArgs::generate_minimal_config(),
            InitArgs::generate_config_with_examples(),
        ] {
            let config: CloneworkConfig = toml::from_str(&content).unwrap();
            assert!(config.validate().is_ok());
        }
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("clonework.toml");
        fs::write(&output, "# existing").unwrap();

        let args = InitArgs {
            output: output.to_string_lossy().to_string(),
            with_examples: false,
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), 2);
        assert_eq!(fs::read_to_string(&output).unwrap(), "# existing");

        let args = InitArgs { force: true, ..args };
        assert_eq!(args.execute().await.unwrap(), 0);
        assert!(fs::read_to_string(&output).unwrap().contains("[worker]"));
    }
}
