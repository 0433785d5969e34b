//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::CloneworkConfig;
use crate::domain::errors::CloneError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into CloneworkConfig
/// 4. Applies environment variable overrides (CLONEWORK_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read or parsed, if a
/// referenced environment variable is not set, or if validation fails.
///
/// # Examples
///
/// ```no_run
/// use clonework::config::loader::load_config;
///
/// let config = load_config("clonework.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<CloneworkConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(CloneError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        CloneError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: CloneworkConfig = toml::from_str(&contents)
        .map_err(|e| CloneError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        CloneError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| CloneError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&cap[0], &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(CloneError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

/// Parses a numeric override, naming the variable when it is malformed
fn parse_override<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CloneError::Configuration(format!("Invalid value '{value}' for {name}"))
    })
}

/// Applies environment variable overrides using CLONEWORK_* prefix
///
/// Environment variables follow the pattern: CLONEWORK_<SECTION>_<KEY>
/// For example: CLONEWORK_WORKER_CONCURRENCY, CLONEWORK_STORAGE_FILES_PATH
fn apply_env_overrides(config: &mut CloneworkConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("CLONEWORK_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Storage overrides
    if let Ok(val) = std::env::var("CLONEWORK_STORAGE_FILES_PATH") {
        config.storage.files_path = val;
    }

    // Worker overrides
    if let Ok(val) = std::env::var("CLONEWORK_WORKER_CONCURRENCY") {
        config.worker.concurrency = parse_override("CLONEWORK_WORKER_CONCURRENCY", &val)?;
    }
    if let Ok(val) = std::env::var("CLONEWORK_WORKER_PIECE_TIMEOUT_SECS") {
        config.worker.piece_timeout_secs =
            parse_override("CLONEWORK_WORKER_PIECE_TIMEOUT_SECS", &val)?;
    }
    if let Ok(val) = std::env::var("CLONEWORK_WORKER_QUEUE_CAPACITY") {
        config.worker.queue_capacity = parse_override("CLONEWORK_WORKER_QUEUE_CAPACITY", &val)?;
    }
    if let Ok(val) = std::env::var("CLONEWORK_WORKER_RUN_TIMEOUT_SECS") {
        config.worker.run_timeout_secs =
            parse_override("CLONEWORK_WORKER_RUN_TIMEOUT_SECS", &val)?;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("CLONEWORK_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("CLONEWORK_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("CLONEWORK_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}
