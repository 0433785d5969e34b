//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Clonework using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Clonework - piece-based project clone and import engine
#[derive(Parser, Debug)]
#[command(name = "clonework")]
#[command(version, about, long_about = None)]
#[command(author = "Clonework Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "clonework.toml", env = "CLONEWORK_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CLONEWORK_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a clone or legacy import on the in-memory engine
    Simulate(commands::simulate::SimulateArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
