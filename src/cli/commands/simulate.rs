//! Simulate command implementation
//!
//! Runs a full clone or legacy import on the in-memory stack, with piece
//! processors that write and read JSON files under `storage.files_path`.

use crate::adapters::files::{FileRepository, LocalFileRepository};
use crate::adapters::pieces::StaticResourcePieces;
use crate::adapters::processors::{file_processors, FailingPieces};
use crate::config::load_config;
use crate::core::coordinator::{CloneCoordinator, CloneRequest, LegacyImportRequest};
use crate::core::summary::{RunOutcome, RunSummary};
use crate::domain::legacy::{LegacyProjectImportFile, LegacyProjectImportFileType};
use crate::domain::{ResourceId, ResourceKind, UserId};
use clap::{Args, ValueEnum};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::watch;

/// Which run to simulate
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SimulateRun {
    /// Export a resource and import it as a clone
    Clone,
    /// Upload legacy project files and import them
    Legacy,
}

/// Stage whose processor fails `--fail-piece`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailStage {
    Export,
    Import,
}

/// Arguments for the simulate command
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Run to simulate
    #[arg(long, value_enum, default_value_t = SimulateRun::Clone)]
    pub run: SimulateRun,

    /// Resource kind to clone (project or scenario)
    #[arg(long, default_value = "project")]
    pub kind: String,

    /// Piece whose processor fails, in kebab case (e.g. planning-units-grid)
    #[arg(long)]
    pub fail_piece: Option<String>,

    /// Stage of a clone at which `--fail-piece` fails
    #[arg(long, value_enum, default_value_t = FailStage::Import)]
    pub fail_stage: FailStage,

    /// Upload a solutions file with the legacy project
    #[arg(long)]
    pub with_solutions: bool,
}

impl SimulateArgs {
    /// Execute the simulate command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(run = ?self.run, "Starting simulation");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        let kind: ResourceKind = match self.kind.parse() {
            Ok(kind) => kind,
            Err(e) => {
                eprintln!("{e}");
                return Ok(2);
            }
        };

        let failing = match self.failing_pieces() {
            Ok(failing) => failing,
            Err(e) => {
                eprintln!("{e}");
                return Ok(2);
            }
        };

        let files: Arc<dyn FileRepository> =
            Arc::new(LocalFileRepository::new(&config.storage.files_path));
        let processors = file_processors(Arc::clone(&files), failing)?;
        let coordinator = CloneCoordinator::new(
            processors,
            Arc::new(StaticResourcePieces::new()),
            config.worker.coordinator_settings(),
        );
        let worker = coordinator.start(shutdown_signal).await?;

        println!("🚀 Starting {} simulation...", self.run_name());
        println!();

        let summary = match self.run {
            SimulateRun::Clone => {
                let request = match kind {
                    ResourceKind::Project => CloneRequest::project(ResourceId::new(), UserId::new()),
                    ResourceKind::Scenario => {
                        CloneRequest::scenario(ResourceId::new(), ResourceId::new(), UserId::new())
                    }
                };
                match coordinator.clone_resource(request).await {
                    Ok(summary) => summary,
                    Err(e) => {
                        tracing::error!(error = %e, "Clone failed");
                        eprintln!("Clone failed: {e}");
                        return Ok(5);
                    }
                }
            }
            SimulateRun::Legacy => {
                let request = LegacyImportRequest {
                    project_id: ResourceId::new(),
                    scenario_id: ResourceId::new(),
                    owner_id: UserId::new(),
                    files: self.upload_legacy_files(files.as_ref()).await?,
                };
                coordinator.legacy_import(request).await
            }
        };
        worker.abort();

        print_summary(&summary);
        summary.log_summary();

        let api_events = coordinator.api_events().events().await;
        if !api_events.is_empty() {
            println!("📣 API events:");
            for event in &api_events {
                println!("  - {} ({})", event.kind, event.external_id);
            }
            println!();
        }

        let exit_code = match summary.outcome {
            RunOutcome::Finished if summary.is_successful() => {
                println!("✅ Simulation completed successfully!");
                0
            }
            RunOutcome::Finished => {
                println!("⚠️  Simulation finished with rejected commands");
                1
            }
            RunOutcome::Failed => {
                println!("❌ Simulation run failed");
                1
            }
            RunOutcome::TimedOut => {
                println!("⏱️  Simulation timed out");
                5
            }
        };
        Ok(exit_code)
    }

    fn run_name(&self) -> &'static str {
        match self.run {
            SimulateRun::Clone => "clone",
            SimulateRun::Legacy => "legacy import",
        }
    }

    fn failing_pieces(&self) -> Result<FailingPieces, String> {
        let Some(piece) = &self.fail_piece else {
            return Ok(FailingPieces::default());
        };

        let mut failing = FailingPieces::default();
        match (self.run, self.fail_stage) {
            (SimulateRun::Clone, FailStage::Export) => failing.export = Some(parse_piece(piece)?),
            (SimulateRun::Clone, FailStage::Import) => failing.import = Some(parse_piece(piece)?),
            (SimulateRun::Legacy, _) => failing.legacy = Some(parse_piece(piece)?),
        }
        Ok(failing)
    }

    /// Stores placeholder legacy project files and describes them
    async fn upload_legacy_files(
        &self,
        files: &dyn FileRepository,
    ) -> anyhow::Result<Vec<LegacyProjectImportFile>> {
        let mut types = LegacyProjectImportFileType::REQUIRED.to_vec();
        types.push(LegacyProjectImportFileType::BoundDat);
        if self.with_solutions {
            types.push(LegacyProjectImportFileType::Output);
        }

        let mut uploaded = Vec::with_capacity(types.len());
        for file_type in types {
            let content = format!("{}\n", file_type.file_name());
            let uri = files.save(&mut content.as_bytes(), "dat").await?;
            uploaded.push(LegacyProjectImportFile::new(uri, file_type));
        }
        Ok(uploaded)
    }
}

/// Parses a kebab-case piece name
fn parse_piece<P: DeserializeOwned>(name: &str) -> Result<P, String> {
    serde_json::from_value(serde_json::Value::String(name.to_string()))
        .map_err(|_| format!("Unknown piece '{name}'"))
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("📊 Run Summary:");
    println!("  Run: {}", summary.run);
    println!("  Outcome: {}", summary.outcome.as_str());
    println!("  Commands Handled: {}", summary.commands_handled);
    println!("  Events Published: {}", summary.events_published);
    println!("  Pieces Completed: {}", summary.pieces_completed);
    println!("  Pieces Failed: {}", summary.pieces_failed);
    println!("  Jobs Cancelled: {}", summary.jobs_cancelled);
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!("  Success Rate: {:.2}%", summary.success_rate());
    println!();

    if !summary.rejections.is_empty() {
        println!("⚠️  Rejected commands:");
        for reason in &summary.rejections {
            println!("  - {reason}");
        }
        println!();
    }
}
