//! Run summary and reporting
//!
//! Condenses what a run dispatched (commands, events, piece outcomes) into the
//! counters printed by the CLI and logged at the end of a run.

use crate::core::bus::DispatchReport;
use crate::core::worker::WorkerStats;
use crate::domain::commands::Command;
use crate::domain::events::DomainEvent;
use std::time::Duration;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The final notification was published
    Finished,
    /// A failure command was handled
    Failed,
    /// Neither happened before the deadline
    TimedOut,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::TimedOut => "timed out",
        }
    }
}

/// Summary of a clone or legacy import run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Name of the run (`clone`, `legacy-import`)
    pub run: String,

    pub outcome: RunOutcome,

    /// Commands handled, including follow-ups
    pub commands_handled: usize,

    pub events_published: usize,

    /// Pieces reported completed by their aggregate
    pub pieces_completed: usize,

    /// Pieces reported failed by their aggregate or worker
    pub pieces_failed: usize,

    /// Piece jobs abandoned after their run was cancelled
    pub jobs_cancelled: usize,

    /// Failure commands handled
    pub failures: usize,

    /// Reasons of rejected commands
    pub rejections: Vec<String>,

    pub duration: Duration,
}

impl RunSummary {
    /// Builds the summary of a run from its dispatch report and worker counters
    pub fn from_report(
        run: impl Into<String>,
        outcome: RunOutcome,
        report: &DispatchReport,
        stats: &WorkerStats,
    ) -> Self {
        let pieces_completed = report
            .events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    DomainEvent::ExportPieceCompleted { .. }
                        | DomainEvent::PieceImported { .. }
                        | DomainEvent::LegacyProjectImportPieceImported { .. }
                )
            })
            .count();
        let pieces_failed = report
            .commands
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    Command::MarkExportPieceAsFailed(_)
                        | Command::MarkImportPieceAsFailed(_)
                        | Command::MarkLegacyProjectImportPieceAsFailed(_)
                )
            })
            .count();

        Self {
            run: run.into(),
            outcome,
            commands_handled: report.commands.len(),
            events_published: report.events.len(),
            pieces_completed,
            pieces_failed,
            jobs_cancelled: stats.jobs_cancelled,
            failures: report.failures(),
            rejections: report.rejections.clone(),
            duration: Duration::from_secs(0),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Check if the run finished without any failure
    pub fn is_successful(&self) -> bool {
        self.outcome == RunOutcome::Finished && self.failures == 0 && self.rejections.is_empty()
    }

    /// Share of processed pieces that completed, as a percentage
    pub fn success_rate(&self) -> f64 {
        let processed = self.pieces_completed + self.pieces_failed;
        if processed == 0 {
            return 100.0;
        }
        (self.pieces_completed as f64 / processed as f64) * 100.0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            run = %self.run,
            outcome = self.outcome.as_str(),
            commands = self.commands_handled,
            events = self.events_published,
            pieces_completed = self.pieces_completed,
            pieces_failed = self.pieces_failed,
            jobs_cancelled = self.jobs_cancelled,
            duration_ms = self.duration.as_millis(),
            success_rate = format!("{:.2}%", self.success_rate()),
            "Run completed"
        );

        for rejection in &self.rejections {
            tracing::warn!(run = %self.run, reason = %rejection, "Command rejected");
        }
    }
}
