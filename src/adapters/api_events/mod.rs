//! API event notifications
//!
//! Lifecycle handlers report finished and failed exports, imports and clones
//! as API events. Consumers poll these events; they are never deleted, and an
//! event is stored at most once per external id.

pub mod memory;

pub use memory::InMemoryApiEvents;

use crate::domain::ids::ResourceId;
use crate::domain::piece::ResourceKind;
use crate::domain::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a lifecycle notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiEventKind {
    #[serde(rename = "project.import.finished")]
    ProjectImportFinished,
    #[serde(rename = "project.import.failed")]
    ProjectImportFailed,
    #[serde(rename = "project.export.finished")]
    ProjectExportFinished,
    #[serde(rename = "project.export.failed")]
    ProjectExportFailed,
    #[serde(rename = "project.clone.finished")]
    ProjectCloneFinished,
    #[serde(rename = "scenario.import.finished")]
    ScenarioImportFinished,
    #[serde(rename = "scenario.export.finished")]
    ScenarioExportFinished,
    #[serde(rename = "scenario.clone.finished")]
    ScenarioCloneFinished,
    #[serde(rename = "project.legacy.import.finished")]
    ProjectLegacyImportFinished,
    #[serde(rename = "project.legacy.import.failed")]
    ProjectLegacyImportFailed,
}

impl ApiEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectImportFinished => "project.import.finished",
            Self::ProjectImportFailed => "project.import.failed",
            Self::ProjectExportFinished => "project.export.finished",
            Self::ProjectExportFailed => "project.export.failed",
            Self::ProjectCloneFinished => "project.clone.finished",
            Self::ScenarioImportFinished => "scenario.import.finished",
            Self::ScenarioExportFinished => "scenario.export.finished",
            Self::ScenarioCloneFinished => "scenario.clone.finished",
            Self::ProjectLegacyImportFinished => "project.legacy.import.finished",
            Self::ProjectLegacyImportFailed => "project.legacy.import.failed",
        }
    }

    pub fn import_finished(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Project => Self::ProjectImportFinished,
            ResourceKind::Scenario => Self::ScenarioImportFinished,
        }
    }

    pub fn export_finished(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Project => Self::ProjectExportFinished,
            ResourceKind::Scenario => Self::ScenarioExportFinished,
        }
    }

    pub fn clone_finished(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Project => Self::ProjectCloneFinished,
            ResourceKind::Scenario => Self::ScenarioCloneFinished,
        }
    }

    /// Failure kind of an import; scenarios have none yet
    pub fn import_failed(kind: ResourceKind) -> Option<Self> {
        match kind {
            ResourceKind::Project => Some(Self::ProjectImportFailed),
            ResourceKind::Scenario => None,
        }
    }

    /// Failure kind of an export; scenarios have none yet
    pub fn export_failed(kind: ResourceKind) -> Option<Self> {
        match kind {
            ResourceKind::Project => Some(Self::ProjectExportFailed),
            ResourceKind::Scenario => None,
        }
    }
}

impl fmt::Display for ApiEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    pub kind: ApiEventKind,

    /// Resource the event is about
    pub topic: ResourceId,

    /// Deduplication key, see [`compose_external_id`]
    pub external_id: String,

    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl ApiEvent {
    /// Creates an event whose external id is derived from `aggregate_id`
    pub fn new(
        kind: ApiEventKind,
        topic: ResourceId,
        aggregate_id: impl fmt::Display,
        data: serde_json::Value,
    ) -> Self {
        Self {
            kind,
            topic,
            external_id: compose_external_id(aggregate_id, kind),
            data,
            timestamp: Utc::now(),
        }
    }
}

/// External id of an event: `<aggregateId>.<kind>`
pub fn compose_external_id(aggregate_id: impl fmt::Display, kind: ApiEventKind) -> String {
    format!("{aggregate_id}.{kind}")
}

/// Destination of lifecycle notifications
#[async_trait]
pub trait ApiEventSink: Send + Sync {
    /// Store the event unless one with the same external id exists
    ///
    /// Returns `true` if the event was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink is unavailable.
    async fn create_if_not_exists(&self, event: ApiEvent) -> Result<bool>;
}
