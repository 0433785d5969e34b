//! Finished notifications and the shared notification helper

use super::{CommandHandlers, Outcome};
use crate::adapters::api_events::{ApiEvent, ApiEventKind};
use crate::domain::commands::{
    MarkCloneAsFinished, MarkExportAsFinished, MarkImportAsFinished,
    MarkLegacyProjectImportAsFinished,
};
use crate::domain::ids::ResourceId;
use crate::domain::piece::ResourceKind;
use crate::domain::CloneError;
use crate::log_error_with_context;
use serde_json::json;
use std::fmt::Display;

impl CommandHandlers {
    pub(super) async fn mark_import_as_finished(&self, command: MarkImportAsFinished) -> Outcome {
        let MarkImportAsFinished {
            import_id,
            resource_id,
            resource_kind,
        } = command;

        self.canceller.release(&import_id.to_string());
        tracing::info!(import_id = %import_id, resource_id = %resource_id, "Import finished");
        self.notify(
            ApiEventKind::import_finished(resource_kind),
            resource_id,
            import_id,
            json!({ "importId": import_id, "resourceId": resource_id, "resourceKind": resource_kind }),
        )
        .await;
        Outcome::empty()
    }

    pub(super) async fn mark_clone_as_finished(&self, command: MarkCloneAsFinished) -> Outcome {
        let MarkCloneAsFinished {
            export_id,
            resource_id,
            resource_kind,
        } = command;

        tracing::info!(export_id = %export_id, resource_id = %resource_id, "Clone finished");
        self.notify(
            ApiEventKind::clone_finished(resource_kind),
            resource_id,
            export_id,
            json!({ "exportId": export_id, "resourceId": resource_id, "resourceKind": resource_kind }),
        )
        .await;
        Outcome::empty()
    }

    pub(super) async fn mark_export_as_finished(&self, command: MarkExportAsFinished) -> Outcome {
        self.canceller.release(&command.export_id.to_string());
        let export = match self.exports.find(command.export_id).await {
            Ok(export) => export,
            Err(error) => {
                log_error_with_context!(&error, "Cannot notify finished export");
                return Outcome::empty();
            }
        };

        tracing::info!(
            export_id = %export.id(),
            resource_id = %export.resource_id(),
            "Export finished"
        );
        self.notify(
            ApiEventKind::export_finished(export.resource_kind()),
            export.resource_id(),
            export.id(),
            json!({
                "exportId": export.id(),
                "resourceId": export.resource_id(),
                "resourceKind": export.resource_kind(),
            }),
        )
        .await;
        Outcome::empty()
    }

    pub(super) async fn mark_legacy_project_import_as_finished(
        &self,
        command: MarkLegacyProjectImportAsFinished,
    ) -> Outcome {
        let project_id = command.project_id;

        self.canceller.release(&project_id.to_string());
        tracing::info!(project_id = %project_id, "Legacy project import finished");
        self.notify(
            ApiEventKind::ProjectLegacyImportFinished,
            project_id,
            project_id,
            json!({ "projectId": project_id }),
        )
        .await;
        Outcome::empty()
    }

    /// Publishes a failure notification when the resource kind has one
    pub(super) async fn notify_failure(
        &self,
        kind: Option<ApiEventKind>,
        resource_kind: ResourceKind,
        topic: ResourceId,
        aggregate_id: impl Display + Send,
        data: serde_json::Value,
    ) {
        match kind {
            Some(kind) => self.notify(kind, topic, aggregate_id, data).await,
            None => {
                let unsupported = CloneError::UnsupportedResourceKind(resource_kind);
                tracing::debug!(
                    aggregate_id = %aggregate_id,
                    reason = %unsupported,
                    "No failure notification for resource kind"
                );
            }
        }
    }

    /// Publishes a notification; a sink failure is logged, never propagated
    pub(super) async fn notify(
        &self,
        kind: ApiEventKind,
        topic: ResourceId,
        aggregate_id: impl Display + Send,
        data: serde_json::Value,
    ) {
        let event = ApiEvent::new(kind, topic, aggregate_id, data);
        if let Err(error) = self.api_events.create_if_not_exists(event).await {
            tracing::error!(kind = %kind, topic = %topic, error = %error, "Failed to publish API event");
        }
    }
}
