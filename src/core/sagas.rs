//! Sagas
//!
//! Stateless reactions to aggregate-level events. A saga maps one event to the
//! commands that should follow it and never touches a repository.

use crate::domain::commands::{
    Command, MarkCloneAsFinished, MarkExportAsFinished, MarkImportAsFinished,
    MarkLegacyProjectImportAsFinished,
};
use crate::domain::events::DomainEvent;

/// Maps events to follow-up commands
pub trait Saga: Send + Sync {
    fn name(&self) -> &'static str;

    /// Commands to issue for `event`; empty for events the saga ignores
    fn handle(&self, event: &DomainEvent) -> Vec<Command>;
}

/// Finishes an import, and the clone it belongs to when cloning
pub struct AllPiecesImportedSaga;

impl Saga for AllPiecesImportedSaga {
    fn name(&self) -> &'static str {
        "AllPiecesImportedSaga"
    }

    fn handle(&self, event: &DomainEvent) -> Vec<Command> {
        let DomainEvent::AllPiecesImported {
            import_id,
            resource_id,
            resource_kind,
            is_cloning,
            export_id,
        } = event
        else {
            return Vec::new();
        };

        let mut commands = Vec::with_capacity(2);
        if *is_cloning {
            match export_id {
                Some(export_id) => commands.push(
                    MarkCloneAsFinished {
                        export_id: *export_id,
                        resource_id: *resource_id,
                        resource_kind: *resource_kind,
                    }
                    .into(),
                ),
                None => tracing::warn!(
                    import_id = %import_id,
                    "Cloning import finished without a source export"
                ),
            }
        }
        commands.push(
            MarkImportAsFinished {
                import_id: *import_id,
                resource_id: *resource_id,
                resource_kind: *resource_kind,
            }
            .into(),
        );
        commands
    }
}

pub struct AllPiecesExportedSaga;

impl Saga for AllPiecesExportedSaga {
    fn name(&self) -> &'static str {
        "AllPiecesExportedSaga"
    }

    fn handle(&self, event: &DomainEvent) -> Vec<Command> {
        match event {
            DomainEvent::AllPiecesExported { export_id, .. } => {
                vec![MarkExportAsFinished {
                    export_id: *export_id,
                }
                .into()]
            }
            _ => Vec::new(),
        }
    }
}

pub struct AllLegacyProjectPiecesImportedSaga;

impl Saga for AllLegacyProjectPiecesImportedSaga {
    fn name(&self) -> &'static str {
        "AllLegacyProjectPiecesImportedSaga"
    }

    fn handle(&self, event: &DomainEvent) -> Vec<Command> {
        match event {
            DomainEvent::AllLegacyProjectPiecesImported { project_id } => {
                vec![MarkLegacyProjectImportAsFinished {
                    project_id: *project_id,
                }
                .into()]
            }
            _ => Vec::new(),
        }
    }
}

/// Every saga of the engine
pub fn default_sagas() -> Vec<Box<dyn Saga>> {
    vec![
        Box::new(AllPiecesImportedSaga),
        Box::new(AllPiecesExportedSaga),
        Box::new(AllLegacyProjectPiecesImportedSaga),
    ]
}
