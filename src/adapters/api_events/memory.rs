//! In-memory API event store

use super::{ApiEvent, ApiEventKind, ApiEventSink};
use crate::domain::ids::ResourceId;
use crate::domain::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

/// Keeps every stored event in memory, in arrival order
#[derive(Default)]
pub struct InMemoryApiEvents {
    events: Mutex<Vec<ApiEvent>>,
    stored: Notify,
}

impl InMemoryApiEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored event
    pub async fn events(&self) -> Vec<ApiEvent> {
        self.events.lock().await.clone()
    }

    /// Stored events of one kind
    pub async fn of_kind(&self, kind: ApiEventKind) -> Vec<ApiEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// Waits until an event of one of `kinds` is stored for `topic`
    ///
    /// Returns `None` if `timeout` elapses first.
    pub async fn wait_for(
        &self,
        topic: ResourceId,
        kinds: &[ApiEventKind],
        timeout: Duration,
    ) -> Option<ApiEvent> {
        let wait = async {
            loop {
                let notified = self.stored.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                if let Some(event) = self
                    .events
                    .lock()
                    .await
                    .iter()
                    .find(|e| e.topic == topic && kinds.contains(&e.kind))
                {
                    return event.clone();
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.ok()
    }
}

#[async_trait]
impl ApiEventSink for InMemoryApiEvents {
    async fn create_if_not_exists(&self, event: ApiEvent) -> Result<bool> {
        let mut events = self.events.lock().await;
        if events.iter().any(|e| e.external_id == event.external_id) {
            tracing::debug!(external_id = %event.external_id, "API event already exists");
            return Ok(false);
        }

        tracing::info!(
            kind = %event.kind,
            topic = %event.topic,
            external_id = %event.external_id,
            "API event created"
        );
        events.push(event);
        drop(events);
        self.stored.notify_waiters();
        Ok(true)
    }
}
