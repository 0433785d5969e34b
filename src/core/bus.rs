//! Command dispatch and event publication
//!
//! [`CommandDispatcher::dispatch`] runs a command and everything it causes:
//! events staged by the handler are published on the [`EventBus`], the
//! commands returned by sagas and subscribers are queued behind the handler's
//! own follow-up commands, and the loop ends when the queue is empty.

use crate::core::handlers::CommandHandlers;
use crate::core::sagas::Saga;
use crate::domain::commands::Command;
use crate::domain::events::DomainEvent;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;

/// Reacts to published events, possibly with I/O
///
/// Unlike a [`Saga`], a subscriber may talk to ports. It reports its own
/// failures as commands.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    fn name(&self) -> &'static str;

    async fn on_event(&self, event: &DomainEvent) -> Vec<Command>;
}

/// Sagas and subscribers listening to domain events
#[derive(Default)]
pub struct EventBus {
    sagas: Vec<Box<dyn Saga>>,
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sagas(mut self, sagas: Vec<Box<dyn Saga>>) -> Self {
        self.sagas.extend(sagas);
        self
    }

    pub fn subscribe(mut self, subscriber: Arc<dyn EventSubscriber>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Publishes an event and collects the commands it causes
    pub async fn publish(&self, event: &DomainEvent) -> Vec<Command> {
        tracing::debug!(event = event.name(), "Publishing event");

        let mut commands = Vec::new();
        for subscriber in &self.subscribers {
            commands.extend(subscriber.on_event(event).await);
        }
        for saga in &self.sagas {
            let issued = saga.handle(event);
            if !issued.is_empty() {
                tracing::debug!(
                    saga = saga.name(),
                    event = event.name(),
                    commands = issued.len(),
                    "Saga issued commands"
                );
            }
            commands.extend(issued);
        }
        commands
    }
}

/// Everything a dispatch handled
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Commands handled, in order
    pub commands: Vec<Command>,

    /// Events published, in order
    pub events: Vec<DomainEvent>,

    /// Reasons of rejected commands
    pub rejections: Vec<String>,
}

impl DispatchReport {
    /// Number of failure commands handled
    pub fn failures(&self) -> usize {
        self.commands.iter().filter(|c| c.is_failure()).count()
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.commands.iter().map(Command::name).collect()
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.iter().map(DomainEvent::name).collect()
    }

    /// What was added to this report after `earlier` was taken from it
    pub fn since(&self, earlier: &DispatchReport) -> DispatchReport {
        DispatchReport {
            commands: self.commands.iter().skip(earlier.commands.len()).cloned().collect(),
            events: self.events.iter().skip(earlier.events.len()).cloned().collect(),
            rejections: self
                .rejections
                .iter()
                .skip(earlier.rejections.len())
                .cloned()
                .collect(),
        }
    }

    pub fn merge(&mut self, other: DispatchReport) {
        self.commands.extend(other.commands);
        self.events.extend(other.events);
        self.rejections.extend(other.rejections);
    }
}

/// Runs commands through the handlers and the event bus
pub struct CommandDispatcher {
    handlers: CommandHandlers,
    bus: EventBus,
}

impl CommandDispatcher {
    pub fn new(handlers: CommandHandlers, bus: EventBus) -> Self {
        Self { handlers, bus }
    }

    /// Handles `command` and every command it leads to
    pub async fn dispatch(&self, command: impl Into<Command>) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut queue = VecDeque::from([command.into()]);

        while let Some(command) = queue.pop_front() {
            report.commands.push(command.clone());
            let outcome = self.handlers.handle(command).await;

            if let Some(reason) = outcome.rejection {
                report.rejections.push(reason);
            }
            for event in outcome.events {
                queue.extend(self.bus.publish(&event).await);
                report.events.push(event);
            }
            queue.extend(outcome.commands);
        }

        report
    }
}
