//! In-process event bus for job lifecycle notifications.

use tokio::sync::broadcast;
use tracing;

use batchflow_core::events::{DomainEvent, JobEvent};

/// Broadcasts lifecycle events to any number of subscribers.
///
/// Publishing never blocks; with no subscribers events are dropped, and a
/// lagging subscriber loses the oldest events.
#[derive(Debug, Clone)]
pub struct EventBus {
    /// Broadcast sender shared by all publishers
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size.max(1));
        Self { sender }
    }

    /// Publish a job event
    pub fn publish(&self, event: JobEvent) {
        let event = DomainEvent::from(event);
        tracing::trace!(event = event.name(), "Publishing event");
        let _ = self.sender.send(event);
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}
