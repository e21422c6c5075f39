//! Domain events emitted by Batchflow operations.
//!
//! Events are published on the engine's event bus and consumed by
//! external observers such as audit loggers, notification delivery,
//! or UI refresh.

pub mod job;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use job::JobEvent;

/// Wrapper for all domain events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    pub payload: EventPayload,
}

/// Union of all domain event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event")]
pub enum EventPayload {
    /// A job or item lifecycle event.
    Job(JobEvent),
}

impl DomainEvent {
    /// Create a new domain event.
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Dotted event name, e.g. `job.started`.
    pub fn name(&self) -> &'static str {
        match &self.payload {
            EventPayload::Job(event) => event.name(),
        }
    }
}

impl From<JobEvent> for DomainEvent {
    fn from(event: JobEvent) -> Self {
        Self::new(EventPayload::Job(event))
    }
}
