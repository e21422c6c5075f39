//! Job item entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use batchflow_core::types::id::{ItemId, JobId};

use super::status::ItemStatus;

/// One unit of work inside a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobItem {
    /// Unique item identifier.
    pub id: ItemId,
    /// The owning job.
    pub job_id: JobId,
    /// Zero-based position, fixed at creation.
    pub index: usize,
    /// Type-specific payload.
    pub data: Value,
    /// Current item status.
    pub status: ItemStatus,
    /// Processing attempts so far.
    pub attempts: u32,
    /// Last error message.
    pub error: Option<String>,
    /// Processor result on success.
    pub result: Option<Value>,
    /// When the item reached its last outcome.
    pub processed_at: Option<DateTime<Utc>>,
    /// Duration of the last attempt in milliseconds.
    pub duration_ms: Option<u64>,
}

impl JobItem {
    /// Create a pending item.
    pub fn new(job_id: JobId, index: usize, data: Value) -> Self {
        Self {
            id: ItemId::new(),
            job_id,
            index,
            data,
            status: ItemStatus::Pending,
            attempts: 0,
            error: None,
            result: None,
            processed_at: None,
            duration_ms: None,
        }
    }

    /// Mark the item in flight and count the attempt. Returns the attempt number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.status = ItemStatus::Processing;
        self.attempts += 1;
        self.attempts
    }

    /// Record a successful attempt.
    pub fn complete(&mut self, result: Value, duration_ms: u64) {
        self.status = ItemStatus::Completed;
        self.result = Some(result);
        self.error = None;
        self.duration_ms = Some(duration_ms);
        self.processed_at = Some(Utc::now());
    }

    /// Record a permanent failure.
    pub fn fail(&mut self, error: impl Into<String>, duration_ms: u64) {
        self.status = ItemStatus::Failed;
        self.error = Some(error.into());
        self.duration_ms = Some(duration_ms);
        self.processed_at = Some(Utc::now());
    }

    /// Return the item to the queue after a retryable failure.
    pub fn requeue(&mut self, error: impl Into<String>, duration_ms: u64) {
        self.status = ItemStatus::Pending;
        self.error = Some(error.into());
        self.duration_ms = Some(duration_ms);
    }

    /// Clear all processing state so the item runs from scratch.
    pub fn reset(&mut self) {
        self.status = ItemStatus::Pending;
        self.attempts = 0;
        self.error = None;
        self.processed_at = None;
        self.duration_ms = None;
    }

    /// Handle used to address this item inside its job.
    pub fn item_ref(&self) -> ItemRef {
        ItemRef {
            id: self.id,
            index: self.index,
        }
    }
}

/// Stable address of an item: its ID plus its fixed position in the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemRef {
    /// Item identifier.
    pub id: ItemId,
    /// Zero-based position in the job's item list.
    pub index: usize,
}
