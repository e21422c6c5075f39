//! Append-only result and error log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use batchflow_core::types::id::ItemId;

/// A successful item outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// The item that produced the result.
    pub item_id: ItemId,
    /// Index of the item within the job.
    pub item_index: usize,
    /// Processor result payload.
    pub result: Value,
    /// Processing time of the successful attempt.
    pub duration_ms: u64,
    /// When the record was appended.
    pub timestamp: DateTime<Utc>,
}

/// A failed item attempt, or a job-level failure when `item_id` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// The failing item, if any.
    pub item_id: Option<ItemId>,
    /// Index of the failing item, if any.
    pub item_index: Option<usize>,
    /// Error message.
    pub message: String,
    /// Attempt number that produced the error (1-based, 0 for job-level).
    pub attempt: u32,
    /// Whether the item may still run again.
    pub retryable: bool,
    /// When the record was appended.
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    /// A job-level error not tied to a single item.
    pub fn job_level(message: impl Into<String>) -> Self {
        Self {
            item_id: None,
            item_index: None,
            message: message.into(),
            attempt: 0,
            retryable: false,
            timestamp: Utc::now(),
        }
    }

    /// Whether this record describes the whole job.
    pub fn is_job_level(&self) -> bool {
        self.item_id.is_none()
    }
}
