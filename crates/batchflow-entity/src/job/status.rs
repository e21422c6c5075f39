//! Job status, item status, priority, and processing mode enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Created, not yet started (or reset by a retry).
    Pending,
    /// Reserved for an external queueing layer.
    Queued,
    /// Items are being dispatched.
    Running,
    /// Dispatch halted by the caller; in-flight items may still finish.
    Paused,
    /// Finished with at least one success or no failures.
    Completed,
    /// Finished with only failures, or aborted.
    Failed,
    /// Stopped by the caller before natural completion.
    Cancelled,
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Check if the job may be started.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Pending | Self::Queued | Self::Paused)
    }

    /// Check if the job may be cancelled.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            Self::Pending | Self::Queued | Self::Running | Self::Paused
        )
    }

    /// Check if the job can be reset by a retry.
    pub fn can_retry(&self) -> bool {
        matches!(self, Self::Failed | Self::Completed)
    }

    /// Return the status as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a single item within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    /// Waiting to be dispatched (initially, or between retries).
    Pending,
    /// A processor invocation is in flight.
    Processing,
    /// Processed successfully.
    Completed,
    /// Failed permanently.
    Failed,
    /// Never dispatched because the job aborted.
    Skipped,
}

impl ItemStatus {
    /// Check if the item may be dispatched by a strategy.
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Pending | Self::Failed)
    }

    /// Return the status as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Priority level for a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPriority {
    /// Low priority.
    Low,
    /// Normal priority (default).
    #[default]
    Normal,
    /// High priority.
    High,
    /// Critical priority.
    Critical,
}

impl JobPriority {
    /// Return the numeric priority (higher = more urgent).
    pub fn numeric_priority(&self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Normal => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }

    /// Return the priority as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Normal => "NORMAL",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for JobPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Strategy used to walk a job's items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingMode {
    /// One item at a time in index order.
    #[default]
    Sequential,
    /// Batches of `concurrency` items dispatched together.
    Parallel,
    /// Batches of `chunk_size` items with a notification per chunk.
    Chunked,
}

impl ProcessingMode {
    /// Return the mode as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "SEQUENTIAL",
            Self::Parallel => "PARALLEL",
            Self::Chunked => "CHUNKED",
        }
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
