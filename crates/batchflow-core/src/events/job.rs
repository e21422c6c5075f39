//! Job and item lifecycle events.

use serde::{Deserialize, Serialize};

use crate::types::id::{ItemId, JobId};

/// Lifecycle notifications emitted by the job controller and executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JobEvent {
    /// A job was created.
    Created {
        /// The job ID.
        job_id: JobId,
        /// The job type.
        job_type: String,
        /// Number of items in the job.
        total_items: usize,
    },
    /// A job started running.
    Started {
        /// The job ID.
        job_id: JobId,
    },
    /// A running job was paused.
    Paused {
        /// The job ID.
        job_id: JobId,
        /// Items processed so far.
        processed_items: usize,
    },
    /// A paused job was resumed.
    Resumed {
        /// The job ID.
        job_id: JobId,
    },
    /// A job was cancelled by the caller.
    Cancelled {
        /// The job ID.
        job_id: JobId,
        /// Items processed before cancellation.
        processed_items: usize,
    },
    /// A finished job was reset for another run.
    Retried {
        /// The job ID.
        job_id: JobId,
        /// Number of items reset to pending.
        reset_items: usize,
    },
    /// A job finished with at least one success or no failures.
    Completed {
        /// The job ID.
        job_id: JobId,
        /// Items that succeeded.
        successful_items: usize,
        /// Items that failed permanently.
        failed_items: usize,
        /// Whether external notification delivery was requested.
        notify: bool,
    },
    /// A job finished without any success, or aborted.
    Failed {
        /// The job ID.
        job_id: JobId,
        /// Job-level error, if the job aborted.
        error: Option<String>,
        /// Whether external notification delivery was requested.
        notify: bool,
    },
    /// A job and its items were removed.
    Deleted {
        /// The job ID.
        job_id: JobId,
    },
    /// An item reached its final outcome.
    ItemProcessed {
        /// The job ID.
        job_id: JobId,
        /// The item ID.
        item_id: ItemId,
        /// Whether the item succeeded.
        success: bool,
        /// Job progress after this item (0–100).
        progress: u8,
    },
    /// A chunk of a chunked job finished.
    ChunkCompleted {
        /// The job ID.
        job_id: JobId,
        /// Zero-based chunk index.
        chunk_index: usize,
        /// Total number of chunks in this run.
        total_chunks: usize,
    },
}

impl JobEvent {
    /// Dotted event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "job.created",
            Self::Started { .. } => "job.started",
            Self::Paused { .. } => "job.paused",
            Self::Resumed { .. } => "job.resumed",
            Self::Cancelled { .. } => "job.cancelled",
            Self::Retried { .. } => "job.retried",
            Self::Completed { .. } => "job.completed",
            Self::Failed { .. } => "job.failed",
            Self::Deleted { .. } => "job.deleted",
            Self::ItemProcessed { .. } => "item.processed",
            Self::ChunkCompleted { .. } => "job.chunk.completed",
        }
    }

    /// The job this event belongs to.
    pub fn job_id(&self) -> JobId {
        match self {
            Self::Created { job_id, .. }
            | Self::Started { job_id }
            | Self::Paused { job_id, .. }
            | Self::Resumed { job_id }
            | Self::Cancelled { job_id, .. }
            | Self::Retried { job_id, .. }
            | Self::Completed { job_id, .. }
            | Self::Failed { job_id, .. }
            | Self::Deleted { job_id }
            | Self::ItemProcessed { job_id, .. }
            | Self::ChunkCompleted { job_id, .. } => *job_id,
        }
    }
}
