//! Execution strategies — how a run walks the eligible items of a job.

use futures::future::join_all;
use tracing;

use batchflow_core::events::JobEvent;
use batchflow_entity::job::{ItemRef, JobConfiguration, JobStatus, ProcessingMode};

use crate::events::EventBus;
use crate::executor::{FatalItemError, ItemExecutor, RunContext};
use crate::store::JobStore;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every eligible item was dispatched and settled
    Drained,
    /// Dispatch stopped early because the job left `RUNNING` or the run was cancelled
    Halted,
}

/// Dispatch plan for one processing mode.
///
/// Sequential runs one item at a time. Parallel and chunked both dispatch
/// fixed-size batches concurrently and wait for the whole batch before the
/// next one; chunked additionally reports chunk completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionStrategy {
    /// Processing mode
    mode: ProcessingMode,
    /// Items dispatched together
    batch_size: usize,
}

impl ExecutionStrategy {
    /// Strategy for a job's mode and configuration
    pub fn for_job(mode: ProcessingMode, config: &JobConfiguration) -> Self {
        let batch_size = match mode {
            ProcessingMode::Sequential => 1,
            ProcessingMode::Parallel => config.concurrency,
            ProcessingMode::Chunked => config.chunk_size,
        };
        Self {
            mode,
            batch_size: batch_size.max(1),
        }
    }

    /// Maximum number of items in flight at once
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches needed for `item_count` items
    pub fn batch_count(&self, item_count: usize) -> usize {
        item_count.div_ceil(self.batch_size)
    }

    /// Dispatch `items` in index order until drained or halted.
    ///
    /// A fatal item error stops dispatch immediately; items of the same batch
    /// that already started are allowed to settle first.
    pub async fn run(
        &self,
        executor: &ItemExecutor,
        store: &JobStore,
        events: &EventBus,
        ctx: &RunContext,
        items: Vec<ItemRef>,
    ) -> Result<RunOutcome, FatalItemError> {
        let job_id = ctx.job.id;
        let total_chunks = self.batch_count(items.len());

        tracing::debug!(
            job_id = %job_id,
            mode = ?self.mode,
            batch_size = self.batch_size,
            items = items.len(),
            "Dispatching items"
        );

        for (chunk_index, batch) in items.chunks(self.batch_size).enumerate() {
            if should_stop(store, ctx) {
                return Ok(RunOutcome::Halted);
            }

            if self.mode == ProcessingMode::Sequential {
                executor.execute(ctx, batch[0]).await?;
                continue;
            }

            let settled = join_all(batch.iter().map(|item| executor.execute(ctx, *item))).await;
            if let Some(fatal) = settled.into_iter().find_map(Result::err) {
                return Err(fatal);
            }

            if self.mode == ProcessingMode::Chunked {
                tracing::debug!(
                    job_id = %job_id,
                    "Chunk {}/{} completed",
                    chunk_index + 1,
                    total_chunks
                );
                events.publish(JobEvent::ChunkCompleted {
                    job_id,
                    chunk_index,
                    total_chunks,
                });
            }
        }

        if should_stop(store, ctx) {
            Ok(RunOutcome::Halted)
        } else {
            Ok(RunOutcome::Drained)
        }
    }
}

/// Whether dispatch must stop before the next item or batch.
fn should_stop(store: &JobStore, ctx: &RunContext) -> bool {
    ctx.cancel.is_cancelled() || store.status(ctx.job.id) != Some(JobStatus::Running)
}
