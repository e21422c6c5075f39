//! Item executor — runs one item through its processor with a timeout,
//! retries, and outcome bookkeeping.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing;

use batchflow_core::events::JobEvent;
use batchflow_core::types::id::ItemId;
use batchflow_entity::job::{
    ErrorRecord, ItemRef, ItemStatus, Job, JobItem, JobStatus, JobView, ResultRecord,
};

use crate::events::EventBus;
use crate::processor::{ProcessOutcome, Processor, ProcessorError};
use crate::stats::ItemTotals;
use crate::store::JobStore;

/// State shared by every item of one execution run.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Job header taken when the run started
    pub job: Arc<JobView>,
    /// Processor for the job's type
    pub processor: Arc<dyn Processor>,
    /// Cancelled when the job is paused, cancelled, or deleted
    pub cancel: CancellationToken,
}

/// Why a single attempt did not produce an outcome.
#[derive(Debug, thiserror::Error)]
pub enum ItemFailure {
    /// The processor returned an error
    #[error("{0}")]
    Processor(#[from] ProcessorError),

    /// The processor did not settle in time
    #[error("Processing timed out after {timeout_ms}ms")]
    TimedOut {
        /// Configured timeout
        timeout_ms: u64,
    },

    /// The processor panicked
    #[error("Processor panicked: {0}")]
    Panicked(String),
}

/// An item exhausted its retries on a job that stops on error.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Item {item_index} failed after {attempts} attempt(s): {message}")]
pub struct FatalItemError {
    /// The failing item
    pub item_id: ItemId,
    /// Its index
    pub item_index: usize,
    /// Attempts made
    pub attempts: u32,
    /// Last error message
    pub message: String,
}

/// How an item left the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Completed and counted
    Succeeded,
    /// Failed permanently and counted
    Failed,
    /// Not attempted, or left pending, because dispatch was halted
    Interrupted,
    /// The job was cancelled or deleted while the item was in flight
    Abandoned,
}

/// Result of writing an outcome back to the store.
enum Settled {
    Counted { progress: u8 },
    Ignored,
}

/// Executes items and records their outcomes on the owning job.
#[derive(Debug, Clone)]
pub struct ItemExecutor {
    /// Job records
    store: Arc<JobStore>,
    /// Lifecycle notifications
    events: EventBus,
    /// Final outcomes across all jobs
    totals: Arc<ItemTotals>,
}

impl ItemExecutor {
    /// Create a new item executor
    pub fn new(store: Arc<JobStore>, events: EventBus) -> Self {
        Self {
            store,
            events,
            totals: Arc::new(ItemTotals::default()),
        }
    }

    /// Running outcome counters
    pub fn totals(&self) -> &ItemTotals {
        &self.totals
    }

    /// Run one item until it succeeds, fails permanently, or dispatch halts.
    pub async fn execute(
        &self,
        ctx: &RunContext,
        item: ItemRef,
    ) -> Result<ItemOutcome, FatalItemError> {
        let job_id = ctx.job.id;
        let config = &ctx.job.configuration;
        let max_attempts = config.max_attempts();

        loop {
            let begun = self.store.update(job_id, |job| {
                if job.status != JobStatus::Running {
                    return None;
                }
                let pos = job.locate(item)?;
                let entry = &mut job.items[pos];
                if entry.status != ItemStatus::Pending || entry.attempts >= max_attempts {
                    return None;
                }
                entry.begin_attempt();
                let snapshot = entry.clone();
                job.touch();
                Some(snapshot)
            });

            let snapshot = match begun {
                Some(Some(snapshot)) => snapshot,
                Some(None) => return Ok(ItemOutcome::Interrupted),
                None => return Ok(ItemOutcome::Abandoned),
            };

            let item_index = item.index;
            let attempt = snapshot.attempts;
            tracing::debug!(
                job_id = %job_id,
                item_index,
                attempt,
                max_attempts,
                "Processing item"
            );

            let started = Instant::now();
            let result = self.invoke(ctx, snapshot).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(ProcessOutcome::Success(value)) => {
                    return Ok(self.record_success(ctx, item, value, duration_ms));
                }
                Ok(ProcessOutcome::Failure(message)) => {
                    tracing::info!(
                        job_id = %job_id,
                        item_index,
                        error = %message,
                        "Item rejected by processor"
                    );
                    return Ok(self.record_rejection(ctx, item, attempt, message, duration_ms));
                }
                Err(failure) => {
                    let message = failure.to_string();
                    let retryable = attempt < max_attempts;
                    let settled =
                        self.record_fault(ctx, item, attempt, &message, retryable, duration_ms);

                    if retryable {
                        if !matches!(settled, Some(Settled::Counted { .. })) {
                            return Ok(ItemOutcome::Abandoned);
                        }
                        tracing::warn!(
                            job_id = %job_id,
                            item_index,
                            attempt,
                            max_attempts,
                            error = %message,
                            "Item failed, retrying after {}ms",
                            config.retry_delay_ms
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(Duration::from_millis(config.retry_delay_ms)) => continue,
                            _ = ctx.cancel.cancelled() => return Ok(ItemOutcome::Interrupted),
                        }
                    }

                    if self.finish_item(ctx, item, settled, false) == ItemOutcome::Abandoned {
                        return Ok(ItemOutcome::Abandoned);
                    }

                    tracing::error!(
                        job_id = %job_id,
                        item_index,
                        attempts = attempt,
                        error = %message,
                        "Item failed permanently"
                    );

                    if !config.continue_on_error {
                        return Err(FatalItemError {
                            item_id: item.id,
                            item_index,
                            attempts: attempt,
                            message,
                        });
                    }
                    return Ok(ItemOutcome::Failed);
                }
            }
        }
    }

    /// Race the processor against the job timeout. The loser is aborted.
    async fn invoke(&self, ctx: &RunContext, item: JobItem) -> Result<ProcessOutcome, ItemFailure> {
        let processor = Arc::clone(&ctx.processor);
        let job = Arc::clone(&ctx.job);
        let timeout_ms = ctx.job.configuration.timeout_ms;

        let mut handle = tokio::spawn(async move { processor.process(&item, &job).await });

        tokio::select! {
            joined = &mut handle => match joined {
                Ok(Ok(outcome)) => Ok(outcome),
                Ok(Err(err)) => Err(ItemFailure::Processor(err)),
                Err(join_err) => Err(ItemFailure::Panicked(join_err.to_string())),
            },
            _ = tokio::time::sleep(Duration::from_millis(timeout_ms)) => {
                handle.abort();
                Err(ItemFailure::TimedOut { timeout_ms })
            }
        }
    }

    fn record_success(
        &self,
        ctx: &RunContext,
        item: ItemRef,
        value: Value,
        duration_ms: u64,
    ) -> ItemOutcome {
        let save_results = ctx.job.configuration.save_results;
        let settled = self.settle(ctx, item, |job, pos, counted| {
            job.items[pos].complete(value.clone(), duration_ms);
            if !counted {
                return;
            }
            job.successful_items += 1;
            job.processed_items += 1;
            if save_results {
                job.results.push(ResultRecord {
                    item_id: item.id,
                    item_index: item.index,
                    result: value,
                    duration_ms,
                    timestamp: Utc::now(),
                });
            }
        });
        self.finish_item(ctx, item, settled, true)
    }

    fn record_rejection(
        &self,
        ctx: &RunContext,
        item: ItemRef,
        attempt: u32,
        message: String,
        duration_ms: u64,
    ) -> ItemOutcome {
        let settled = self.settle(ctx, item, |job, pos, counted| {
            job.items[pos].fail(message.clone(), duration_ms);
            if !counted {
                return;
            }
            job.failed_items += 1;
            job.processed_items += 1;
            // A caller-initiated retry may run the item again.
            job.errors.push(ErrorRecord {
                item_id: Some(item.id),
                item_index: Some(item.index),
                message,
                attempt,
                retryable: true,
                timestamp: Utc::now(),
            });
        });
        self.finish_item(ctx, item, settled, false)
    }

    /// Record a thrown or timed-out attempt. Only exhausted faults are counted;
    /// the caller publishes their outcome.
    fn record_fault(
        &self,
        ctx: &RunContext,
        item: ItemRef,
        attempt: u32,
        message: &str,
        retryable: bool,
        duration_ms: u64,
    ) -> Option<Settled> {
        self.settle(ctx, item, |job, pos, counted| {
            let entry = &mut job.items[pos];
            if retryable {
                entry.requeue(message, duration_ms);
            } else {
                entry.fail(message, duration_ms);
            }
            if !counted {
                return;
            }
            if !retryable {
                job.failed_items += 1;
                job.processed_items += 1;
            }
            job.errors.push(ErrorRecord {
                item_id: Some(item.id),
                item_index: Some(item.index),
                message: message.to_string(),
                attempt,
                retryable,
                timestamp: Utc::now(),
            });
        })
    }

    /// Write an outcome under the job's lock.
    ///
    /// `apply` always updates the item; it receives `counted = false` when the
    /// job was cancelled meanwhile, in which case aggregates must stay as they are.
    /// Returns `None` if the job or item no longer exists.
    fn settle(
        &self,
        ctx: &RunContext,
        item: ItemRef,
        apply: impl FnOnce(&mut Job, usize, bool),
    ) -> Option<Settled> {
        self.store
            .update(ctx.job.id, |job| {
                let pos = job.locate(item)?;
                let counted = job.status != JobStatus::Cancelled;
                apply(job, pos, counted);
                job.touch();
                if !counted {
                    return Some(Settled::Ignored);
                }
                job.recompute_progress();
                Some(Settled::Counted {
                    progress: job.progress,
                })
            })
            .flatten()
    }

    fn finish_item(
        &self,
        ctx: &RunContext,
        item: ItemRef,
        settled: Option<Settled>,
        success: bool,
    ) -> ItemOutcome {
        match settled {
            Some(Settled::Counted { progress }) => {
                self.totals.record(success);
                self.events.publish(JobEvent::ItemProcessed {
                    job_id: ctx.job.id,
                    item_id: item.id,
                    success,
                    progress,
                });
                if success {
                    ItemOutcome::Succeeded
                } else {
                    ItemOutcome::Failed
                }
            }
            Some(Settled::Ignored) | None => {
                tracing::debug!(
                    job_id = %ctx.job.id,
                    item_id = %item.id,
                    "Ignoring late item outcome for cancelled or deleted job"
                );
                ItemOutcome::Abandoned
            }
        }
    }
}
