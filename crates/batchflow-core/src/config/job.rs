//! Per-job execution configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Execution settings carried by every job.
///
/// Engine-wide defaults come from `[engine.defaults]`; templates and
/// creation requests overlay [`JobConfigurationOverrides`] on top.
#[derive(Debug, Clone, PartialEq, Eq, Validate, Serialize, Deserialize)]
pub struct JobConfiguration {
    /// Retries after the first attempt for thrown/timed-out items.
    #[serde(default = "default_max_retries")]
    #[validate(range(max = 100))]
    pub max_retries: u32,
    /// Backoff before an item is re-attempted.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Upper bound on a single processor invocation.
    #[serde(default = "default_timeout_ms")]
    #[validate(range(min = 1))]
    pub timeout_ms: u64,
    /// Batch size for the parallel strategy.
    #[serde(default = "default_concurrency")]
    #[validate(range(min = 1, max = 1000))]
    pub concurrency: usize,
    /// Batch size for the chunked strategy.
    #[serde(default = "default_chunk_size")]
    #[validate(range(min = 1))]
    pub chunk_size: usize,
    /// Keep processing after an item exhausts its retries.
    #[serde(default = "default_true")]
    pub continue_on_error: bool,
    /// Flag completion events for external notification delivery.
    #[serde(default)]
    pub notify_on_complete: bool,
    /// Flag failure events for external notification delivery.
    #[serde(default = "default_true")]
    pub notify_on_error: bool,
    /// Append successful item results to the job's result log.
    #[serde(default = "default_true")]
    pub save_results: bool,
    /// Days a finished job is kept before retention cleanup removes it.
    #[serde(default = "default_cleanup_after_days")]
    pub cleanup_after_days: u32,
}

impl Default for JobConfiguration {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_ms: default_timeout_ms(),
            concurrency: default_concurrency(),
            chunk_size: default_chunk_size(),
            continue_on_error: true,
            notify_on_complete: false,
            notify_on_error: true,
            save_results: true,
            cleanup_after_days: default_cleanup_after_days(),
        }
    }
}

impl JobConfiguration {
    /// Maximum number of processing attempts for a single item.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Return a copy with `overrides` applied field by field.
    pub fn merged(&self, overrides: &JobConfigurationOverrides) -> Self {
        Self {
            max_retries: overrides.max_retries.unwrap_or(self.max_retries),
            retry_delay_ms: overrides.retry_delay_ms.unwrap_or(self.retry_delay_ms),
            timeout_ms: overrides.timeout_ms.unwrap_or(self.timeout_ms),
            concurrency: overrides.concurrency.unwrap_or(self.concurrency),
            chunk_size: overrides.chunk_size.unwrap_or(self.chunk_size),
            continue_on_error: overrides.continue_on_error.unwrap_or(self.continue_on_error),
            notify_on_complete: overrides
                .notify_on_complete
                .unwrap_or(self.notify_on_complete),
            notify_on_error: overrides.notify_on_error.unwrap_or(self.notify_on_error),
            save_results: overrides.save_results.unwrap_or(self.save_results),
            cleanup_after_days: overrides
                .cleanup_after_days
                .unwrap_or(self.cleanup_after_days),
        }
    }
}

/// Partial configuration; every `Some` field replaces the base value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfigurationOverrides {
    /// See [`JobConfiguration::max_retries`].
    #[serde(default)]
    pub max_retries: Option<u32>,
    /// See [`JobConfiguration::retry_delay_ms`].
    #[serde(default)]
    pub retry_delay_ms: Option<u64>,
    /// See [`JobConfiguration::timeout_ms`].
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// See [`JobConfiguration::concurrency`].
    #[serde(default)]
    pub concurrency: Option<usize>,
    /// See [`JobConfiguration::chunk_size`].
    #[serde(default)]
    pub chunk_size: Option<usize>,
    /// See [`JobConfiguration::continue_on_error`].
    #[serde(default)]
    pub continue_on_error: Option<bool>,
    /// See [`JobConfiguration::notify_on_complete`].
    #[serde(default)]
    pub notify_on_complete: Option<bool>,
    /// See [`JobConfiguration::notify_on_error`].
    #[serde(default)]
    pub notify_on_error: Option<bool>,
    /// See [`JobConfiguration::save_results`].
    #[serde(default)]
    pub save_results: Option<bool>,
    /// See [`JobConfiguration::cleanup_after_days`].
    #[serde(default)]
    pub cleanup_after_days: Option<u32>,
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_concurrency() -> usize {
    5
}

fn default_chunk_size() -> usize {
    100
}

fn default_cleanup_after_days() -> u32 {
    30
}
