//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use batchflow_core::config::job::{JobConfiguration, JobConfigurationOverrides};
use batchflow_core::types::id::{JobId, TenantId, UserId};

use super::item::{ItemRef, JobItem};
use super::record::{ErrorRecord, ResultRecord};
use super::schedule::JobSchedule;
use super::status::{ItemStatus, JobPriority, JobStatus, ProcessingMode};

/// A batch job and all of its items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: JobId,
    /// Human-readable name.
    pub name: String,
    /// Localized display name.
    pub name_localized: Option<String>,
    /// Tenant the job belongs to.
    pub tenant_id: Option<TenantId>,
    /// Job type; selects the processor.
    pub job_type: String,
    /// Ordering hint.
    pub priority: JobPriority,
    /// Strategy used to walk the items.
    pub processing_mode: ProcessingMode,
    /// Current job status.
    pub status: JobStatus,
    /// Items in index order.
    pub items: Vec<JobItem>,
    /// Number of items, fixed at creation.
    pub total_items: usize,
    /// Items with a final outcome.
    pub processed_items: usize,
    /// Items that completed successfully.
    pub successful_items: usize,
    /// Items that failed permanently.
    pub failed_items: usize,
    /// Percentage of processed items (0–100).
    pub progress: u8,
    /// Execution settings.
    pub configuration: JobConfiguration,
    /// Optional schedule metadata.
    pub schedule: Option<JobSchedule>,
    /// Successful item outcomes.
    pub results: Vec<ResultRecord>,
    /// Failed attempts and job-level failures.
    pub errors: Vec<ErrorRecord>,
    /// User who created the job.
    pub created_by: Option<UserId>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was last updated.
    pub updated_at: DateTime<Utc>,
    /// When the job first started running.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job last finished.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Round `processed / total` to a whole percentage.
pub fn progress_percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (processed as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

impl Job {
    /// Build a pending job from a validated request and its resolved configuration.
    pub fn new(request: CreateJob, configuration: JobConfiguration) -> Self {
        let id = JobId::new();
        let now = Utc::now();
        let items: Vec<JobItem> = request
            .items
            .into_iter()
            .enumerate()
            .map(|(index, data)| JobItem::new(id, index, data))
            .collect();

        Self {
            id,
            name: request.name,
            name_localized: request.name_localized,
            tenant_id: request.tenant_id,
            job_type: request.job_type,
            priority: request.priority,
            processing_mode: request.processing_mode,
            status: JobStatus::Pending,
            total_items: items.len(),
            items,
            processed_items: 0,
            successful_items: 0,
            failed_items: 0,
            progress: 0,
            configuration,
            schedule: request.schedule,
            results: Vec::new(),
            errors: Vec::new(),
            created_by: request.created_by,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// Bump `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Recompute `progress` from the counters.
    pub fn recompute_progress(&mut self) {
        self.progress = progress_percent(self.processed_items, self.total_items);
    }

    /// Position of `item` in `items`, checked against its ID.
    pub fn locate(&self, item: ItemRef) -> Option<usize> {
        let found = self.items.get(item.index)?;
        debug_assert_eq!(found.id, item.id, "item moved from index {}", item.index);
        (found.id == item.id).then_some(item.index)
    }

    /// Read-only header handed to processors.
    pub fn view(&self) -> JobView {
        JobView {
            id: self.id,
            name: self.name.clone(),
            name_localized: self.name_localized.clone(),
            tenant_id: self.tenant_id,
            job_type: self.job_type.clone(),
            priority: self.priority,
            processing_mode: self.processing_mode,
            status: self.status,
            configuration: self.configuration.clone(),
            total_items: self.total_items,
            processed_items: self.processed_items,
            successful_items: self.successful_items,
            failed_items: self.failed_items,
            progress: self.progress,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }

    /// Collect the items a new run should dispatch, in index order.
    ///
    /// Failed items that still have attempts left are withdrawn from the
    /// aggregates so their next outcome is counted exactly once.
    pub fn take_eligible_items(&mut self) -> Vec<ItemRef> {
        let max_attempts = self.configuration.max_attempts();
        let mut eligible = Vec::new();
        let mut withdrawn = 0;

        for item in &mut self.items {
            match item.status {
                ItemStatus::Pending => eligible.push(item.item_ref()),
                ItemStatus::Failed if item.attempts < max_attempts => {
                    item.status = ItemStatus::Pending;
                    withdrawn += 1;
                    eligible.push(item.item_ref());
                }
                _ => {}
            }
        }

        if withdrawn > 0 {
            self.failed_items -= withdrawn;
            self.processed_items -= withdrawn;
            self.recompute_progress();
        }

        eligible
    }

    /// Settle the status after a run drained every eligible item.
    pub fn finish(&mut self) -> JobStatus {
        let now = Utc::now();
        self.status = if self.successful_items > 0 || self.failed_items == 0 {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        };
        if self.total_items == 0 {
            self.progress = 100;
        }
        self.completed_at = Some(now);
        self.updated_at = now;
        if let Some(schedule) = self.schedule.as_mut() {
            schedule.record_run(now);
        }
        self.status
    }

    /// Fail the whole job with a job-level error; undispatched items become skipped.
    pub fn abort(&mut self, message: impl Into<String>) {
        let now = Utc::now();
        for item in &mut self.items {
            if item.status == ItemStatus::Pending {
                item.status = ItemStatus::Skipped;
            }
        }
        self.errors.push(ErrorRecord::job_level(message));
        self.status = JobStatus::Failed;
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    /// Reset failed and skipped items for another run. Returns how many were reset.
    pub fn reset_for_retry(&mut self) -> usize {
        let mut reset = 0;
        for item in &mut self.items {
            if matches!(item.status, ItemStatus::Failed | ItemStatus::Skipped) {
                item.reset();
                reset += 1;
            }
        }
        self.failed_items = 0;
        self.processed_items = self.successful_items;
        self.recompute_progress();
        self.errors.clear();
        self.status = JobStatus::Pending;
        self.completed_at = None;
        self.touch();
        reset
    }

    /// Whether retention cleanup may remove this job at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        if !self.status.is_terminal() {
            return false;
        }
        let finished = self.completed_at.unwrap_or(self.updated_at);
        let retention = chrono::Duration::days(i64::from(self.configuration.cleanup_after_days));
        finished + retention <= now
    }
}

/// Job header without items, shared with processors and list views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobView {
    /// Job identifier.
    pub id: JobId,
    /// Human-readable name.
    pub name: String,
    /// Localized display name.
    pub name_localized: Option<String>,
    /// Tenant scope.
    pub tenant_id: Option<TenantId>,
    /// Job type.
    pub job_type: String,
    /// Ordering hint.
    pub priority: JobPriority,
    /// Processing strategy.
    pub processing_mode: ProcessingMode,
    /// Status at the time the view was taken.
    pub status: JobStatus,
    /// Execution settings.
    pub configuration: JobConfiguration,
    /// Number of items.
    pub total_items: usize,
    /// Items with a final outcome.
    pub processed_items: usize,
    /// Successful items.
    pub successful_items: usize,
    /// Permanently failed items.
    pub failed_items: usize,
    /// Percentage complete.
    pub progress: u8,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// First start time.
    pub started_at: Option<DateTime<Utc>>,
    /// Last finish time.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Data required to create a new job.
#[derive(Debug, Clone, Default, Validate, Serialize, Deserialize)]
pub struct CreateJob {
    /// Job name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Localized job name.
    #[serde(default)]
    pub name_localized: Option<String>,
    /// Tenant scope.
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    /// Job type; a processor must be registered for it.
    #[validate(length(min = 1))]
    pub job_type: String,
    /// Priority.
    #[serde(default)]
    pub priority: JobPriority,
    /// Processing strategy.
    #[serde(default)]
    pub processing_mode: ProcessingMode,
    /// Overrides applied on top of the engine or template defaults.
    #[serde(default)]
    pub configuration: JobConfigurationOverrides,
    /// Item payloads in processing order.
    #[serde(default)]
    pub items: Vec<Value>,
    /// Schedule metadata.
    #[serde(default)]
    pub schedule: Option<JobSchedule>,
    /// User who created the job.
    #[serde(default)]
    pub created_by: Option<UserId>,
}

impl CreateJob {
    /// A request with default settings.
    pub fn new(name: impl Into<String>, job_type: impl Into<String>, items: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            job_type: job_type.into(),
            items,
            ..Default::default()
        }
    }

    /// Set the processing strategy.
    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.processing_mode = mode;
        self
    }

    /// Set configuration overrides.
    pub fn with_configuration(mut self, overrides: JobConfigurationOverrides) -> Self {
        self.configuration = overrides;
        self
    }
}
