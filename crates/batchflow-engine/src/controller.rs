//! Job controller — owns job records and drives the lifecycle state machine.
//!
//! Caller-facing transitions are serialized by the run-table lock. Each
//! `start`/`resume` spawns one run task per job; the task owns its
//! cancellation token and removes itself from the run table when done.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing;
use validator::Validate;

use batchflow_core::config::engine::EngineConfig;
use batchflow_core::error::AppError;
use batchflow_core::events::{DomainEvent, JobEvent};
use batchflow_core::result::AppResult;
use batchflow_core::types::id::{JobId, TenantId};
use batchflow_core::types::pagination::{PageRequest, PageResponse};
use batchflow_entity::job::{
    CreateJob, ErrorRecord, ItemStatus, Job, JobConfiguration, JobItem, JobPriority, JobStatus,
    JobView, ResultRecord,
};
use batchflow_entity::template::{CreateJobFromTemplate, JobTemplate};

use crate::events::EventBus;
use crate::executor::{FatalItemError, ItemExecutor, RunContext};
use crate::processor::{ProcessOutcome, Processor, ProcessorError, ProcessorRegistry};
use crate::processors;
use crate::stats::{JobSummary, QueueStats, ServiceStats};
use crate::store::JobStore;
use crate::strategy::{ExecutionStrategy, RunOutcome};
use crate::template::TemplateCatalog;

/// Criteria for [`JobController::list_jobs`]. Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobFilter {
    /// Only jobs in this status
    #[serde(default)]
    pub status: Option<JobStatus>,
    /// Only jobs of this type
    #[serde(default)]
    pub job_type: Option<String>,
    /// Only jobs of this tenant
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    /// Only jobs with this priority
    #[serde(default)]
    pub priority: Option<JobPriority>,
}

impl JobFilter {
    /// Whether `job` satisfies every set criterion
    pub fn matches(&self, job: &Job) -> bool {
        self.status.is_none_or(|status| job.status == status)
            && self
                .job_type
                .as_deref()
                .is_none_or(|job_type| job.job_type == job_type)
            && self
                .tenant_id
                .is_none_or(|tenant| job.tenant_id == Some(tenant))
            && self.priority.is_none_or(|priority| job.priority == priority)
    }
}

/// An active execution run of one job.
#[derive(Debug)]
struct RunHandle {
    /// Stops dispatch of further items
    cancel: CancellationToken,
    /// The spawned run task
    task: JoinHandle<()>,
    /// Distinguishes this run from earlier runs of the same job
    generation: u64,
}

type RunTable = Arc<Mutex<HashMap<JobId, RunHandle>>>;

/// Batch job engine entry point.
#[derive(Debug)]
pub struct JobController {
    /// Job records
    store: Arc<JobStore>,
    /// Processors by job type
    registry: Arc<ProcessorRegistry>,
    /// Template presets
    templates: TemplateCatalog,
    /// Lifecycle notifications
    events: EventBus,
    /// Per-item execution
    executor: Arc<ItemExecutor>,
    /// Engine-wide job configuration defaults
    defaults: JobConfiguration,
    /// How long `shutdown` waits for active runs
    shutdown_grace: Duration,
    /// Active runs by job
    runs: RunTable,
    /// Next run generation
    generation: AtomicU64,
    /// Set once `shutdown` begins; no new runs are launched after that
    closed: AtomicBool,
}

impl JobController {
    /// Create an empty controller; no processors or templates are registered
    pub fn new(config: &EngineConfig) -> Self {
        let store = Arc::new(JobStore::new());
        let events = EventBus::new(config.event_buffer_size);
        let executor = Arc::new(ItemExecutor::new(Arc::clone(&store), events.clone()));

        Self {
            store,
            registry: Arc::new(ProcessorRegistry::new()),
            templates: TemplateCatalog::new(),
            events,
            executor,
            defaults: config.defaults.clone(),
            shutdown_grace: Duration::from_secs(config.shutdown_grace_seconds),
            runs: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Validate `config` and build a controller with the configured built-ins
    pub fn from_config(config: &EngineConfig) -> AppResult<Self> {
        config.validate()?;
        let controller = Self::new(config);

        if config.register_builtin_processors {
            processors::register_builtin(&controller.registry);
        }
        if config.register_builtin_templates {
            controller.templates.register_builtin()?;
        }

        tracing::info!(
            "Job controller ready: {} processor(s), {} template(s)",
            controller.registry.len(),
            controller.templates.len()
        );
        Ok(controller)
    }

    // ── Creation ─────────────────────────────────────────────────────

    /// Create a pending job from engine defaults plus the request's overrides
    pub async fn create_job(&self, request: CreateJob) -> AppResult<JobView> {
        request.validate()?;
        let configuration = self.defaults.merged(&request.configuration);
        self.insert_job(request, configuration)
    }

    /// Create a pending job from a template plus the request's overrides
    pub async fn create_job_from_template(
        &self,
        template_id: &str,
        request: CreateJobFromTemplate,
    ) -> AppResult<JobView> {
        let template = self.templates.get(template_id)?;
        let (request, configuration) = template.instantiate(request);
        request.validate()?;
        self.insert_job(request, configuration)
    }

    fn insert_job(&self, request: CreateJob, configuration: JobConfiguration) -> AppResult<JobView> {
        if !self.registry.has(&request.job_type) {
            return Err(AppError::not_found(format!(
                "No processor registered for job type '{}'",
                request.job_type
            )));
        }
        configuration.validate()?;

        let job = Job::new(request, configuration);
        let view = job.view();
        self.store.insert(job);

        tracing::info!(
            "Created job {} '{}' of type '{}' with {} item(s)",
            view.id,
            view.name,
            view.job_type,
            view.total_items
        );
        self.events.publish(JobEvent::Created {
            job_id: view.id,
            job_type: view.job_type.clone(),
            total_items: view.total_items,
        });
        Ok(view)
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Full job record including items and logs
    pub fn get_job(&self, job_id: JobId) -> AppResult<Job> {
        self.store.get(job_id).ok_or_else(|| job_not_found(job_id))
    }

    /// Page through job headers, highest priority first, then oldest first
    pub fn list_jobs(&self, filter: &JobFilter, page: &PageRequest) -> PageResponse<JobView> {
        let mut views = Vec::new();
        self.store.for_each(|job| {
            if filter.matches(job) {
                views.push(job.view());
            }
        });
        views.sort_by(|a, b| {
            b.priority
                .numeric_priority()
                .cmp(&a.priority.numeric_priority())
                .then(a.created_at.cmp(&b.created_at))
        });
        PageResponse::paginate(views, page)
    }

    /// Items of a job in index order, optionally only those in `status`
    pub fn get_job_items(
        &self,
        job_id: JobId,
        status: Option<ItemStatus>,
    ) -> AppResult<Vec<JobItem>> {
        self.store
            .read(job_id, |job| {
                job.items
                    .iter()
                    .filter(|item| status.is_none_or(|s| item.status == s))
                    .cloned()
                    .collect()
            })
            .ok_or_else(|| job_not_found(job_id))
    }

    /// The job's error log
    pub fn get_job_errors(&self, job_id: JobId) -> AppResult<Vec<ErrorRecord>> {
        self.store
            .read(job_id, |job| job.errors.clone())
            .ok_or_else(|| job_not_found(job_id))
    }

    /// The job's result log
    pub fn get_job_results(&self, job_id: JobId) -> AppResult<Vec<ResultRecord>> {
        self.store
            .read(job_id, |job| job.results.clone())
            .ok_or_else(|| job_not_found(job_id))
    }

    /// Derived summary of one job
    pub fn get_job_summary(&self, job_id: JobId) -> AppResult<JobSummary> {
        let now = Utc::now();
        self.store
            .read(job_id, |job| JobSummary::from_job(job, now))
            .ok_or_else(|| job_not_found(job_id))
    }

    /// Job counts by status
    pub fn queue_stats(&self) -> QueueStats {
        let mut stats = QueueStats::default();
        self.store.for_each(|job| stats.record(job.status));
        stats
    }

    /// Engine-wide aggregates
    pub fn service_stats(&self) -> ServiceStats {
        let mut stats = ServiceStats::default();
        self.store.for_each(|job| stats.record(job));
        self.executor.totals().fill(&mut stats);
        stats.processor_types = self.registry.registered_types();
        stats.registered_processors = stats.processor_types.len();
        stats.templates = self.templates.len();
        stats
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Start a pending or paused job. Returns once the run has been spawned.
    pub async fn start_job(&self, job_id: JobId) -> AppResult<JobView> {
        self.launch(job_id, false).await
    }

    /// Resume a paused job over its remaining eligible items
    pub async fn resume_job(&self, job_id: JobId) -> AppResult<JobView> {
        self.launch(job_id, true).await
    }

    async fn launch(&self, job_id: JobId, resuming: bool) -> AppResult<JobView> {
        let mut runs = self.runs.lock().await;
        if self.closed.load(Ordering::Acquire) {
            return Err(AppError::service_unavailable("Job engine is shutting down"));
        }

        let job_type = self
            .store
            .read(job_id, |job| job.job_type.clone())
            .ok_or_else(|| job_not_found(job_id))?;
        let processor = self.registry.get(&job_type).ok_or_else(|| {
            AppError::not_found(format!(
                "No processor registered for job type '{}'",
                job_type
            ))
        })?;

        let view = self
            .store
            .update(job_id, |job| {
                let allowed = if resuming {
                    job.status == JobStatus::Paused
                } else {
                    job.status.can_start()
                };
                if !allowed {
                    return Err(AppError::conflict(format!(
                        "Cannot {} job {} in status {}",
                        if resuming { "resume" } else { "start" },
                        job_id,
                        job.status.as_str()
                    )));
                }
                let now = Utc::now();
                job.status = JobStatus::Running;
                job.started_at.get_or_insert(now);
                job.updated_at = now;
                Ok(job.view())
            })
            .ok_or_else(|| job_not_found(job_id))??;

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let previous = runs.remove(&job_id).map(|run| {
            run.cancel.cancel();
            run.task
        });

        let task = RunTask {
            job_id,
            generation,
            cancel: cancel.clone(),
            processor,
            previous,
            store: Arc::clone(&self.store),
            executor: Arc::clone(&self.executor),
            events: self.events.clone(),
            runs: Arc::clone(&self.runs),
        };
        let handle = tokio::spawn(task.run());
        runs.insert(
            job_id,
            RunHandle {
                cancel,
                task: handle,
                generation,
            },
        );
        drop(runs);

        if resuming {
            tracing::info!("Job {} resumed", job_id);
            self.events.publish(JobEvent::Resumed { job_id });
        } else {
            tracing::info!(
                "Job {} started ({} mode, {} item(s))",
                job_id,
                view.processing_mode.as_str(),
                view.total_items
            );
            self.events.publish(JobEvent::Started { job_id });
        }
        Ok(view)
    }

    /// Pause a running job. In-flight items finish; no new items start.
    pub async fn pause_job(&self, job_id: JobId) -> AppResult<JobView> {
        let runs = self.runs.lock().await;

        let view = self
            .store
            .update(job_id, |job| {
                if job.status != JobStatus::Running {
                    return Err(AppError::conflict(format!(
                        "Cannot pause job {} in status {}",
                        job_id,
                        job.status.as_str()
                    )));
                }
                job.status = JobStatus::Paused;
                job.touch();
                Ok(job.view())
            })
            .ok_or_else(|| job_not_found(job_id))??;

        if let Some(run) = runs.get(&job_id) {
            run.cancel.cancel();
        }
        drop(runs);

        tracing::info!(
            "Job {} paused after {} item(s)",
            job_id,
            view.processed_items
        );
        self.events.publish(JobEvent::Paused {
            job_id,
            processed_items: view.processed_items,
        });
        Ok(view)
    }

    /// Cancel a job that has not finished. Late item outcomes are not counted.
    pub async fn cancel_job(&self, job_id: JobId) -> AppResult<JobView> {
        let runs = self.runs.lock().await;

        let view = self
            .store
            .update(job_id, |job| {
                if !job.status.can_cancel() {
                    return Err(AppError::conflict(format!(
                        "Cannot cancel job {} in status {}",
                        job_id,
                        job.status.as_str()
                    )));
                }
                let now = Utc::now();
                job.status = JobStatus::Cancelled;
                job.completed_at = Some(now);
                job.updated_at = now;
                Ok(job.view())
            })
            .ok_or_else(|| job_not_found(job_id))??;

        if let Some(run) = runs.get(&job_id) {
            run.cancel.cancel();
        }
        drop(runs);

        tracing::info!("Job {} cancelled", job_id);
        self.events.publish(JobEvent::Cancelled {
            job_id,
            processed_items: view.processed_items,
        });
        Ok(view)
    }

    /// Reset failed and skipped items of a finished job; the job returns to `PENDING`
    pub async fn retry_job(&self, job_id: JobId) -> AppResult<JobView> {
        let _runs = self.runs.lock().await;

        let (view, reset_items) = self
            .store
            .update(job_id, |job| {
                if !job.status.can_retry() {
                    return Err(AppError::conflict(format!(
                        "Cannot retry job {} in status {}",
                        job_id,
                        job.status.as_str()
                    )));
                }
                let reset = job.reset_for_retry();
                Ok((job.view(), reset))
            })
            .ok_or_else(|| job_not_found(job_id))??;

        tracing::info!("Job {} reset for retry ({} item(s))", job_id, reset_items);
        self.events.publish(JobEvent::Retried {
            job_id,
            reset_items,
        });
        Ok(view)
    }

    /// Remove a job that is not running, with all of its items
    pub async fn delete_job(&self, job_id: JobId) -> AppResult<()> {
        let mut runs = self.runs.lock().await;

        let status = self
            .store
            .status(job_id)
            .ok_or_else(|| job_not_found(job_id))?;
        let running_conflict = || {
            AppError::conflict(format!("Cannot delete job {} while it is running", job_id))
        };
        if status == JobStatus::Running {
            return Err(running_conflict());
        }
        self.store
            .remove_if(job_id, |job| job.status != JobStatus::Running)
            .ok_or_else(running_conflict)?;

        if let Some(run) = runs.remove(&job_id) {
            run.cancel.cancel();
        }
        drop(runs);

        tracing::info!("Job {} deleted", job_id);
        self.events.publish(JobEvent::Deleted { job_id });
        Ok(())
    }

    /// Delete finished jobs whose retention period ended before `now`
    pub async fn cleanup_expired_jobs(&self, now: DateTime<Utc>) -> usize {
        let _runs = self.runs.lock().await;

        let mut removed = 0;
        for job_id in self.store.ids_where(|job| job.is_expired(now)) {
            if self.store.remove_if(job_id, |job| job.is_expired(now)).is_some() {
                removed += 1;
                self.events.publish(JobEvent::Deleted { job_id });
            }
        }

        if removed > 0 {
            tracing::info!("Retention cleanup removed {} expired job(s)", removed);
        } else {
            tracing::debug!("Retention cleanup found no expired jobs");
        }
        removed
    }

    // ── Registries ───────────────────────────────────────────────────

    /// Register or replace the processor for a job type
    pub fn register_processor(&self, job_type: impl Into<String>, processor: Arc<dyn Processor>) {
        self.registry.register(job_type, processor);
    }

    /// Register an async closure as the processor for a job type
    pub fn register_fn<F, Fut>(&self, job_type: impl Into<String>, func: F)
    where
        F: Fn(JobItem, JobView) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ProcessOutcome, ProcessorError>> + Send + 'static,
    {
        self.registry.register_fn(job_type, func);
    }

    /// Whether a processor is registered for `job_type`
    pub fn has_processor(&self, job_type: &str) -> bool {
        self.registry.has(job_type)
    }

    /// Register a template, bumping its version if the ID exists
    pub fn register_template(&self, template: JobTemplate) -> AppResult<JobTemplate> {
        self.templates.register(template)
    }

    /// Look up a template
    pub fn get_template(&self, template_id: &str) -> AppResult<JobTemplate> {
        self.templates.get(template_id)
    }

    /// All templates, sorted by ID
    pub fn list_templates(&self) -> Vec<JobTemplate> {
        self.templates.list()
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    // ── Shutdown ─────────────────────────────────────────────────────

    /// Stop every active run and wait up to the grace period for them to exit.
    ///
    /// Jobs that were still running are left `PAUSED` so they can be resumed.
    pub async fn shutdown(&self) {
        let active: Vec<RunHandle> = {
            let mut runs = self.runs.lock().await;
            self.closed.store(true, Ordering::Release);
            runs.drain().map(|(_, run)| run).collect()
        };

        tracing::info!("Shutting down job controller ({} active run(s))", active.len());

        for run in &active {
            run.cancel.cancel();
        }
        let tasks = join_all(active.into_iter().map(|run| run.task));
        if tokio::time::timeout(self.shutdown_grace, tasks).await.is_err() {
            tracing::warn!(
                "Shutdown grace period of {}s elapsed with runs still active",
                self.shutdown_grace.as_secs()
            );
        }

        for job_id in self.store.ids_where(|job| job.status == JobStatus::Running) {
            let parked = self
                .store
                .update(job_id, |job| {
                    (job.status == JobStatus::Running).then(|| {
                        job.status = JobStatus::Paused;
                        job.touch();
                        job.processed_items
                    })
                })
                .flatten();
            if let Some(processed_items) = parked {
                self.events.publish(JobEvent::Paused {
                    job_id,
                    processed_items,
                });
            }
        }

        tracing::info!("Job controller shut down");
    }
}

fn job_not_found(job_id: JobId) -> AppError {
    AppError::not_found(format!("Job {} not found", job_id))
}

/// One spawned execution run.
struct RunTask {
    job_id: JobId,
    generation: u64,
    cancel: CancellationToken,
    processor: Arc<dyn Processor>,
    /// Task of the run this one replaces
    previous: Option<JoinHandle<()>>,
    store: Arc<JobStore>,
    executor: Arc<ItemExecutor>,
    events: EventBus,
    runs: RunTable,
}

impl RunTask {
    async fn run(mut self) {
        // Items still in flight from the previous run settle before eligibility is computed.
        if let Some(previous) = self.previous.take() {
            let _ = previous.await;
        }

        let prepared = self
            .store
            .update(self.job_id, |job| {
                (job.status == JobStatus::Running).then(|| (job.view(), job.take_eligible_items()))
            })
            .flatten();

        if let Some((view, items)) = prepared {
            let strategy = ExecutionStrategy::for_job(view.processing_mode, &view.configuration);
            let ctx = RunContext {
                job: Arc::new(view),
                processor: Arc::clone(&self.processor),
                cancel: self.cancel.clone(),
            };

            match strategy
                .run(&self.executor, &self.store, &self.events, &ctx, items)
                .await
            {
                Ok(RunOutcome::Drained) => self.finalize(),
                Ok(RunOutcome::Halted) => {
                    tracing::debug!("Run {} of job {} halted", self.generation, self.job_id);
                }
                Err(fatal) => self.abort(fatal),
            }
        }

        self.release().await;
    }

    /// Settle a drained job as completed or failed
    fn finalize(&self) {
        let finished = self
            .store
            .update(self.job_id, |job| {
                (job.status == JobStatus::Running).then(|| {
                    let status = job.finish();
                    (
                        status,
                        job.successful_items,
                        job.failed_items,
                        job.configuration.clone(),
                    )
                })
            })
            .flatten();

        let Some((status, successful_items, failed_items, configuration)) = finished else {
            return;
        };

        if status == JobStatus::Completed {
            tracing::info!(
                "Job {} completed: {} succeeded, {} failed",
                self.job_id,
                successful_items,
                failed_items
            );
            self.events.publish(JobEvent::Completed {
                job_id: self.job_id,
                successful_items,
                failed_items,
                notify: configuration.notify_on_complete,
            });
        } else {
            tracing::warn!(
                "Job {} failed: all {} processed item(s) failed",
                self.job_id,
                failed_items
            );
            self.events.publish(JobEvent::Failed {
                job_id: self.job_id,
                error: None,
                notify: configuration.notify_on_error,
            });
        }
    }

    /// Fail the job after an item exhausted its retries with `continue_on_error` off
    fn abort(&self, fatal: FatalItemError) {
        let message = fatal.to_string();
        let notify = self
            .store
            .update(self.job_id, |job| {
                (job.status == JobStatus::Running).then(|| {
                    job.abort(message.clone());
                    job.configuration.notify_on_error
                })
            })
            .flatten();

        let Some(notify) = notify else {
            return;
        };

        tracing::error!("Job {} aborted: {}", self.job_id, message);
        self.events.publish(JobEvent::Failed {
            job_id: self.job_id,
            error: Some(message),
            notify,
        });
    }

    /// Drop this run from the run table unless a newer run replaced it
    async fn release(&self) {
        let mut runs = self.runs.lock().await;
        if runs
            .get(&self.job_id)
            .is_some_and(|run| run.generation == self.generation)
        {
            runs.remove(&self.job_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchflow_core::config::job::JobConfigurationOverrides;
    use batchflow_entity::job::types;
    use serde_json::json;

    fn controller() -> JobController {
        JobController::from_config(&EngineConfig::default()).expect("controller")
    }

    #[tokio::test]
    async fn test_create_requires_processor() {
        let controller = JobController::new(&EngineConfig::default());
        let err = controller
            .create_job(CreateJob::new("x", "UNKNOWN", vec![json!({})]))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(controller.queue_stats().total, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_zero_concurrency() {
        let controller = controller();
        let request = CreateJob::new("x", types::CUSTOM, vec![json!({})]).with_configuration(
            JobConfigurationOverrides {
                concurrency: Some(0),
                ..Default::default()
            },
        );
        let err = controller.create_job(request).await.unwrap_err();
        assert_eq!(err.kind, batchflow_core::error::ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_create_from_template() {
        let controller = controller();
        let view = controller
            .create_job_from_template(
                "bulk-import",
                CreateJobFromTemplate {
                    items: vec![json!({"entity": "customer", "record": {}})],
                    configuration_overrides: JobConfigurationOverrides {
                        max_retries: Some(0),
                        ..Default::default()
                    },
                    ..Default::default()
                },
            )
            .await
            .expect("create");

        assert_eq!(view.job_type, types::DATA_IMPORT);
        assert_eq!(view.configuration.chunk_size, 500);
        assert_eq!(view.configuration.max_retries, 0);

        let err = controller
            .create_job_from_template("missing", CreateJobFromTemplate::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_orders_by_priority_then_age() {
        let controller = controller();
        let mut low = CreateJob::new("low", types::CUSTOM, Vec::new());
        low.priority = JobPriority::Low;
        let mut critical = CreateJob::new("critical", types::CUSTOM, Vec::new());
        critical.priority = JobPriority::Critical;

        controller.create_job(low).await.expect("create");
        controller
            .create_job(CreateJob::new("normal", types::CUSTOM, Vec::new()))
            .await
            .expect("create");
        controller.create_job(critical).await.expect("create");

        let page = controller.list_jobs(&JobFilter::default(), &PageRequest::default());
        let names: Vec<&str> = page.items.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["critical", "normal", "low"]);

        let filter = JobFilter {
            priority: Some(JobPriority::Low),
            ..Default::default()
        };
        assert_eq!(
            controller.list_jobs(&filter, &PageRequest::default()).total_items,
            1
        );
    }

    #[tokio::test]
    async fn test_conflicting_transitions() {
        let controller = controller();
        let view = controller
            .create_job(CreateJob::new("x", types::CUSTOM, vec![json!({})]))
            .await
            .expect("create");

        assert!(controller.pause_job(view.id).await.unwrap_err().is_conflict());
        assert!(controller.resume_job(view.id).await.unwrap_err().is_conflict());
        assert!(controller.retry_job(view.id).await.unwrap_err().is_conflict());
        assert!(controller.start_job(JobId::new()).await.unwrap_err().is_not_found());
        assert_eq!(controller.get_job(view.id).expect("job").status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_cleanup_removes_expired_jobs() {
        let controller = controller();
        let view = controller
            .create_job(CreateJob::new("x", types::CUSTOM, vec![json!({})]))
            .await
            .expect("create");
        controller
            .create_job(CreateJob::new("kept", types::CUSTOM, vec![json!({})]))
            .await
            .expect("create");
        controller.cancel_job(view.id).await.expect("cancel");

        assert_eq!(controller.cleanup_expired_jobs(Utc::now()).await, 0);
        let later = Utc::now() + chrono::Duration::days(31);
        assert_eq!(controller.cleanup_expired_jobs(later).await, 1);
        assert!(controller.get_job(view.id).unwrap_err().is_not_found());
        assert_eq!(controller.queue_stats().pending, 1);
    }

    #[tokio::test]
    async fn test_service_stats_reports_registry() {
        let controller = controller();
        let stats = controller.service_stats();
        assert_eq!(stats.registered_processors, types::BUILTIN.len());
        assert_eq!(stats.templates, controller.list_templates().len());
        assert_eq!(stats.total_jobs, 0);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[tokio::test]
    async fn test_start_after_shutdown_is_refused() {
        let controller = controller();
        let view = controller
            .create_job(CreateJob::new("x", types::CUSTOM, vec![json!({})]))
            .await
            .expect("create");

        controller.shutdown().await;

        let err = controller.start_job(view.id).await.unwrap_err();
        assert_eq!(err.kind, batchflow_core::error::ErrorKind::ServiceUnavailable);
        assert_eq!(controller.get_job(view.id).expect("job").status, JobStatus::Pending);
    }
}
