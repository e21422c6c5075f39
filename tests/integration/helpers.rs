//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast;

use batchflow_core::config::engine::EngineConfig;
use batchflow_core::config::job::{JobConfiguration, JobConfigurationOverrides};
use batchflow_core::events::{DomainEvent, EventPayload};
use batchflow_core::types::id::JobId;
use batchflow_engine::JobController;
use batchflow_entity::job::{CreateJob, Job, JobStatus, JobView, ProcessingMode};

/// How long a wait helper polls before failing the test
const WAIT_TIMEOUT: Duration = Duration::from_secs(10);
/// Poll interval of the wait helpers
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Test engine context
pub struct TestEngine {
    /// The controller under test
    pub controller: JobController,
}

impl TestEngine {
    /// An engine with built-in processors and templates and a short retry delay
    pub fn new() -> Self {
        let config = EngineConfig {
            defaults: JobConfiguration {
                retry_delay_ms: 5,
                timeout_ms: 2_000,
                ..Default::default()
            },
            shutdown_grace_seconds: 2,
            ..Default::default()
        };
        let controller = JobController::from_config(&config).expect("Failed to build controller");
        Self { controller }
    }

    /// Create a job and return its view
    pub async fn create(
        &self,
        job_type: &str,
        mode: ProcessingMode,
        items: Vec<Value>,
        overrides: JobConfigurationOverrides,
    ) -> JobView {
        let request = CreateJob::new(format!("{} test job", job_type), job_type, items)
            .with_mode(mode)
            .with_configuration(overrides);
        self.controller
            .create_job(request)
            .await
            .expect("Failed to create job")
    }

    /// Poll until `predicate` holds for the job; panics after the wait timeout
    pub async fn wait_until(&self, job_id: JobId, predicate: impl Fn(&Job) -> bool) -> Job {
        let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
        loop {
            let job = self.controller.get_job(job_id).expect("Job disappeared");
            if predicate(&job) {
                return job;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "Timed out waiting for job {} (status {}, processed {}/{})",
                job_id,
                job.status.as_str(),
                job.processed_items,
                job.total_items
            );
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Poll until the job reaches `status`
    pub async fn wait_for_status(&self, job_id: JobId, status: JobStatus) -> Job {
        self.wait_until(job_id, |job| job.status == status).await
    }

    /// Poll until the job has no active run left in a terminal status
    pub async fn wait_for_terminal(&self, job_id: JobId) -> Job {
        self.wait_until(job_id, |job| job.status.is_terminal()).await
    }
}

/// `count` payloads of the form `{"id": n}`, starting at 1
pub fn numbered_items(count: usize) -> Vec<Value> {
    (1..=count).map(|n| serde_json::json!({ "id": n })).collect()
}

/// Names of the events for `job_id`, up to and including the first named `last`
pub async fn events_until(
    rx: &mut broadcast::Receiver<DomainEvent>,
    job_id: JobId,
    last: &str,
) -> Vec<String> {
    let mut names = Vec::new();
    let collect = async {
        loop {
            let event = rx.recv().await.expect("Event channel closed");
            let EventPayload::Job(job_event) = &event.payload;
            if job_event.job_id() != job_id {
                continue;
            }
            names.push(event.name().to_string());
            if event.name() == last {
                break;
            }
        }
    };
    if tokio::time::timeout(WAIT_TIMEOUT, collect).await.is_err() {
        panic!("Timed out waiting for event '{}'", last);
    }
    names
}
