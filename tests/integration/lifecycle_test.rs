//! Integration tests for the job lifecycle state machine.

mod helpers;

use std::time::Duration;

use serde_json::json;

use batchflow_core::config::job::JobConfigurationOverrides;
use batchflow_engine::{ProcessOutcome, ProcessorError};
use batchflow_entity::job::types;
use batchflow_entity::job::{ItemStatus, JobItem, JobStatus, JobView, ProcessingMode};

use helpers::{TestEngine, events_until, numbered_items};

/// Register a processor that sleeps `delay_ms` and then succeeds
fn register_slow(engine: &TestEngine, job_type: &str, delay_ms: u64) {
    engine
        .controller
        .register_fn(job_type, move |item: JobItem, _job: JobView| async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            Ok::<_, ProcessorError>(ProcessOutcome::Success(item.data))
        });
}

#[tokio::test]
async fn test_custom_job_completes() {
    let engine = TestEngine::new();
    let mut events = engine.controller.subscribe();

    let view = engine
        .create(
            types::CUSTOM,
            ProcessingMode::Sequential,
            vec![json!({"id": 1}), json!({"id": 2})],
            JobConfigurationOverrides::default(),
        )
        .await;
    assert_eq!(view.status, JobStatus::Pending);

    let started = engine.controller.start_job(view.id).await.expect("start");
    assert_eq!(started.status, JobStatus::Running);

    let job = engine.wait_for_status(view.id, JobStatus::Completed).await;
    assert_eq!(job.processed_items, 2);
    assert_eq!(job.successful_items, 2);
    assert_eq!(job.failed_items, 0);
    assert_eq!(job.progress, 100);
    assert!(job.started_at.is_some());
    assert!(job.completed_at.is_some());
    assert_eq!(engine.controller.get_job_results(view.id).expect("results").len(), 2);

    let names = events_until(&mut events, view.id, "job.completed").await;
    assert_eq!(
        names,
        vec![
            "job.created",
            "job.started",
            "item.processed",
            "item.processed",
            "job.completed"
        ]
    );
}

#[tokio::test]
async fn test_empty_job_completes_immediately() {
    let engine = TestEngine::new();
    let view = engine
        .create(
            types::CUSTOM,
            ProcessingMode::Parallel,
            Vec::new(),
            JobConfigurationOverrides::default(),
        )
        .await;

    engine.controller.start_job(view.id).await.expect("start");

    let job = engine.wait_for_status(view.id, JobStatus::Completed).await;
    assert_eq!(job.progress, 100);
    assert_eq!(job.processed_items, 0);
    assert!(job.results.is_empty());
}

#[tokio::test]
async fn test_pause_and_resume_sequential_job() {
    let engine = TestEngine::new();
    register_slow(&engine, "SLOW", 20);

    let view = engine
        .create(
            "SLOW",
            ProcessingMode::Sequential,
            numbered_items(10),
            JobConfigurationOverrides::default(),
        )
        .await;

    engine.controller.start_job(view.id).await.expect("start");
    let paused = engine.controller.pause_job(view.id).await.expect("pause");
    assert_eq!(paused.status, JobStatus::Paused);

    // The in-flight item may still settle; nothing new is dispatched.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let job = engine.controller.get_job(view.id).expect("job");
    assert_eq!(job.status, JobStatus::Paused);
    assert!(job.processed_items < 10);
    let settled = job.processed_items;
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(engine.controller.get_job(view.id).expect("job").processed_items, settled);

    engine.controller.resume_job(view.id).await.expect("resume");
    let job = engine.wait_for_status(view.id, JobStatus::Completed).await;
    assert_eq!(job.processed_items, 10);
    assert_eq!(job.successful_items, 10);
    assert!(job.items.iter().all(|item| item.attempts == 1));
}

#[tokio::test]
async fn test_cancelled_job_cannot_start() {
    let engine = TestEngine::new();
    let view = engine
        .create(
            types::CUSTOM,
            ProcessingMode::Sequential,
            numbered_items(3),
            JobConfigurationOverrides::default(),
        )
        .await;

    let cancelled = engine.controller.cancel_job(view.id).await.expect("cancel");
    assert_eq!(cancelled.status, JobStatus::Cancelled);

    let err = engine.controller.start_job(view.id).await.unwrap_err();
    assert!(err.is_conflict());
    let err = engine.controller.cancel_job(view.id).await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(
        engine.controller.get_job(view.id).expect("job").status,
        JobStatus::Cancelled
    );
}

#[tokio::test]
async fn test_running_job_cannot_be_deleted() {
    let engine = TestEngine::new();
    register_slow(&engine, "SLOW", 50);

    let view = engine
        .create(
            "SLOW",
            ProcessingMode::Sequential,
            numbered_items(20),
            JobConfigurationOverrides::default(),
        )
        .await;
    engine.controller.start_job(view.id).await.expect("start");

    let err = engine.controller.delete_job(view.id).await.unwrap_err();
    assert!(err.is_conflict());
    assert!(engine.controller.get_job(view.id).is_ok());

    engine.controller.cancel_job(view.id).await.expect("cancel");
    engine.controller.delete_job(view.id).await.expect("delete");
    assert!(engine.controller.get_job(view.id).unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_late_completion_after_cancel_is_not_counted() {
    let engine = TestEngine::new();
    register_slow(&engine, "SLOW", 150);

    let view = engine
        .create(
            "SLOW",
            ProcessingMode::Parallel,
            numbered_items(2),
            JobConfigurationOverrides::default(),
        )
        .await;
    engine.controller.start_job(view.id).await.expect("start");
    engine
        .wait_until(view.id, |job| {
            job.items
                .iter()
                .all(|item| item.status == ItemStatus::Processing)
        })
        .await;

    engine.controller.cancel_job(view.id).await.expect("cancel");
    engine
        .wait_until(view.id, |job| {
            job.items
                .iter()
                .all(|item| item.status == ItemStatus::Completed)
        })
        .await;

    let job = engine.controller.get_job(view.id).expect("job");
    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(job.processed_items, 0);
    assert_eq!(job.successful_items, 0);
    assert!(job.results.is_empty());
}

#[tokio::test]
async fn test_retry_resets_failed_items() {
    let engine = TestEngine::new();
    engine
        .controller
        .register_fn("REJECT", |_item: JobItem, _job: JobView| async move {
            Ok::<_, ProcessorError>(ProcessOutcome::failure("rejected"))
        });

    let view = engine
        .create(
            "REJECT",
            ProcessingMode::Parallel,
            numbered_items(3),
            JobConfigurationOverrides::default(),
        )
        .await;
    engine.controller.start_job(view.id).await.expect("start");

    let job = engine.wait_for_status(view.id, JobStatus::Failed).await;
    assert_eq!(job.failed_items, 3);
    assert_eq!(job.processed_items, 3);
    assert_eq!(job.errors.len(), 3);
    assert!(job.errors.iter().all(|e| e.retryable));

    let retried = engine.controller.retry_job(view.id).await.expect("retry");
    assert_eq!(retried.status, JobStatus::Pending);
    assert_eq!(retried.failed_items, 0);
    assert_eq!(retried.processed_items, 0);
    assert_eq!(retried.progress, 0);

    let job = engine.controller.get_job(view.id).expect("job");
    assert!(job.errors.is_empty());
    assert!(
        job.items
            .iter()
            .all(|item| item.status == ItemStatus::Pending && item.attempts == 0 && item.error.is_none())
    );

    // Retrying again is rejected: the job is no longer finished.
    assert!(engine.controller.retry_job(view.id).await.unwrap_err().is_conflict());

    engine
        .controller
        .register_fn("REJECT", |item: JobItem, _job: JobView| async move {
            Ok::<_, ProcessorError>(ProcessOutcome::Success(item.data))
        });
    engine.controller.start_job(view.id).await.expect("start");
    let job = engine.wait_for_status(view.id, JobStatus::Completed).await;
    assert_eq!(job.successful_items, 3);
    assert_eq!(job.failed_items, 0);
}

#[tokio::test]
async fn test_shutdown_parks_running_jobs() {
    let engine = TestEngine::new();
    register_slow(&engine, "SLOW", 30);

    let view = engine
        .create(
            "SLOW",
            ProcessingMode::Sequential,
            numbered_items(50),
            JobConfigurationOverrides::default(),
        )
        .await;
    engine.controller.start_job(view.id).await.expect("start");
    engine.wait_until(view.id, |job| job.processed_items > 0).await;

    engine.controller.shutdown().await;

    let job = engine.controller.get_job(view.id).expect("job");
    assert_eq!(job.status, JobStatus::Paused);
    assert!(job.processed_items < 50);
    assert_eq!(job.processed_items, job.successful_items + job.failed_items);
}
