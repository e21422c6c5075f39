//! Integration tests for item execution: retries, timeouts, strategies, and aborts.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Value, json};

use batchflow_core::config::job::JobConfigurationOverrides;
use batchflow_core::types::pagination::PageRequest;
use batchflow_engine::{JobFilter, ProcessOutcome, ProcessorError};
use batchflow_entity::job::types;
use batchflow_entity::job::{ItemStatus, JobItem, JobStatus, JobView, ProcessingMode};
use batchflow_entity::template::CreateJobFromTemplate;

use helpers::{TestEngine, events_until, numbered_items};

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let engine = TestEngine::new();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    engine
        .controller
        .register_fn("FLAKY", move |item: JobItem, _job: JobView| {
            let counter = Arc::clone(&counter);
            async move {
                let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    return Err(ProcessorError::Transient(format!(
                        "downstream unavailable (attempt {})",
                        attempt
                    )));
                }
                Ok(ProcessOutcome::Success(item.data))
            }
        });

    let view = engine
        .create(
            "FLAKY",
            ProcessingMode::Sequential,
            vec![json!({"id": 1})],
            JobConfigurationOverrides {
                max_retries: Some(2),
                ..Default::default()
            },
        )
        .await;
    engine.controller.start_job(view.id).await.expect("start");

    let job = engine.wait_for_status(view.id, JobStatus::Completed).await;
    let item = &job.items[0];
    assert_eq!(item.status, ItemStatus::Completed);
    assert_eq!(item.attempts, 3);
    assert!(item.result.is_some());
    assert_eq!(job.successful_items, 1);
    assert_eq!(job.failed_items, 0);
    assert_eq!(job.processed_items, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let errors = engine.controller.get_job_errors(view.id).expect("errors");
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.retryable));
    assert_eq!(errors[1].attempt, 2);
}

#[tokio::test]
async fn test_attempts_never_exceed_limit() {
    let engine = TestEngine::new();
    engine
        .controller
        .register_fn("BROKEN", |_item: JobItem, _job: JobView| async move {
            Err::<ProcessOutcome, _>(ProcessorError::Transient("always down".to_string()))
        });

    let view = engine
        .create(
            "BROKEN",
            ProcessingMode::Parallel,
            numbered_items(4),
            JobConfigurationOverrides {
                max_retries: Some(1),
                ..Default::default()
            },
        )
        .await;
    engine.controller.start_job(view.id).await.expect("start");

    let job = engine.wait_for_status(view.id, JobStatus::Failed).await;
    assert_eq!(job.failed_items, 4);
    assert_eq!(job.processed_items, 4);
    for item in &job.items {
        assert_eq!(item.status, ItemStatus::Failed);
        assert_eq!(item.attempts, 2);
        assert!(item.error.is_some());
    }
    let exhausted = job.errors.iter().filter(|e| !e.retryable).count();
    assert_eq!(exhausted, 4);
}

#[tokio::test]
async fn test_timeout_counts_as_failure() {
    let engine = TestEngine::new();
    engine
        .controller
        .register_fn("STUCK", |_item: JobItem, _job: JobView| async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, ProcessorError>(ProcessOutcome::Success(Value::Null))
        });

    let view = engine
        .create(
            "STUCK",
            ProcessingMode::Sequential,
            numbered_items(1),
            JobConfigurationOverrides {
                timeout_ms: Some(30),
                max_retries: Some(0),
                ..Default::default()
            },
        )
        .await;
    engine.controller.start_job(view.id).await.expect("start");

    let job = engine.wait_for_status(view.id, JobStatus::Failed).await;
    let error = job.items[0].error.as_deref().expect("item error");
    assert!(error.contains("timed out"), "unexpected error: {}", error);
}

#[tokio::test]
async fn test_parallel_concurrency_is_bounded() {
    let engine = TestEngine::new();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (current, max_seen) = (Arc::clone(&in_flight), Arc::clone(&peak));
    engine
        .controller
        .register_fn("DELAYED", move |_item: JobItem, _job: JobView| {
            let current = Arc::clone(&current);
            let max_seen = Arc::clone(&max_seen);
            async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                current.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, ProcessorError>(ProcessOutcome::Success(Value::Null))
            }
        });

    let view = engine
        .create(
            "DELAYED",
            ProcessingMode::Parallel,
            numbered_items(10),
            JobConfigurationOverrides {
                concurrency: Some(3),
                ..Default::default()
            },
        )
        .await;
    engine.controller.start_job(view.id).await.expect("start");

    let max_processing = AtomicUsize::new(0);
    let job = engine
        .wait_until(view.id, |job| {
            let processing = job
                .items
                .iter()
                .filter(|item| item.status == ItemStatus::Processing)
                .count();
            max_processing.fetch_max(processing, Ordering::SeqCst);
            job.status == JobStatus::Completed
        })
        .await;

    assert_eq!(job.successful_items, 10);
    assert!(max_processing.load(Ordering::SeqCst) <= 3);
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(peak.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_chunked_job_reports_chunks() {
    let engine = TestEngine::new();
    let mut events = engine.controller.subscribe();

    let view = engine
        .create(
            types::CUSTOM,
            ProcessingMode::Chunked,
            numbered_items(7),
            JobConfigurationOverrides {
                chunk_size: Some(3),
                ..Default::default()
            },
        )
        .await;
    engine.controller.start_job(view.id).await.expect("start");

    let names = events_until(&mut events, view.id, "job.completed").await;
    let chunks = names
        .iter()
        .filter(|name| name.as_str() == "job.chunk.completed")
        .count();
    let items = names
        .iter()
        .filter(|name| name.as_str() == "item.processed")
        .count();
    assert_eq!(chunks, 3);
    assert_eq!(items, 7);
}

#[tokio::test]
async fn test_stop_on_error_aborts_job() {
    let engine = TestEngine::new();
    engine
        .controller
        .register_fn("FRAGILE", |item: JobItem, _job: JobView| async move {
            if item.index == 1 {
                return Err(ProcessorError::Transient("disk full".to_string()));
            }
            Ok(ProcessOutcome::Success(item.data))
        });

    let view = engine
        .create(
            "FRAGILE",
            ProcessingMode::Sequential,
            numbered_items(4),
            JobConfigurationOverrides {
                max_retries: Some(1),
                continue_on_error: Some(false),
                ..Default::default()
            },
        )
        .await;
    engine.controller.start_job(view.id).await.expect("start");

    let job = engine.wait_for_status(view.id, JobStatus::Failed).await;
    let statuses: Vec<ItemStatus> = job.items.iter().map(|item| item.status).collect();
    assert_eq!(
        statuses,
        vec![
            ItemStatus::Completed,
            ItemStatus::Failed,
            ItemStatus::Skipped,
            ItemStatus::Skipped
        ]
    );
    assert_eq!(job.items[1].attempts, 2);
    assert_eq!(job.processed_items, job.successful_items + job.failed_items);
    assert!(job.completed_at.is_some());

    let job_level = job.errors.last().expect("job-level error");
    assert!(job_level.is_job_level());
    assert!(job_level.message.contains("disk full"));

    // Retry re-queues the failed and the skipped items.
    let retried = engine.controller.retry_job(view.id).await.expect("retry");
    assert_eq!(retried.processed_items, 1);
    let pending = engine
        .controller
        .get_job_items(view.id, Some(ItemStatus::Pending))
        .expect("items");
    assert_eq!(pending.len(), 3);
}

#[tokio::test]
async fn test_mixed_outcomes_complete_with_failures() {
    let engine = TestEngine::new();
    let view = engine
        .create(
            types::EMAIL_CAMPAIGN,
            ProcessingMode::Parallel,
            vec![
                json!({"to": "ana@example.ro", "subject": "Offer"}),
                json!({"to": "not-an-address", "subject": "Offer"}),
                json!({"to": "dan@example.ro", "subject": "Offer"}),
            ],
            JobConfigurationOverrides {
                save_results: Some(false),
                ..Default::default()
            },
        )
        .await;
    engine.controller.start_job(view.id).await.expect("start");

    let job = engine.wait_for_status(view.id, JobStatus::Completed).await;
    assert_eq!(job.successful_items, 2);
    assert_eq!(job.failed_items, 1);
    assert!(job.results.is_empty());
    assert!(job.items[0].result.is_some());

    let summary = engine.controller.get_job_summary(view.id).expect("summary");
    assert_eq!(summary.progress, 100);
    assert!((summary.error_rate - 1.0 / 3.0).abs() < 1e-9);

    let stats = engine.controller.service_stats();
    assert_eq!(stats.total_items_processed, 3);
    assert_eq!(stats.running_jobs, 0);

    // Lifetime totals outlive the job.
    engine.controller.delete_job(view.id).await.expect("delete");
    let stats = engine.controller.service_stats();
    assert_eq!(stats.total_jobs, 0);
    assert_eq!(stats.total_items_processed, 3);
    assert_eq!(stats.successful_items, 2);
    assert_eq!(stats.failed_items, 1);
}

#[tokio::test]
async fn test_template_job_runs_to_completion() {
    let engine = TestEngine::new();
    let view = engine
        .controller
        .create_job_from_template(
            "monthly-invoices",
            CreateJobFromTemplate {
                name: Some("October invoices".to_string()),
                items: vec![
                    json!({"customer_id": "C-1", "lines": [{"quantity": 1, "unit_price": 10.0}]}),
                    json!({"customer_id": "C-2", "lines": [{"quantity": 3, "unit_price": 5.0}]}),
                ],
                ..Default::default()
            },
        )
        .await
        .expect("create");
    assert_eq!(view.processing_mode, ProcessingMode::Parallel);
    assert_eq!(view.configuration.concurrency, 10);

    engine.controller.start_job(view.id).await.expect("start");
    engine.wait_for_status(view.id, JobStatus::Completed).await;

    let results = engine.controller.get_job_results(view.id).expect("results");
    let mut numbers: Vec<String> = results
        .iter()
        .map(|r| r.result["invoice_number"].as_str().unwrap_or_default().to_string())
        .collect();
    numbers.sort();
    assert_eq!(numbers, vec!["INV-000001", "INV-000002"]);

    let filter = JobFilter {
        status: Some(JobStatus::Completed),
        job_type: Some(types::INVOICE_GENERATION.to_string()),
        ..Default::default()
    };
    let page = engine.controller.list_jobs(&filter, &PageRequest::default());
    assert_eq!(page.total_items, 1);
    assert_eq!(page.items[0].name, "October invoices");
}

