//! Read-only statistics derived from job records on demand, plus running
//! item outcome counters that outlive the jobs they were recorded for.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use batchflow_core::types::id::JobId;
use batchflow_entity::job::{ItemStatus, Job, JobStatus};

/// Per-job summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    /// Job identifier
    pub job_id: JobId,
    /// Current status
    pub status: JobStatus,
    /// Percentage complete
    pub progress: u8,
    /// Number of items
    pub total_items: usize,
    /// Items with a final outcome
    pub processed_items: usize,
    /// Successful items
    pub successful_items: usize,
    /// Permanently failed items
    pub failed_items: usize,
    /// Items still waiting to run
    pub pending_items: usize,
    /// Items skipped by a fatal abort
    pub skipped_items: usize,
    /// Mean duration of completed items in milliseconds
    pub average_duration_ms: Option<f64>,
    /// `failed / processed`, 0 when nothing was processed
    pub error_rate: f64,
    /// Wall time since the job started, up to completion or now
    pub elapsed_ms: Option<i64>,
    /// Processed items per second over `elapsed_ms`
    pub throughput_per_second: Option<f64>,
}

impl JobSummary {
    /// Summarize `job` as of `now`
    pub fn from_job(job: &Job, now: DateTime<Utc>) -> Self {
        let mut pending_items = 0;
        let mut skipped_items = 0;
        let mut completed_count = 0u64;
        let mut completed_duration = 0u64;

        for item in &job.items {
            match item.status {
                ItemStatus::Pending => pending_items += 1,
                ItemStatus::Skipped => skipped_items += 1,
                ItemStatus::Completed => {
                    completed_count += 1;
                    completed_duration += item.duration_ms.unwrap_or(0);
                }
                ItemStatus::Processing | ItemStatus::Failed => {}
            }
        }

        let average_duration_ms =
            (completed_count > 0).then(|| completed_duration as f64 / completed_count as f64);

        let elapsed_ms = job.started_at.map(|started| {
            let until = job.completed_at.unwrap_or(now);
            (until - started).num_milliseconds().max(0)
        });

        let throughput_per_second = elapsed_ms
            .filter(|ms| *ms > 0)
            .map(|ms| job.processed_items as f64 / (ms as f64 / 1000.0));

        Self {
            job_id: job.id,
            status: job.status,
            progress: job.progress,
            total_items: job.total_items,
            processed_items: job.processed_items,
            successful_items: job.successful_items,
            failed_items: job.failed_items,
            pending_items,
            skipped_items,
            average_duration_ms,
            error_rate: ratio(job.failed_items, job.processed_items),
            elapsed_ms,
            throughput_per_second,
        }
    }
}

/// Job counts by status across the engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Jobs waiting to be started
    pub pending: usize,
    /// Jobs queued
    pub queued: usize,
    /// Jobs currently running
    pub running: usize,
    /// Paused jobs
    pub paused: usize,
    /// Completed jobs
    pub completed: usize,
    /// Failed jobs
    pub failed: usize,
    /// Cancelled jobs
    pub cancelled: usize,
    /// All jobs
    pub total: usize,
}

impl QueueStats {
    /// Count one job in `status`
    pub fn record(&mut self, status: JobStatus) {
        match status {
            JobStatus::Pending => self.pending += 1,
            JobStatus::Queued => self.queued += 1,
            JobStatus::Running => self.running += 1,
            JobStatus::Paused => self.paused += 1,
            JobStatus::Completed => self.completed += 1,
            JobStatus::Failed => self.failed += 1,
            JobStatus::Cancelled => self.cancelled += 1,
        }
        self.total += 1;
    }
}

/// Engine-wide aggregates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Jobs held by the engine
    pub total_jobs: usize,
    /// Jobs in `RUNNING`
    pub running_jobs: usize,
    /// Final item outcomes ever recorded, including jobs since deleted and
    /// items re-run after a retry
    pub total_items_processed: usize,
    /// Successful outcomes ever recorded
    pub successful_items: usize,
    /// Permanent failures ever recorded
    pub failed_items: usize,
    /// `successful / processed`, 0 when nothing was processed
    pub success_rate: f64,
    /// Number of registered processor types
    pub registered_processors: usize,
    /// Registered processor types, sorted
    pub processor_types: Vec<String>,
    /// Number of registered templates
    pub templates: usize,
}

impl ServiceStats {
    /// Count one job held by the engine
    pub fn record(&mut self, job: &Job) {
        self.total_jobs += 1;
        if job.status == JobStatus::Running {
            self.running_jobs += 1;
        }
    }
}

/// Running counters of final item outcomes.
#[derive(Debug, Default)]
pub struct ItemTotals {
    successful: AtomicUsize,
    failed: AtomicUsize,
}

impl ItemTotals {
    /// Count one final item outcome
    pub fn record(&self, success: bool) {
        let counter = if success {
            &self.successful
        } else {
            &self.failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the counters into `stats`
    pub fn fill(&self, stats: &mut ServiceStats) {
        stats.successful_items = self.successful.load(Ordering::Relaxed);
        stats.failed_items = self.failed.load(Ordering::Relaxed);
        stats.total_items_processed = stats.successful_items + stats.failed_items;
        stats.success_rate = ratio(stats.successful_items, stats.total_items_processed);
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchflow_entity::job::{CreateJob, JobConfiguration};
    use serde_json::json;

    fn job() -> Job {
        let mut job = Job::new(
            CreateJob::new("t", "CUSTOM", vec![json!(1), json!(2), json!(3), json!(4)]),
            JobConfiguration::default(),
        );
        job.items[0].complete(json!(null), 100);
        job.items[1].complete(json!(null), 300);
        job.items[2].fail("bad", 50);
        job.successful_items = 2;
        job.failed_items = 1;
        job.processed_items = 3;
        job.recompute_progress();
        job
    }

    #[test]
    fn test_job_summary() {
        let mut job = job();
        let now = Utc::now();
        job.started_at = Some(now - chrono::Duration::seconds(3));

        let summary = JobSummary::from_job(&job, now);
        assert_eq!(summary.progress, 75);
        assert_eq!(summary.pending_items, 1);
        assert_eq!(summary.average_duration_ms, Some(200.0));
        assert!((summary.error_rate - 1.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(summary.elapsed_ms, Some(3000));
        assert_eq!(summary.throughput_per_second, Some(1.0));
    }

    #[test]
    fn test_summary_of_unstarted_job() {
        let job = Job::new(
            CreateJob::new("t", "CUSTOM", vec![json!(1)]),
            JobConfiguration::default(),
        );
        let summary = JobSummary::from_job(&job, Utc::now());
        assert_eq!(summary.error_rate, 0.0);
        assert!(summary.average_duration_ms.is_none());
        assert!(summary.elapsed_ms.is_none());
    }

    #[test]
    fn test_service_stats_rates() {
        let mut stats = ServiceStats::default();
        stats.record(&job());
        stats.record(&job());

        let totals = ItemTotals::default();
        for success in [true, true, false, true, true, false] {
            totals.record(success);
        }
        totals.fill(&mut stats);

        assert_eq!(stats.total_jobs, 2);
        assert_eq!(stats.running_jobs, 0);
        assert_eq!(stats.total_items_processed, 6);
        assert_eq!(stats.failed_items, 2);
        assert!((stats.success_rate - 4.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_queue_stats_counts() {
        let mut stats = QueueStats::default();
        stats.record(JobStatus::Running);
        stats.record(JobStatus::Running);
        stats.record(JobStatus::Cancelled);
        assert_eq!(stats.running, 2);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.total, 3);
    }
}
