//! Schedule descriptor stored on a job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a schedule fires once or repeatedly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleType {
    /// Run a single time.
    Once,
    /// Run repeatedly on the cron expression.
    Recurring,
}

/// Schedule metadata. The engine records runs but does not drive a clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSchedule {
    /// Schedule kind.
    pub schedule_type: ScheduleType,
    /// Time of the (next) planned run.
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Cron expression for recurring schedules.
    #[serde(default)]
    pub cron_expression: Option<String>,
    /// Number of completed runs.
    #[serde(default)]
    pub run_count: u32,
    /// When the last run finished.
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
}

impl JobSchedule {
    /// A one-off schedule at `at`.
    pub fn once(at: DateTime<Utc>) -> Self {
        Self {
            schedule_type: ScheduleType::Once,
            scheduled_at: Some(at),
            cron_expression: None,
            run_count: 0,
            last_run_at: None,
        }
    }

    /// A recurring schedule on `cron_expression`.
    pub fn recurring(cron_expression: impl Into<String>) -> Self {
        Self {
            schedule_type: ScheduleType::Recurring,
            scheduled_at: None,
            cron_expression: Some(cron_expression.into()),
            run_count: 0,
            last_run_at: None,
        }
    }

    /// Record a finished run.
    pub fn record_run(&mut self, at: DateTime<Utc>) {
        self.run_count += 1;
        self.last_run_at = Some(at);
    }
}
