//! Batch job domain entities.

pub mod item;
pub mod model;
pub mod record;
pub mod schedule;
pub mod status;
pub mod types;

pub use batchflow_core::config::job::{JobConfiguration, JobConfigurationOverrides};
pub use item::{ItemRef, JobItem};
pub use model::{CreateJob, Job, JobView};
pub use record::{ErrorRecord, ResultRecord};
pub use schedule::{JobSchedule, ScheduleType};
pub use status::{ItemStatus, JobPriority, JobStatus, ProcessingMode};
