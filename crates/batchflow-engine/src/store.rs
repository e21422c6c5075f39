//! In-memory job store owned by the controller.
//!
//! Every mutation runs under the map entry's lock, so counter updates for
//! one job are serialized even when items of a batch finish concurrently.

use dashmap::DashMap;

use batchflow_core::types::id::JobId;
use batchflow_entity::job::{Job, JobStatus, JobView};

/// Jobs and their items, keyed by job ID.
#[derive(Debug, Default)]
pub struct JobStore {
    /// Job records
    jobs: DashMap<JobId, Job>,
}

impl JobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
        }
    }

    /// Insert a new job
    pub fn insert(&self, job: Job) {
        self.jobs.insert(job.id, job);
    }

    /// Clone a full job record
    pub fn get(&self, id: JobId) -> Option<Job> {
        self.jobs.get(&id).map(|job| job.value().clone())
    }

    /// Read from a job without cloning it
    pub fn read<R>(&self, id: JobId, f: impl FnOnce(&Job) -> R) -> Option<R> {
        self.jobs.get(&id).map(|job| f(job.value()))
    }

    /// Mutate a job atomically. Returns `None` if the job does not exist.
    pub fn update<R>(&self, id: JobId, f: impl FnOnce(&mut Job) -> R) -> Option<R> {
        self.jobs.get_mut(&id).map(|mut job| f(job.value_mut()))
    }

    /// Header view of a job
    pub fn view(&self, id: JobId) -> Option<JobView> {
        self.read(id, Job::view)
    }

    /// Current status of a job
    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.read(id, |job| job.status)
    }

    /// Remove a job if `predicate` holds for it
    pub fn remove_if(&self, id: JobId, predicate: impl FnOnce(&Job) -> bool) -> Option<Job> {
        self.jobs
            .remove_if(&id, |_, job| predicate(job))
            .map(|(_, job)| job)
    }

    /// Apply `f` to every job
    pub fn for_each(&self, mut f: impl FnMut(&Job)) {
        for entry in self.jobs.iter() {
            f(entry.value());
        }
    }

    /// IDs of all jobs matching `predicate`
    pub fn ids_where(&self, predicate: impl Fn(&Job) -> bool) -> Vec<JobId> {
        self.jobs
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| *entry.key())
            .collect()
    }

    /// Number of stored jobs
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
