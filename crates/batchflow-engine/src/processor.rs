//! Processor contract and the registry that maps job types to processors.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tracing;

use batchflow_core::error::AppError;
use batchflow_entity::job::{JobItem, JobView};

/// Outcome a processor reports for one item.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// The item was processed; carries the result payload.
    Success(Value),
    /// The processor rejected the item (e.g. invalid input). Not retried.
    Failure(String),
}

impl ProcessOutcome {
    /// Convenience constructor for a business failure.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }
}

/// Unexpected processor fault. Retried up to the job's `max_retries`.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// Transient failure, e.g. an unreachable downstream service.
    #[error("Transient processor failure: {0}")]
    Transient(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

/// Executes one item of a given job type.
///
/// Processors get read-only access to the item and its job and must not
/// touch engine state; they report an outcome instead.
#[async_trait]
pub trait Processor: Send + Sync + fmt::Debug {
    /// Process a single item.
    async fn process(&self, item: &JobItem, job: &JobView)
    -> Result<ProcessOutcome, ProcessorError>;
}

/// Adapter that turns an async closure into a [`Processor`].
pub struct FnProcessor<F> {
    func: F,
}

impl<F> FnProcessor<F> {
    /// Wrap `func`.
    pub fn new<Fut>(func: F) -> Self
    where
        F: Fn(JobItem, JobView) -> Fut + Send + Sync,
        Fut: Future<Output = Result<ProcessOutcome, ProcessorError>> + Send,
    {
        Self { func }
    }
}

impl<F> fmt::Debug for FnProcessor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProcessor").finish()
    }
}

#[async_trait]
impl<F, Fut> Processor for FnProcessor<F>
where
    F: Fn(JobItem, JobView) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ProcessOutcome, ProcessorError>> + Send,
{
    async fn process(
        &self,
        item: &JobItem,
        job: &JobView,
    ) -> Result<ProcessOutcome, ProcessorError> {
        (self.func)(item.clone(), job.clone()).await
    }
}

/// Maps job types to processors. Registrations may change at runtime.
#[derive(Debug, Default)]
pub struct ProcessorRegistry {
    /// Registered processors by job type
    processors: DashMap<String, Arc<dyn Processor>>,
}

impl ProcessorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            processors: DashMap::new(),
        }
    }

    /// Register a processor, replacing any existing one for the type
    pub fn register(&self, job_type: impl Into<String>, processor: Arc<dyn Processor>) {
        let job_type = job_type.into();
        if self
            .processors
            .insert(job_type.clone(), processor)
            .is_some()
        {
            tracing::info!("Replaced processor for job type '{}'", job_type);
        } else {
            tracing::info!("Registered processor for job type '{}'", job_type);
        }
    }

    /// Register an async closure as the processor for a type
    pub fn register_fn<F, Fut>(&self, job_type: impl Into<String>, func: F)
    where
        F: Fn(JobItem, JobView) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ProcessOutcome, ProcessorError>> + Send + 'static,
    {
        self.register(job_type, Arc::new(FnProcessor::new(func)));
    }

    /// Look up the processor for a job type
    pub fn get(&self, job_type: &str) -> Option<Arc<dyn Processor>> {
        self.processors
            .get(job_type)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Check if a processor is registered for a job type
    pub fn has(&self, job_type: &str) -> bool {
        self.processors.contains_key(job_type)
    }

    /// Get the list of registered job types, sorted
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .processors
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        types.sort();
        types
    }

    /// Number of registered job types
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Whether no processors are registered
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}
