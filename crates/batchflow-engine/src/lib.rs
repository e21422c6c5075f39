//! Batch job execution engine for Batchflow.
//!
//! This crate provides:
//! - A processor registry that maps job types to pluggable processors
//! - An item executor with timeouts, retries, and panic isolation
//! - Sequential, parallel, and chunked execution strategies
//! - A job controller that owns job records and drives their lifecycle
//! - A template catalog, derived statistics, and a lifecycle event bus
//! - Built-in processors for the standard job types

pub mod controller;
pub mod events;
pub mod executor;
pub mod processor;
pub mod processors;
pub mod stats;
pub mod store;
pub mod strategy;
pub mod template;

pub use controller::{JobController, JobFilter};
pub use events::EventBus;
pub use processor::{FnProcessor, ProcessOutcome, Processor, ProcessorError, ProcessorRegistry};
pub use stats::{JobSummary, QueueStats, ServiceStats};
pub use template::TemplateCatalog;
