//! Job template entities.

pub mod model;

pub use model::{CreateJobFromTemplate, JobTemplate};
