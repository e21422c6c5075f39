//! # batchflow-entity
//!
//! Domain entity models for Batchflow: jobs, their items, execution
//! records, schedules, and job templates.

pub mod job;
pub mod template;
