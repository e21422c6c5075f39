//! Job engine configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::job::JobConfiguration;
use crate::error::AppError;

/// Batch job engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Configuration applied to every new job before request overrides.
    #[serde(default)]
    pub defaults: JobConfiguration,
    /// Capacity of the lifecycle event broadcast channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer_size: usize,
    /// Seconds to wait for running jobs to stop during shutdown.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
    /// Interval in seconds between retention cleanup sweeps.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
    /// Whether to register the built-in processor for each built-in job type.
    #[serde(default = "default_true")]
    pub register_builtin_processors: bool,
    /// Whether to seed the template catalog with the built-in templates.
    #[serde(default = "default_true")]
    pub register_builtin_templates: bool,
}

impl EngineConfig {
    /// Validate the engine-wide job defaults.
    pub fn validate(&self) -> Result<(), AppError> {
        self.defaults.validate()?;
        if self.event_buffer_size == 0 {
            return Err(AppError::configuration(
                "engine.event_buffer_size must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            defaults: JobConfiguration::default(),
            event_buffer_size: default_event_buffer(),
            shutdown_grace_seconds: default_shutdown_grace(),
            cleanup_interval_seconds: default_cleanup_interval(),
            register_builtin_processors: true,
            register_builtin_templates: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_event_buffer() -> usize {
    1024
}

fn default_shutdown_grace() -> u64 {
    30
}

fn default_cleanup_interval() -> u64 {
    3600
}
