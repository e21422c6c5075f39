//! Job template model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use batchflow_core::config::job::{JobConfiguration, JobConfigurationOverrides};
use batchflow_core::types::id::{TenantId, UserId};

use crate::job::model::CreateJob;
use crate::job::schedule::JobSchedule;
use crate::job::status::{JobPriority, ProcessingMode};

/// A named, versioned preset for creating jobs.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct JobTemplate {
    /// Stable slug, e.g. `"monthly-invoices"`.
    #[validate(length(min = 1, max = 100))]
    pub id: String,
    /// Display name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Incremented each time the template is re-registered.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Job type created from this template.
    #[validate(length(min = 1))]
    pub job_type: String,
    /// What the template is for.
    #[serde(default)]
    pub description: String,
    /// Processing strategy used unless the request overrides it.
    #[serde(default)]
    pub processing_mode: ProcessingMode,
    /// Configuration preset.
    #[validate(nested)]
    pub default_configuration: JobConfiguration,
    /// When this version was registered.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Request to create a job from a template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateJobFromTemplate {
    /// Job name; defaults to the template name.
    #[serde(default)]
    pub name: Option<String>,
    /// Localized job name.
    #[serde(default)]
    pub name_localized: Option<String>,
    /// Tenant scope.
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    /// Priority.
    #[serde(default)]
    pub priority: JobPriority,
    /// Overrides the template's processing strategy.
    #[serde(default)]
    pub processing_mode: Option<ProcessingMode>,
    /// Field-by-field overrides of the template configuration.
    #[serde(default)]
    pub configuration_overrides: JobConfigurationOverrides,
    /// Item payloads.
    #[serde(default)]
    pub items: Vec<Value>,
    /// Schedule metadata.
    #[serde(default)]
    pub schedule: Option<JobSchedule>,
    /// User who created the job.
    #[serde(default)]
    pub created_by: Option<UserId>,
}

impl JobTemplate {
    /// A first-version template.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        job_type: impl Into<String>,
        description: impl Into<String>,
        default_configuration: JobConfiguration,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: default_version(),
            job_type: job_type.into(),
            description: description.into(),
            processing_mode: ProcessingMode::default(),
            default_configuration,
            updated_at: Utc::now(),
        }
    }

    /// Set the default processing strategy.
    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.processing_mode = mode;
        self
    }

    /// Resolve a creation request against this template.
    ///
    /// Returns the job request plus the merged configuration; the merged
    /// configuration replaces the engine defaults for this job.
    pub fn instantiate(&self, request: CreateJobFromTemplate) -> (CreateJob, JobConfiguration) {
        let configuration = self
            .default_configuration
            .merged(&request.configuration_overrides);
        let create = CreateJob {
            name: request.name.unwrap_or_else(|| self.name.clone()),
            name_localized: request.name_localized,
            tenant_id: request.tenant_id,
            job_type: self.job_type.clone(),
            priority: request.priority,
            processing_mode: request.processing_mode.unwrap_or(self.processing_mode),
            configuration: request.configuration_overrides,
            items: request.items,
            schedule: request.schedule,
            created_by: request.created_by,
        };
        (create, configuration)
    }
}

fn default_version() -> u32 {
    1
}
