//! Template catalog — named configuration presets for job creation.

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing;
use validator::Validate;

use batchflow_core::error::AppError;
use batchflow_core::result::AppResult;
use batchflow_entity::job::types;
use batchflow_entity::job::{JobConfiguration, ProcessingMode};
use batchflow_entity::template::JobTemplate;

/// Registered templates keyed by slug.
#[derive(Debug, Default)]
pub struct TemplateCatalog {
    /// Templates by ID
    templates: DashMap<String, JobTemplate>,
}

impl TemplateCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            templates: DashMap::new(),
        }
    }

    /// Register a template. Re-registering an ID replaces it with the next version.
    pub fn register(&self, mut template: JobTemplate) -> AppResult<JobTemplate> {
        template.validate()?;
        template.updated_at = Utc::now();

        let registered = match self.templates.entry(template.id.clone()) {
            Entry::Occupied(mut entry) => {
                template.version = entry.get().version + 1;
                entry.insert(template.clone());
                template
            }
            Entry::Vacant(entry) => {
                entry.insert(template.clone());
                template
            }
        };

        tracing::info!(
            "Registered template '{}' v{} for job type '{}'",
            registered.id,
            registered.version,
            registered.job_type
        );
        Ok(registered)
    }

    /// Look up a template
    pub fn get(&self, id: &str) -> AppResult<JobTemplate> {
        self.templates
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::not_found(format!("Template '{}' not found", id)))
    }

    /// All templates, sorted by ID
    pub fn list(&self) -> Vec<JobTemplate> {
        let mut templates: Vec<JobTemplate> = self
            .templates
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        templates
    }

    /// Number of templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Register every built-in template
    pub fn register_builtin(&self) -> AppResult<()> {
        for template in builtin_templates() {
            self.register(template)?;
        }
        tracing::info!("All built-in templates registered");
        Ok(())
    }
}

/// Presets shipped with the engine for the built-in job types.
pub fn builtin_templates() -> Vec<JobTemplate> {
    vec![
        // Billing records are independent of each other
        JobTemplate::new(
            "monthly-invoices",
            "Monthly invoices",
            types::INVOICE_GENERATION,
            "Generate one invoice per billing record",
            JobConfiguration {
                concurrency: 10,
                ..Default::default()
            },
        )
        .with_mode(ProcessingMode::Parallel),
        // ANAF throttles submissions
        JobTemplate::new(
            "efactura-batch",
            "e-Factura submission",
            types::EFACTURA_SUBMISSION,
            "Submit issued invoices to ANAF e-Factura",
            JobConfiguration {
                max_retries: 5,
                retry_delay_ms: 5_000,
                timeout_ms: 60_000,
                concurrency: 2,
                notify_on_complete: true,
                ..Default::default()
            },
        )
        .with_mode(ProcessingMode::Parallel),
        // Sections render in order
        JobTemplate::new(
            "report-export",
            "Report export",
            types::REPORT_EXPORT,
            "Render report sections in order",
            JobConfiguration {
                timeout_ms: 120_000,
                continue_on_error: false,
                notify_on_complete: true,
                ..Default::default()
            },
        ),
        // Bulk import
        JobTemplate::new(
            "bulk-import",
            "Bulk data import",
            types::DATA_IMPORT,
            "Import records in chunks",
            JobConfiguration {
                chunk_size: 500,
                max_retries: 1,
                ..Default::default()
            },
        )
        .with_mode(ProcessingMode::Chunked),
        // Bulk export
        JobTemplate::new(
            "bulk-export",
            "Bulk data export",
            types::DATA_EXPORT,
            "Export records in chunks",
            JobConfiguration {
                chunk_size: 500,
                save_results: false,
                ..Default::default()
            },
        )
        .with_mode(ProcessingMode::Chunked),
        // Email campaign
        JobTemplate::new(
            "email-campaign",
            "Email campaign",
            types::EMAIL_CAMPAIGN,
            "Send one message per recipient",
            JobConfiguration {
                concurrency: 20,
                max_retries: 2,
                save_results: false,
                cleanup_after_days: 7,
                ..Default::default()
            },
        )
        .with_mode(ProcessingMode::Parallel),
    ]
}
