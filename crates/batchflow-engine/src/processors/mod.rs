//! Built-in processor implementations.
//!
//! Each built-in job type ships with a default processor that validates the
//! payload its type needs. Business modules replace these at runtime through
//! [`ProcessorRegistry::register`](crate::processor::ProcessorRegistry::register).

pub mod custom;
pub mod data;
pub mod efactura;
pub mod email;
pub mod invoice;
pub mod report;

use std::sync::Arc;

use serde_json::Value;
use tracing;

use batchflow_entity::job::JobItem;
use batchflow_entity::job::types;

use crate::processor::{ProcessOutcome, ProcessorRegistry};

pub use custom::CustomProcessor;
pub use data::{DataExportProcessor, DataImportProcessor};
pub use efactura::{EfacturaGateway, EfacturaProcessor};
pub use email::EmailCampaignProcessor;
pub use invoice::InvoiceProcessor;
pub use report::ReportExportProcessor;

/// Register the default processor for every built-in job type
pub fn register_builtin(registry: &ProcessorRegistry) {
    registry.register(types::INVOICE_GENERATION, Arc::new(InvoiceProcessor::new()));
    registry.register(types::EFACTURA_SUBMISSION, Arc::new(EfacturaProcessor::new(None)));
    registry.register(types::REPORT_EXPORT, Arc::new(ReportExportProcessor::new()));
    registry.register(types::DATA_IMPORT, Arc::new(DataImportProcessor::new()));
    registry.register(types::DATA_EXPORT, Arc::new(DataExportProcessor::new()));
    registry.register(types::EMAIL_CAMPAIGN, Arc::new(EmailCampaignProcessor::new()));
    registry.register(types::CUSTOM, Arc::new(CustomProcessor));

    tracing::info!("All built-in processors registered");
}

/// Read a required, non-empty string field from an item payload.
pub(crate) fn required_str<'a>(item: &'a JobItem, key: &str) -> Result<&'a str, ProcessOutcome> {
    item.data
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| {
            ProcessOutcome::failure(format!(
                "Missing '{}' in payload of item {}",
                key, item.index
            ))
        })
}
