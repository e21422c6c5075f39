//! Data import and export processors.

use async_trait::async_trait;
use serde_json::{Value, json};

use batchflow_entity::job::{JobItem, JobView};

use super::required_str;
use crate::processor::{ProcessOutcome, Processor, ProcessorError};

/// Validates one imported record per item.
///
/// Payload: `entity`, `record` (object), optional `required: [field, ...]`.
#[derive(Debug, Default)]
pub struct DataImportProcessor;

impl DataImportProcessor {
    /// Create a new data import processor
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Processor for DataImportProcessor {
    async fn process(
        &self,
        item: &JobItem,
        _job: &JobView,
    ) -> Result<ProcessOutcome, ProcessorError> {
        let entity = match required_str(item, "entity") {
            Ok(entity) => entity,
            Err(rejection) => return Ok(rejection),
        };
        let Some(record) = item.data.get("record").and_then(Value::as_object) else {
            return Ok(ProcessOutcome::failure(format!(
                "Item {} has no record object",
                item.index
            )));
        };

        let missing: Vec<&str> = item
            .data
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|field| record.get(*field).is_none_or(Value::is_null))
                    .collect()
            })
            .unwrap_or_default();

        if !missing.is_empty() {
            return Ok(ProcessOutcome::failure(format!(
                "Record is missing required fields: {}",
                missing.join(", ")
            )));
        }

        Ok(ProcessOutcome::Success(json!({
            "entity": entity,
            "fields": record.len(),
            "imported": true,
        })))
    }
}

/// Exports one record per item to a destination.
///
/// Payload: `entity`, `id`, optional `destination` (defaults to `default`).
#[derive(Debug, Default)]
pub struct DataExportProcessor;

impl DataExportProcessor {
    /// Create a new data export processor
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Processor for DataExportProcessor {
    async fn process(
        &self,
        item: &JobItem,
        _job: &JobView,
    ) -> Result<ProcessOutcome, ProcessorError> {
        let entity = match required_str(item, "entity") {
            Ok(entity) => entity,
            Err(rejection) => return Ok(rejection),
        };
        let Some(id) = item.data.get("id").filter(|id| !id.is_null()) else {
            return Ok(ProcessOutcome::failure(format!(
                "Missing 'id' in payload of item {}",
                item.index
            )));
        };
        let destination = item
            .data
            .get("destination")
            .and_then(Value::as_str)
            .unwrap_or("default");

        Ok(ProcessOutcome::Success(json!({
            "entity": entity,
            "id": id,
            "destination": destination,
            "exported": true,
        })))
    }
}
