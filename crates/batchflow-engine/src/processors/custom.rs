//! Default processor for caller-defined jobs.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use batchflow_entity::job::{JobItem, JobView};

use crate::processor::{ProcessOutcome, Processor, ProcessorError};

/// Accepts any payload and echoes it back.
///
/// Stands in until a business module registers its own `CUSTOM` processor.
#[derive(Debug, Default)]
pub struct CustomProcessor;

#[async_trait]
impl Processor for CustomProcessor {
    async fn process(
        &self,
        item: &JobItem,
        _job: &JobView,
    ) -> Result<ProcessOutcome, ProcessorError> {
        Ok(ProcessOutcome::Success(json!({
            "index": item.index,
            "echo": item.data,
            "processed_at": Utc::now().to_rfc3339(),
        })))
    }
}
