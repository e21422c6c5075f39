//! Email campaign processor.

use async_trait::async_trait;
use serde_json::json;
use tracing;

use batchflow_entity::job::{JobItem, JobView};

use super::required_str;
use crate::processor::{ProcessOutcome, Processor, ProcessorError};

/// Prepares one campaign message per recipient.
///
/// Payload: `to`, `subject`, optional `template`.
#[derive(Debug, Default)]
pub struct EmailCampaignProcessor;

impl EmailCampaignProcessor {
    /// Create a new email campaign processor
    pub fn new() -> Self {
        Self
    }
}

fn is_plausible_address(address: &str) -> bool {
    match address.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

#[async_trait]
impl Processor for EmailCampaignProcessor {
    async fn process(
        &self,
        item: &JobItem,
        job: &JobView,
    ) -> Result<ProcessOutcome, ProcessorError> {
        let to = match required_str(item, "to") {
            Ok(to) => to,
            Err(rejection) => return Ok(rejection),
        };
        if !is_plausible_address(to) {
            return Ok(ProcessOutcome::failure(format!("Invalid recipient '{}'", to)));
        }
        let subject = match required_str(item, "subject") {
            Ok(subject) => subject,
            Err(rejection) => return Ok(rejection),
        };

        let message_id = format!("{}.{}@batchflow", job.id, item.index);
        tracing::debug!(job_id = %job.id, "Queued campaign message {}", message_id);

        Ok(ProcessOutcome::Success(json!({
            "to": to,
            "subject": subject,
            "message_id": message_id,
        })))
    }
}
