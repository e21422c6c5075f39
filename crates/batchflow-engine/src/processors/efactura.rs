//! ANAF e-Factura submission processor.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing;

use batchflow_core::error::AppError;
use batchflow_entity::job::{JobItem, JobView};

use super::required_str;
use crate::processor::{ProcessOutcome, Processor, ProcessorError};

/// Upload client for the e-Factura service. Decouples the engine from the ANAF API client.
#[async_trait]
pub trait EfacturaGateway: Send + Sync + std::fmt::Debug {
    /// Upload a signed UBL document; returns the upload index assigned by ANAF.
    async fn upload(&self, seller_cif: &str, invoice_id: &str, xml: &str)
    -> Result<String, AppError>;
}

/// Submits one issued invoice per item.
///
/// Payload: `invoice_id`, `seller_cif`, `xml`.
#[derive(Debug)]
pub struct EfacturaProcessor {
    /// Upload client, absent when e-Factura is not configured
    gateway: Option<Arc<dyn EfacturaGateway>>,
}

impl EfacturaProcessor {
    /// Create a new e-Factura processor
    pub fn new(gateway: Option<Arc<dyn EfacturaGateway>>) -> Self {
        Self { gateway }
    }
}

/// Romanian fiscal code: optional `RO` prefix followed by 2 to 10 digits.
fn is_valid_cif(cif: &str) -> bool {
    let digits = cif.strip_prefix("RO").unwrap_or(cif);
    (2..=10).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

fn submission_fields(item: &JobItem) -> Result<(&str, &str, &str), ProcessOutcome> {
    Ok((
        required_str(item, "invoice_id")?,
        required_str(item, "seller_cif")?,
        required_str(item, "xml")?,
    ))
}

#[async_trait]
impl Processor for EfacturaProcessor {
    async fn process(
        &self,
        item: &JobItem,
        job: &JobView,
    ) -> Result<ProcessOutcome, ProcessorError> {
        let (invoice_id, seller_cif, xml) = match submission_fields(item) {
            Ok(fields) => fields,
            Err(rejection) => return Ok(rejection),
        };

        if !is_valid_cif(seller_cif) {
            return Ok(ProcessOutcome::failure(format!(
                "Invalid seller CIF '{}'",
                seller_cif
            )));
        }

        let Some(gateway) = self.gateway.as_ref() else {
            return Ok(ProcessOutcome::failure("e-Factura gateway not configured"));
        };

        let upload_index = gateway
            .upload(seller_cif, invoice_id, xml)
            .await
            .map_err(|e| ProcessorError::Transient(format!("e-Factura upload failed: {}", e)))?;

        tracing::info!(
            job_id = %job.id,
            "Submitted invoice {} to e-Factura, upload index {}",
            invoice_id,
            upload_index
        );

        Ok(ProcessOutcome::Success(json!({
            "invoice_id": invoice_id,
            "upload_index": upload_index,
            "status": "submitted",
        })))
    }
}
