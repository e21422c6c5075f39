//! Invoice generation processor.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing;

use batchflow_entity::job::{JobItem, JobView};

use super::required_str;
use crate::processor::{ProcessOutcome, Processor, ProcessorError};

/// VAT rate applied when a line does not carry its own.
const DEFAULT_VAT_RATE: f64 = 0.19;
/// Invoice series used when the payload does not name one.
const DEFAULT_SERIES: &str = "INV";

/// Builds one invoice per billing record.
///
/// Payload: `customer_id`, `lines: [{ description, quantity, unit_price, vat_rate? }]`,
/// optional `series`.
#[derive(Debug, Default)]
pub struct InvoiceProcessor;

impl InvoiceProcessor {
    /// Create a new invoice processor
    pub fn new() -> Self {
        Self
    }

    fn build(&self, item: &JobItem, job: &JobView) -> Result<Value, ProcessOutcome> {
        let customer_id = required_str(item, "customer_id")?;
        let series = item
            .data
            .get("series")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SERIES);

        let lines = item
            .data
            .get("lines")
            .and_then(Value::as_array)
            .filter(|lines| !lines.is_empty())
            .ok_or_else(|| ProcessOutcome::failure("Invoice has no lines"))?;

        let mut net = 0.0;
        let mut vat = 0.0;
        for (n, line) in lines.iter().enumerate() {
            let quantity = line.get("quantity").and_then(Value::as_f64);
            let unit_price = line.get("unit_price").and_then(Value::as_f64);
            let (Some(quantity), Some(unit_price)) = (quantity, unit_price) else {
                return Err(ProcessOutcome::failure(format!(
                    "Line {} needs numeric quantity and unit_price",
                    n + 1
                )));
            };
            if quantity <= 0.0 || unit_price < 0.0 {
                return Err(ProcessOutcome::failure(format!(
                    "Line {} has invalid amounts",
                    n + 1
                )));
            }
            let rate = line
                .get("vat_rate")
                .and_then(Value::as_f64)
                .unwrap_or(DEFAULT_VAT_RATE);
            let line_net = quantity * unit_price;
            net += line_net;
            vat += line_net * rate;
        }

        let net = round_cents(net);
        let vat = round_cents(vat);
        let invoice_number = format!("{}-{:06}", series, item.index + 1);

        tracing::debug!(
            job_id = %job.id,
            "Generated invoice {} for customer {}",
            invoice_number,
            customer_id
        );

        Ok(json!({
            "invoice_number": invoice_number,
            "customer_id": customer_id,
            "line_count": lines.len(),
            "net": net,
            "vat": vat,
            "total": round_cents(net + vat),
            "issued_at": Utc::now().to_rfc3339(),
        }))
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[async_trait]
impl Processor for InvoiceProcessor {
    async fn process(
        &self,
        item: &JobItem,
        job: &JobView,
    ) -> Result<ProcessOutcome, ProcessorError> {
        Ok(match self.build(item, job) {
            Ok(invoice) => ProcessOutcome::Success(invoice),
            Err(rejection) => rejection,
        })
    }
}
