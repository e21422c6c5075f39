//! Report export processor.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing;

use batchflow_entity::job::{JobItem, JobView};

use super::required_str;
use crate::processor::{ProcessOutcome, Processor, ProcessorError};

/// Output formats a report can be rendered to.
const FORMATS: [&str; 3] = ["pdf", "csv", "xlsx"];

/// Renders one report section per item.
///
/// Payload: `report`, `format` (`pdf`, `csv` or `xlsx`), optional `section`.
#[derive(Debug, Default)]
pub struct ReportExportProcessor;

impl ReportExportProcessor {
    /// Create a new report export processor
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Processor for ReportExportProcessor {
    async fn process(
        &self,
        item: &JobItem,
        job: &JobView,
    ) -> Result<ProcessOutcome, ProcessorError> {
        let report = match required_str(item, "report") {
            Ok(report) => report,
            Err(rejection) => return Ok(rejection),
        };
        let format = match required_str(item, "format") {
            Ok(format) => format.to_ascii_lowercase(),
            Err(rejection) => return Ok(rejection),
        };
        if !FORMATS.contains(&format.as_str()) {
            return Ok(ProcessOutcome::failure(format!(
                "Unsupported report format '{}'",
                format
            )));
        }

        let section = item
            .data
            .get("section")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("part-{}", item.index + 1));
        let file_name = format!("{}-{}.{}", report, section, format);

        tracing::debug!(job_id = %job.id, "Rendered report section '{}'", file_name);

        Ok(ProcessOutcome::Success(json!({
            "report": report,
            "section": section,
            "format": format,
            "file_name": file_name,
            "rendered_at": Utc::now().to_rfc3339(),
        })))
    }
}
