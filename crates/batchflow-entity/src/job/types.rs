//! Built-in job type identifiers.
//!
//! Job types are plain strings so that business modules can register
//! processors for their own types at runtime.

/// Generate invoices from billing records.
pub const INVOICE_GENERATION: &str = "INVOICE_GENERATION";
/// Submit e-invoices to the ANAF e-Factura service.
pub const EFACTURA_SUBMISSION: &str = "EFACTURA_SUBMISSION";
/// Render and export a report.
pub const REPORT_EXPORT: &str = "REPORT_EXPORT";
/// Import records from an external source.
pub const DATA_IMPORT: &str = "DATA_IMPORT";
/// Export records to an external destination.
pub const DATA_EXPORT: &str = "DATA_EXPORT";
/// Send one message of an email campaign.
pub const EMAIL_CAMPAIGN: &str = "EMAIL_CAMPAIGN";
/// Caller-defined work.
pub const CUSTOM: &str = "CUSTOM";

/// Every job type that ships with a default processor.
pub const BUILTIN: [&str; 7] = [
    INVOICE_GENERATION,
    EFACTURA_SUBMISSION,
    REPORT_EXPORT,
    DATA_IMPORT,
    DATA_EXPORT,
    EMAIL_CAMPAIGN,
    CUSTOM,
];
