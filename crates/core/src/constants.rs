//! Constants used throughout the MedBill core crate.
//!
//! Fees, fixed document wording, and configuration defaults live here so the renderer,
//! the aggregator and the HTTP surface agree on them.

use rust_decimal::Decimal;

/// Fixed consultation fee added to every bill (75.00).
pub fn consultation_fee() -> Decimal {
    Decimal::new(7500, 2)
}

/// Coding fee charged per diagnosis code (15.00).
pub fn coding_fee_per_code() -> Decimal {
    Decimal::new(1500, 2)
}

/// Highest cost a single line item may carry (1,000,000.00). Keeps every total far inside
/// the range of `Decimal`.
pub fn max_line_item_cost() -> Decimal {
    Decimal::new(100_000_000, 2)
}

/// Directory name for rendered bills under the data directory.
pub const BILLS_DIR_NAME: &str = "bills";

/// Directory name for uploaded prescriptions under the data directory.
pub const UPLOADS_DIR_NAME: &str = "uploads";

/// Default data directory when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Data directory used on serverless hosts where only `/tmp` is writable.
pub const SERVERLESS_DATA_DIR: &str = "/tmp/medbill";

/// Default generative model name.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-flash-latest";

/// Default base URL of the generative-language REST API.
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default timeout for one model call, in seconds.
pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 20;

/// Default timeout for the primary (PDF) render, in seconds.
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 10;

/// Largest accepted prescription upload (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Minimum trimmed length of clinical notes sent for code suggestion.
pub const MIN_SUGGESTION_NOTES_LEN: usize = 5;

/// Most codes kept from one model reply.
pub const MAX_SUGGESTED_CODES: usize = 5;

/// Media types accepted for prescription uploads.
pub const ALLOWED_UPLOAD_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "text/plain",
];

/// Document title printed at the top of every bill.
pub const BILL_TITLE: &str = "MEDICAL BILLING STATEMENT";

/// Disclaimer printed at the foot of every bill.
pub const BILL_DISCLAIMER: &str =
    "This is an AI-generated medical bill. Please verify all information with healthcare professionals.";

/// Text returned when document analysis cannot reach the model.
pub const ANALYSIS_UNAVAILABLE: &str =
    "AI analysis is currently unavailable. Please try again later.";

/// Note used when probing the model from the status endpoint.
pub const PROBE_NOTES: &str =
    "Patient with acute upper respiratory infection, fever, and persistent cough";
