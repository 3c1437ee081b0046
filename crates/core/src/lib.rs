//! # MedBill Core
//!
//! Billing logic for the MedBill assistant:
//! - encounter intake and the per-encounter code/medication store
//! - billing aggregation (line items plus consultation and coding fees)
//! - bill rendering to PDF with a plain-text fallback
//! - the suggestion gateway in front of the generative model, with keyword fallbacks
//! - the in-memory record repository
//!
//! **No API concerns**: HTTP routing, request DTOs and OpenAPI documentation belong in
//! `api-rest` and `api-shared`.

pub mod billing;
pub mod bills;
pub mod config;
pub mod constants;
pub mod encounter;
pub mod error;
pub mod render;
pub mod repository;
pub mod store;
pub mod suggestions;
pub mod validation;

pub use billing::{compute_summary, format_money, BillingSummary, FlaggedItem};
pub use bills::{BillRequest, BillService, GeneratedBill};
pub use config::{CoreConfig, GeminiSettings};
pub use encounter::{Encounter, PatientIntake};
pub use error::{CoreError, CoreResult};
pub use medbill_types::DiagnosisCode;
pub use medbill_uuid::RecordId;
pub use render::{DocumentFormat, Renderer};
pub use repository::{BillRecord, PrescriptionRecord, RecordRepository};
pub use store::{coerce_cost, CodeStore, LineItem};
pub use suggestions::{SuggestionGateway, SuggestionSource};
