//! Request and response bodies.
//!
//! Money is carried as `rust_decimal::Decimal` and serialised as a JSON number. Every response
//! carries `success`; error responses use [`ErrorRes`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub success: bool,
    pub error: String,
}

impl ErrorRes {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

// Patients

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientReq {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub clinical_notes: Option<String>,
    pub current_meds: Option<String>,
}

/// Partial edit of a registered patient; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePatientReq {
    pub name: Option<String>,
    pub clinical_notes: Option<String>,
    pub current_meds: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub gender: String,
    pub clinical_notes: String,
    pub current_meds: String,
    pub created_at: String,
    pub billing_started: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientRes {
    pub success: bool,
    pub patient: Patient,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub success: bool,
    pub patients: Vec<Patient>,
    pub count: usize,
}

// Suggestions

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestReq {
    pub clinical_notes: Option<String>,
    pub current_meds: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestCodesRes {
    pub success: bool,
    pub suggested_codes: Vec<String>,
    pub count: usize,
    /// `model` or `fallback`
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Medication {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub cost: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestMedicationsRes {
    pub success: bool,
    pub suggested_medications: Vec<Medication>,
    pub count: usize,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillingSummaryDto {
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub per_item_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub consultation_fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub coding_fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub grand_total: Decimal,
    pub code_count: usize,
    /// Names of line items that cannot be billed (cost of zero or less).
    pub flagged_items: Vec<String>,
    pub ready_for_billing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutoCompleteRes {
    pub success: bool,
    pub suggested_codes: Vec<String>,
    pub suggested_medications: Vec<Medication>,
    pub codes_source: String,
    pub medications_source: String,
    pub summary: BillingSummaryDto,
    pub message: String,
}

// Consultation

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientData {
    /// Id of a registered patient, if the bill belongs to one.
    pub id: Option<String>,
    pub name: Option<String>,
    pub gender: Option<String>,
    pub clinical_notes: Option<String>,
    pub current_meds: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsultReq {
    pub message: Option<String>,
    pub patient_data: Option<PatientData>,
    #[serde(default)]
    pub icd10_codes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConsultRes {
    pub success: bool,
    pub response: String,
}

// Uploads

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub filename: String,
    pub original_name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub media_type: String,
    pub download_url: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadRes {
    pub success: bool,
    pub message: String,
    pub analysis: String,
    pub file_info: FileInfo,
}

// Bills

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct MedicationInput {
    pub name: Option<String>,
    /// Number or numeric string; anything else counts as zero.
    #[schema(value_type = Option<f64>)]
    pub cost: Option<serde_json::Value>,
    pub purpose: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBillReq {
    pub patient_data: Option<PatientData>,
    #[serde(default)]
    pub medications: Vec<MedicationInput>,
    #[serde(default)]
    pub icd10_codes: Vec<String>,
    pub ai_suggestions: Option<String>,
    /// Client-side total. Ignored; the server recomputes it.
    #[schema(value_type = Option<f64>)]
    pub total_amount: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBillRes {
    pub success: bool,
    pub message: String,
    pub download_url: String,
    pub bill_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total_amount: Decimal,
    /// `pdf` or `txt`
    pub format: String,
    /// True when the plain-text fallback produced the bill.
    pub degraded: bool,
    pub summary: BillingSummaryDto,
}

// Status

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AiStatusRes {
    pub success: bool,
    pub message: String,
    pub model: String,
    /// `Connected` or `Disconnected`
    pub ai_status: String,
    pub test_input: String,
    pub generated_codes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryStatus {
    pub path: String,
    pub writable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageStatusRes {
    pub success: bool,
    pub environment: String,
    /// `Present` or `Missing`
    pub api_key: String,
    pub uploads: DirectoryStatus,
    pub bills: DirectoryStatus,
    pub prescriptions_recorded: usize,
    pub bills_recorded: usize,
}
