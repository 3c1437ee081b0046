//! # API REST
//!
//! REST API implementation for MedBill.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON and multipart bodies, CORS, upload size limits)
//!
//! Uses `api-shared` for wire types and `medbill-core` for every billing decision.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use api_shared::{
    AiStatusRes, AutoCompleteRes, BillingSummaryDto, ConsultReq, ConsultRes, DirectoryStatus,
    ErrorRes, FileInfo, GenerateBillReq, GenerateBillRes, HealthRes, ListPatientsRes, Medication,
    MedicationInput, Patient, PatientData, PatientReq, PatientRes, StorageStatusRes,
    SuggestCodesRes, SuggestMedicationsRes, SuggestReq, UpdatePatientReq, UploadRes,
};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Room for multipart boundaries and the small text fields around the file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::create_patient,
        handlers::list_patients,
        handlers::get_patient,
        handlers::update_patient,
        handlers::suggest_codes,
        handlers::suggest_medications,
        handlers::auto_complete_billing,
        handlers::ai_consult,
        handlers::upload_prescription,
        handlers::generate_bill,
        handlers::download_upload,
        handlers::download_bill,
        handlers::ai_status,
        handlers::storage_status,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        PatientReq,
        UpdatePatientReq,
        Patient,
        PatientRes,
        ListPatientsRes,
        SuggestReq,
        SuggestCodesRes,
        Medication,
        SuggestMedicationsRes,
        BillingSummaryDto,
        AutoCompleteRes,
        PatientData,
        ConsultReq,
        ConsultRes,
        FileInfo,
        UploadRes,
        MedicationInput,
        GenerateBillReq,
        GenerateBillRes,
        AiStatusRes,
        DirectoryStatus,
        StorageStatusRes,
    ))
)]
pub struct ApiDoc;

/// Builds the full REST router, Swagger UI included.
pub fn router(state: AppState) -> Router {
    let upload_limit = state.cfg.max_upload_bytes() + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/patients",
            get(handlers::list_patients).post(handlers::create_patient),
        )
        .route(
            "/patients/:id",
            get(handlers::get_patient).patch(handlers::update_patient),
        )
        .route("/auto-suggest-codes", post(handlers::suggest_codes))
        .route(
            "/auto-suggest-medications",
            post(handlers::suggest_medications),
        )
        .route(
            "/auto-complete-billing",
            post(handlers::auto_complete_billing),
        )
        .route("/ai-consult", post(handlers::ai_consult))
        .route(
            "/upload-prescription",
            post(handlers::upload_prescription).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/generate-bill", post(handlers::generate_bill))
        .route("/uploads/:filename", get(handlers::download_upload))
        .route("/bills/:filename", get(handlers::download_bill))
        .route("/ai-status", get(handlers::ai_status))
        .route("/storage-status", get(handlers::storage_status))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
