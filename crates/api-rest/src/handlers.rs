//! HTTP handlers.
//!
//! Handlers translate between wire DTOs and core types; every billing decision is made in
//! `medbill-core`.

use crate::error::ApiError;
use crate::state::AppState;
use api_shared::{
    AiStatusRes, AutoCompleteRes, BillingSummaryDto, ConsultReq, ConsultRes, DirectoryStatus,
    ErrorRes, FileInfo, GenerateBillReq, GenerateBillRes, HealthRes, HealthService, ListPatientsRes,
    Medication, Patient, PatientData, PatientReq, PatientRes, StorageStatusRes, SuggestCodesRes,
    SuggestMedicationsRes, SuggestReq, UpdatePatientReq, UploadRes,
};
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use medbill_core::suggestions::{Attachment, PatientContext};
use medbill_core::validation::{
    parse_code_list, require_text, validate_suggestion_notes, validate_upload,
};
use medbill_core::{
    coerce_cost, BillRequest, BillingSummary, CodeStore, DiagnosisCode, Encounter, LineItem,
    PatientIntake, PrescriptionRecord, RecordId,
};
use medbill_files::{media_type_for, ArtifactName, ArtifactStore, FilesError};

fn patient_dto(encounter: &Encounter) -> Patient {
    Patient {
        id: encounter.id().to_string(),
        name: encounter.patient_name().to_string(),
        gender: encounter.gender().to_string(),
        clinical_notes: encounter.clinical_notes().to_string(),
        current_meds: encounter.current_medications().to_string(),
        created_at: encounter.created_at().to_rfc3339(),
        billing_started: encounter.billing_started(),
    }
}

fn medication_dto(item: &LineItem) -> Medication {
    Medication {
        name: item.name().to_string(),
        cost: item.cost(),
        purpose: item.purpose().map(str::to_string),
    }
}

fn summary_dto(summary: &BillingSummary) -> BillingSummaryDto {
    BillingSummaryDto {
        per_item_total: summary.per_item_total,
        consultation_fee: summary.consultation_fee,
        coding_fee: summary.coding_fee,
        grand_total: summary.grand_total,
        code_count: summary.code_count,
        flagged_items: summary.flagged.iter().map(|f| f.name.clone()).collect(),
        ready_for_billing: summary.ready_for_billing().is_ok(),
    }
}

fn code_strings(codes: &[DiagnosisCode]) -> Vec<String> {
    codes.iter().map(DiagnosisCode::to_string).collect()
}

fn context_from(data: Option<&PatientData>) -> PatientContext {
    PatientContext {
        gender: data.and_then(|d| d.gender.clone()),
        clinical_notes: data.and_then(|d| d.clinical_notes.clone()),
        current_medications: data.and_then(|d| d.current_meds.clone()),
    }
}

fn parse_patient_id(id: &str) -> Result<RecordId, ApiError> {
    RecordId::parse(id.trim()).map_err(|_| ApiError::not_found(format!("Patient {id} not found")))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Liveness probe.
pub async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = PatientReq,
    responses(
        (status = 201, description = "Patient registered", body = PatientRes),
        (status = 400, description = "Name, gender or clinical notes missing", body = ErrorRes)
    )
)]
/// Registers a patient encounter.
#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<AppState>,
    Json(req): Json<PatientReq>,
) -> Result<(StatusCode, Json<PatientRes>), ApiError> {
    let encounter = Encounter::register(PatientIntake {
        name: req.name,
        gender: req.gender,
        clinical_notes: req.clinical_notes,
        current_medications: req.current_meds,
    })?;
    let saved = state.repository.save_encounter(encounter);

    Ok((
        StatusCode::CREATED,
        Json(PatientRes {
            success: true,
            patient: patient_dto(&saved),
            message: Some("Patient saved successfully".into()),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "Registered patients", body = ListPatientsRes)
    )
)]
#[axum::debug_handler]
pub async fn list_patients(State(state): State<AppState>) -> Json<ListPatientsRes> {
    let patients: Vec<Patient> = state
        .repository
        .list_encounters()
        .iter()
        .map(patient_dto)
        .collect();
    Json(ListPatientsRes {
        success: true,
        count: patients.len(),
        patients,
    })
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "The patient", body = PatientRes),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PatientRes>, ApiError> {
    let record_id = parse_patient_id(&id)?;
    let encounter = state
        .repository
        .find_encounter(record_id)
        .ok_or_else(|| ApiError::not_found(format!("Patient {id} not found")))?;

    Ok(Json(PatientRes {
        success: true,
        patient: patient_dto(&encounter),
        message: None,
    }))
}

#[utoipa::path(
    patch,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    request_body = UpdatePatientReq,
    responses(
        (status = 200, description = "Updated patient", body = PatientRes),
        (status = 400, description = "Blank name, or name or medications changed after billing started", body = ErrorRes),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
/// Edits a registered patient. Notes may change at any time; the name and current
/// medications are frozen once the encounter has been billed.
#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePatientReq>,
) -> Result<Json<PatientRes>, ApiError> {
    let record_id = parse_patient_id(&id)?;
    let updated = state.repository.update_encounter(record_id, move |e| {
        if let Some(name) = req.name.as_deref() {
            e.rename_patient(name)?;
        }
        if let Some(medications) = req.current_meds {
            e.set_current_medications(medications)?;
        }
        if let Some(notes) = req.clinical_notes {
            require_text("clinicalNotes", Some(&notes))?;
            e.update_notes(notes);
        }
        Ok(())
    })?;

    Ok(Json(PatientRes {
        success: true,
        patient: patient_dto(&updated),
        message: Some("Patient updated successfully".into()),
    }))
}

#[utoipa::path(
    post,
    path = "/auto-suggest-codes",
    request_body = SuggestReq,
    responses(
        (status = 200, description = "Suggested ICD-10 codes", body = SuggestCodesRes),
        (status = 400, description = "Clinical notes too short", body = ErrorRes)
    )
)]
/// Suggests ICD-10 codes for the clinical notes. Falls back to keyword rules when the
/// model is unavailable.
#[axum::debug_handler]
pub async fn suggest_codes(
    State(state): State<AppState>,
    Json(req): Json<SuggestReq>,
) -> Result<Json<SuggestCodesRes>, ApiError> {
    let notes = validate_suggestion_notes(req.clinical_notes.as_deref())?;
    tracing::info!("suggesting codes for {} characters of notes", notes.len());

    let suggested = state.gateway.suggest_codes(notes).await;
    Ok(Json(SuggestCodesRes {
        success: true,
        count: suggested.items.len(),
        suggested_codes: code_strings(&suggested.items),
        source: suggested.source.as_str().into(),
    }))
}

#[utoipa::path(
    post,
    path = "/auto-suggest-medications",
    request_body = SuggestReq,
    responses(
        (status = 200, description = "Suggested medications", body = SuggestMedicationsRes),
        (status = 400, description = "Clinical notes missing", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn suggest_medications(
    State(state): State<AppState>,
    Json(req): Json<SuggestReq>,
) -> Result<Json<SuggestMedicationsRes>, ApiError> {
    let notes = require_text("Clinical notes", req.clinical_notes.as_deref())?;

    let suggested = state
        .gateway
        .suggest_medications(notes, req.current_meds.as_deref())
        .await;
    Ok(Json(SuggestMedicationsRes {
        success: true,
        count: suggested.items.len(),
        suggested_medications: suggested.items.iter().map(medication_dto).collect(),
        source: suggested.source.as_str().into(),
    }))
}

#[utoipa::path(
    post,
    path = "/auto-complete-billing",
    request_body = SuggestReq,
    responses(
        (status = 200, description = "Codes, medications and the resulting summary", body = AutoCompleteRes),
        (status = 400, description = "Clinical notes too short", body = ErrorRes)
    )
)]
/// Runs code and medication suggestion concurrently and totals the result.
#[axum::debug_handler]
pub async fn auto_complete_billing(
    State(state): State<AppState>,
    Json(req): Json<SuggestReq>,
) -> Result<Json<AutoCompleteRes>, ApiError> {
    let notes = validate_suggestion_notes(req.clinical_notes.as_deref())?;

    let (codes, medications) = tokio::join!(
        state.gateway.suggest_codes(notes),
        state
            .gateway
            .suggest_medications(notes, req.current_meds.as_deref()),
    );

    let mut store = CodeStore::new();
    store.replace_all(codes.items, medications.items);
    let summary = store.summary();

    Ok(Json(AutoCompleteRes {
        success: true,
        message: format!(
            "Suggested {} codes and {} medications",
            store.codes().len(),
            store.line_items().len()
        ),
        suggested_codes: code_strings(store.codes()),
        suggested_medications: store.line_items().iter().map(medication_dto).collect(),
        codes_source: codes.source.as_str().into(),
        medications_source: medications.source.as_str().into(),
        summary: summary_dto(&summary),
    }))
}

#[utoipa::path(
    post,
    path = "/ai-consult",
    request_body = ConsultReq,
    responses(
        (status = 200, description = "Model answer", body = ConsultRes),
        (status = 400, description = "Message missing", body = ErrorRes),
        (status = 502, description = "Model unavailable", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn ai_consult(
    State(state): State<AppState>,
    Json(req): Json<ConsultReq>,
) -> Result<Json<ConsultRes>, ApiError> {
    let message = require_text("Message", req.message.as_deref())?;
    let codes: Vec<DiagnosisCode> = req
        .icd10_codes
        .iter()
        .filter_map(|c| DiagnosisCode::from_labelled(c).ok())
        .collect();

    let response = state
        .gateway
        .consult(message, &context_from(req.patient_data.as_ref()), &codes)
        .await
        .map_err(medbill_core::CoreError::from)?;

    Ok(Json(ConsultRes {
        success: true,
        response,
    }))
}

/// Multipart fields of a prescription upload.
#[derive(Default)]
struct UploadForm {
    file: Option<(String, String, Vec<u8>)>,
    patient_id: Option<String>,
    clinical_notes: Option<String>,
    current_meds: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    let multipart_error =
        |e: axum::extract::multipart::MultipartError| ApiError::new(e.status(), e.body_text());

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "prescription" => {
                let original = field.file_name().unwrap_or("upload").to_string();
                let media_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.file = Some((original, media_type, bytes.to_vec()));
            }
            "patientId" => form.patient_id = Some(field.text().await.map_err(multipart_error)?),
            "clinicalNotes" => {
                form.clinical_notes = Some(field.text().await.map_err(multipart_error)?)
            }
            "currentMeds" => form.current_meds = Some(field.text().await.map_err(multipart_error)?),
            _ => {}
        }
    }
    Ok(form)
}

#[utoipa::path(
    post,
    path = "/upload-prescription",
    responses(
        (status = 200, description = "Stored and analysed", body = UploadRes),
        (status = 400, description = "Missing file or unsupported type", body = ErrorRes),
        (status = 413, description = "File larger than 10 MiB", body = ErrorRes)
    )
)]
/// Stores a prescription (multipart field `prescription`) and asks the model to analyse it.
///
/// Optional text fields `patientId`, `clinicalNotes` and `currentMeds` add context; notes
/// and medications default to the registered patient's when only the id is given.
#[axum::debug_handler]
pub async fn upload_prescription(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadRes>, ApiError> {
    let form = read_upload_form(multipart).await?;
    let (original_name, media_type, bytes) = form
        .file
        .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    validate_upload(&media_type, bytes.len(), state.cfg.max_upload_bytes())?;

    let name = ArtifactName::for_upload(&original_name, Utc::now());
    let stored = state
        .uploads
        .write_once(&name, &bytes)
        .map_err(medbill_core::CoreError::from)?;

    let registered = form
        .patient_id
        .as_deref()
        .and_then(|id| RecordId::parse(id.trim()).ok())
        .and_then(|id| state.repository.find_encounter(id));
    let context = PatientContext {
        gender: registered.as_ref().map(|e| e.gender().to_string()),
        clinical_notes: form
            .clinical_notes
            .or_else(|| registered.as_ref().map(|e| e.clinical_notes().to_string())),
        current_medications: form
            .current_meds
            .or_else(|| registered.as_ref().map(|e| e.current_medications().to_string())),
    };

    let analysis = state
        .gateway
        .analyse_document(
            &context,
            Some(Attachment {
                media_type: media_type.clone(),
                data: bytes,
            }),
        )
        .await;

    state.repository.record_prescription(PrescriptionRecord {
        id: RecordId::new(),
        patient_id: form.patient_id.clone(),
        original_name: original_name.clone(),
        artifact: stored.clone(),
        analysis: analysis.clone(),
        uploaded_at: stored.stored_at,
    });

    Ok(Json(UploadRes {
        success: true,
        message: "Prescription uploaded successfully".into(),
        analysis,
        file_info: FileInfo {
            filename: stored.name.to_string(),
            original_name,
            size: stored.size_bytes,
            media_type,
            download_url: format!("/uploads/{}", stored.name),
            sha256: stored.sha256,
        },
    }))
}

fn build_store(req: &GenerateBillReq) -> Result<CodeStore, ApiError> {
    let mut store = CodeStore::new();
    for code in parse_code_list(&req.icd10_codes)? {
        store.insert_code(code);
    }
    for (i, med) in req.medications.iter().enumerate() {
        let name = require_text(&format!("Medication {} name", i + 1), med.name.as_deref())?;
        let cost = med
            .cost
            .as_ref()
            .map(coerce_cost)
            .unwrap_or(rust_decimal::Decimal::ZERO);
        let item = LineItem::new(name, cost);
        store.add_line_item(match &med.purpose {
            Some(purpose) => item.with_purpose(purpose.as_str()),
            None => item,
        });
    }
    Ok(store)
}

/// Registered encounter whose note update and billing lock are applied once the bill is stored.
struct PendingLock {
    id: RecordId,
    notes: Option<String>,
}

fn bill_encounter(
    state: &AppState,
    data: PatientData,
) -> Result<(Encounter, Option<PendingLock>), ApiError> {
    if let Some(id) = data.id.as_deref().filter(|id| !id.trim().is_empty()) {
        let record_id = parse_patient_id(id)?;
        let mut encounter = state
            .repository
            .find_encounter(record_id)
            .ok_or_else(|| ApiError::not_found(format!("Patient {id} not found")))?;
        let notes = data.clinical_notes.filter(|n| !n.trim().is_empty());
        if let Some(notes) = &notes {
            encounter.update_notes(notes.as_str());
        }
        return Ok((
            encounter,
            Some(PendingLock {
                id: record_id,
                notes,
            }),
        ));
    }

    let encounter = Encounter::for_billing(PatientIntake {
        name: data.name,
        gender: data.gender,
        clinical_notes: data.clinical_notes,
        current_medications: data.current_meds,
    })?;
    Ok((encounter, None))
}

#[utoipa::path(
    post,
    path = "/generate-bill",
    request_body = GenerateBillReq,
    responses(
        (status = 200, description = "Bill generated", body = GenerateBillRes),
        (status = 400, description = "Missing patient data, no medications, unpriced medication or malformed code", body = ErrorRes),
        (status = 404, description = "Unknown patient id", body = ErrorRes),
        (status = 500, description = "Rendering or storage failed", body = ErrorRes)
    )
)]
/// Generates a bill. The total is recomputed server-side; `totalAmount` is ignored.
#[axum::debug_handler]
pub async fn generate_bill(
    State(state): State<AppState>,
    Json(req): Json<GenerateBillReq>,
) -> Result<Json<GenerateBillRes>, ApiError> {
    let data = req
        .patient_data
        .clone()
        .ok_or_else(|| ApiError::bad_request("Patient data is required"))?;
    let store = build_store(&req)?;
    store.summary().ready_for_billing()?;

    let (encounter, pending) = bill_encounter(&state, data)?;

    let bill = state
        .bills
        .generate(BillRequest {
            encounter,
            store,
            ai_notes: req.ai_suggestions.clone(),
            client_total: req.total_amount.as_ref().map(coerce_cost),
        })
        .await?;

    if let Some(PendingLock { id, notes }) = pending {
        state.repository.update_encounter(id, move |e| {
            if let Some(notes) = notes {
                e.update_notes(notes);
            }
            e.begin_billing();
            Ok(())
        })?;
    }

    let record = bill.record.clone();
    state.repository.record_bill(bill.record);

    Ok(Json(GenerateBillRes {
        success: true,
        message: if record.degraded {
            "Bill generated as plain text".into()
        } else {
            "Bill generated successfully".into()
        },
        download_url: format!("/bills/{}", record.artifact.name),
        bill_id: record.id.to_string(),
        total_amount: record.total,
        format: record.format.extension().into(),
        degraded: record.degraded,
        summary: summary_dto(&bill.summary),
    }))
}

fn serve_artifact(store: &ArtifactStore, filename: &str, attachment: bool) -> Response {
    let not_found = || ApiError::not_found(format!("File {filename} not found")).into_response();

    let Ok(name) = ArtifactName::parse(filename) else {
        return not_found();
    };
    match store.read(&name) {
        Ok(bytes) => {
            let content_type = media_type_for(&name, &bytes)
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let disposition = if attachment {
                format!("attachment; filename=\"{name}\"")
            } else {
                format!("inline; filename=\"{name}\"")
            };
            (
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            )
                .into_response()
        }
        Err(FilesError::NotFound(_)) => not_found(),
        Err(e) => ApiError::from(medbill_core::CoreError::from(e)).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/uploads/{filename}",
    params(("filename" = String, Path, description = "Stored upload name")),
    responses(
        (status = 200, description = "Uploaded file bytes"),
        (status = 404, description = "No such upload", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn download_upload(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    serve_artifact(&state.uploads, &filename, false)
}

#[utoipa::path(
    get,
    path = "/bills/{filename}",
    params(("filename" = String, Path, description = "Generated bill name")),
    responses(
        (status = 200, description = "Bill document (PDF or plain text)"),
        (status = 404, description = "No such bill", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn download_bill(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    serve_artifact(state.bills.artifacts(), &filename, true)
}

#[utoipa::path(
    get,
    path = "/ai-status",
    responses(
        (status = 200, description = "Model probe result", body = AiStatusRes)
    )
)]
/// Runs a fixed note through code suggestion and reports whether the model answered.
#[axum::debug_handler]
pub async fn ai_status(State(state): State<AppState>) -> Json<AiStatusRes> {
    let report = state.gateway.probe().await;
    Json(AiStatusRes {
        success: true,
        message: if report.connected {
            "Model answered the probe".into()
        } else {
            "Model unavailable; keyword rules answered the probe".into()
        },
        model: report.model,
        ai_status: if report.connected {
            "Connected".into()
        } else {
            "Disconnected".into()
        },
        test_input: report.input,
        generated_codes: code_strings(&report.codes),
    })
}

fn directory_status(store: &ArtifactStore) -> DirectoryStatus {
    let check = store.check_writable();
    DirectoryStatus {
        path: store.directory().display().to_string(),
        writable: check.is_ok(),
        error: check.err().map(|e| e.to_string()),
    }
}

#[utoipa::path(
    get,
    path = "/storage-status",
    responses(
        (status = 200, description = "Artifact directory status", body = StorageStatusRes)
    )
)]
#[axum::debug_handler]
pub async fn storage_status(State(state): State<AppState>) -> Json<StorageStatusRes> {
    let uploads = directory_status(&state.uploads);
    let bills = directory_status(state.bills.artifacts());
    Json(StorageStatusRes {
        success: uploads.writable && bills.writable,
        environment: state.environment.clone(),
        api_key: if state.cfg.gemini().is_some() {
            "Present".into()
        } else {
            "Missing".into()
        },
        uploads,
        bills,
        prescriptions_recorded: state.repository.list_prescriptions().len(),
        bills_recorded: state.repository.list_bills().len(),
    })
}

