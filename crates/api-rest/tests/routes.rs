use api_rest::{router, AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use medbill_core::config::CoreConfig;
use medbill_core::constants::ANALYSIS_UNAVAILABLE;
use medbill_core::suggestions::{
    GatewayError, GatewayResult, GenerateRequest, GenerativeModel, UnconfiguredModel,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "medbill-test-boundary";

/// Replies with canned text chosen by prompt content.
struct StubModel;

#[async_trait]
impl GenerativeModel for StubModel {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, request: &GenerateRequest) -> GatewayResult<String> {
        if request.prompt.contains("ICD-10 diagnosis codes") {
            Ok("```json\n[\"I10 - Essential hypertension\", \"XYZ\"]\n```".into())
        } else if request.prompt.contains("Question:") {
            Ok("Use I10 for essential hypertension.".into())
        } else if request.attachment.is_some() {
            Ok("Lisinopril 10mg once daily.".into())
        } else {
            Err(GatewayError::EmptyReply)
        }
    }
}

/// Prices medications far beyond anything billable and has no codes to offer.
struct OverpricedModel;

#[async_trait]
impl GenerativeModel for OverpricedModel {
    fn name(&self) -> &str {
        "overpriced"
    }

    async fn generate(&self, request: &GenerateRequest) -> GatewayResult<String> {
        if request.prompt.contains("clinical pharmacist") {
            Ok(r#"[{"name": "Radium tonic", "cost": 5e28},
                   {"name": "Mercury tonic", "cost": 5e28},
                   {"name": "Aspirin 81mg", "cost": 2.5}]"#
                .into())
        } else {
            Err(GatewayError::EmptyReply)
        }
    }
}

fn test_app(model: Arc<dyn GenerativeModel>) -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let cfg = CoreConfig::new(
        dir.path().to_path_buf(),
        None,
        Duration::from_secs(2),
        Duration::from_secs(10),
    )
    .unwrap();
    let state = AppState::new(Arc::new(cfg), model, "test").unwrap();
    (router(state), dir)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

fn multipart_request(file: Option<(&str, &str, &[u8])>, fields: &[(&str, &str)]) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, content_type, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"prescription\"; \
                 filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/upload-prescription")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn bill_body(patient: Value, medications: Value, codes: Value) -> Value {
    json!({
        "patientData": patient,
        "medications": medications,
        "icd10Codes": codes,
        "aiSuggestions": "Rest and fluids.\nReview in one week.",
        "totalAmount": 1
    })
}

#[tokio::test]
async fn health_is_alive() {
    let (app, _dir) = test_app(Arc::new(UnconfiguredModel));
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (app, _dir) = test_app(Arc::new(UnconfiguredModel));
    let (status, body) = get(&app, "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    let doc: Value = serde_json::from_slice(&body).unwrap();
    assert!(doc["paths"]["/generate-bill"].is_object());
}

#[tokio::test]
async fn patient_lifecycle() {
    let (app, _dir) = test_app(Arc::new(UnconfiguredModel));

    let (status, body) = send_json(
        &app,
        "POST",
        "/patients",
        json!({"name": "Jane Roe", "gender": " ", "clinicalNotes": "cough"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "gender is required");

    let (status, body) = send_json(
        &app,
        "POST",
        "/patients",
        json!({"name": "Jane Roe", "gender": "female", "clinicalNotes": "cough", "currentMeds": "None"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["patient"]["id"].as_str().unwrap().to_string();

    let (_, list) = get(&app, "/patients").await;
    let list: Value = serde_json::from_slice(&list).unwrap();
    assert_eq!(list["count"], 1);

    let (status, one) = get(&app, &format!("/patients/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    let one: Value = serde_json::from_slice(&one).unwrap();
    assert_eq!(one["patient"]["name"], "Jane Roe");

    let (status, _) = get(&app, "/patients/0123456789abcdef0123456789abcdef").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(&app, "/patients/not-an-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn code_suggestion_validates_and_falls_back() {
    let (app, _dir) = test_app(Arc::new(UnconfiguredModel));

    let (status, _) = send_json(
        &app,
        "POST",
        "/auto-suggest-codes",
        json!({"clinicalNotes": " abc "}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send_json(
        &app,
        "POST",
        "/auto-suggest-codes",
        json!({"clinicalNotes": "High fever with headache"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "fallback");
    assert_eq!(body["suggestedCodes"], json!(["R50.9", "R51"]));
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn code_suggestion_uses_model_reply() {
    let (app, _dir) = test_app(Arc::new(StubModel));
    let (status, body) = send_json(
        &app,
        "POST",
        "/auto-suggest-codes",
        json!({"clinicalNotes": "Elevated blood pressure readings"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "model");
    assert_eq!(body["suggestedCodes"], json!(["I10"]));
}

#[tokio::test]
async fn medication_suggestion_requires_notes() {
    let (app, _dir) = test_app(Arc::new(UnconfiguredModel));
    let (status, _) = send_json(&app, "POST", "/auto-suggest-medications", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send_json(
        &app,
        "POST",
        "/auto-suggest-medications",
        json!({"clinicalNotes": "Hypertension follow-up"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestedMedications"][0]["name"], "Lisinopril 10mg");
    assert_eq!(body["suggestedMedications"][0]["cost"], json!(22.0));
}

#[tokio::test]
async fn auto_complete_merges_and_totals() {
    let (app, _dir) = test_app(Arc::new(UnconfiguredModel));
    let (status, body) = send_json(
        &app,
        "POST",
        "/auto-complete-billing",
        json!({"clinicalNotes": "Persistent cough for five days"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestedCodes"], json!(["J06.9"]));
    assert_eq!(body["suggestedMedications"].as_array().unwrap().len(), 3);
    assert_eq!(body["summary"]["grandTotal"], json!(135.5));
    assert_eq!(body["summary"]["readyForBilling"], true);
}

#[tokio::test]
async fn auto_complete_flags_unbillable_model_costs() {
    let (app, _dir) = test_app(Arc::new(OverpricedModel));
    let (status, body) = send_json(
        &app,
        "POST",
        "/auto-complete-billing",
        json!({"clinicalNotes": "Persistent cough for five days"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["medicationsSource"], "model");
    assert_eq!(
        body["summary"]["flaggedItems"],
        json!(["Radium tonic", "Mercury tonic"])
    );
    assert_eq!(body["summary"]["readyForBilling"], false);
    assert_eq!(body["summary"]["perItemTotal"], json!(2.5));
}

#[tokio::test]
async fn generate_bill_totals_and_serves_pdf() {
    let (app, _dir) = test_app(Arc::new(UnconfiguredModel));
    let (status, body) = send_json(
        &app,
        "POST",
        "/generate-bill",
        bill_body(
            json!({"name": "Jane Roe", "gender": "female"}),
            json!([{"name": "Acetaminophen 500mg", "cost": "15.00"}]),
            json!(["J06.9 - Acute upper respiratory infection"]),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["totalAmount"], json!(105.0));
    assert_eq!(body["format"], "pdf");
    assert_eq!(body["degraded"], false);

    let url = body["downloadUrl"].as_str().unwrap();
    let response = app
        .clone()
        .oneshot(Request::get(url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/pdf"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn generate_bill_rejects_invalid_input() {
    let (app, dir) = test_app(Arc::new(UnconfiguredModel));
    let patient = json!({"name": "Jane Roe"});
    let one_med = json!([{"name": "Aspirin", "cost": 5}]);

    let cases = [
        bill_body(json!(null), one_med.clone(), json!([])),
        bill_body(patient.clone(), json!([]), json!(["J06.9"])),
        bill_body(patient.clone(), json!([{"name": "Saline", "cost": 0}]), json!([])),
        bill_body(patient.clone(), json!([{"name": "Saline", "cost": "free"}]), json!([])),
        bill_body(
            patient.clone(),
            json!([{"name": "Radium tonic", "cost": "79228162514264337593543950335"}]),
            json!([]),
        ),
        bill_body(
            patient.clone(),
            json!([{"name": "Mercury tonic", "cost": 5e28}, {"name": "Mercury tonic", "cost": 5e28}]),
            json!([]),
        ),
        bill_body(patient.clone(), one_med.clone(), json!(["XYZ"])),
        bill_body(json!({"gender": "male"}), one_med, json!([])),
    ];
    for case in cases {
        let (status, body) = send_json(&app, "POST", "/generate-bill", case.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{case} -> {body}");
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    }

    let bills = std::fs::read_dir(dir.path().join("bills")).unwrap().count();
    assert_eq!(bills, 0);
}

#[tokio::test]
async fn unencodable_names_degrade_to_text() {
    let (app, _dir) = test_app(Arc::new(UnconfiguredModel));
    let (status, body) = send_json(
        &app,
        "POST",
        "/generate-bill",
        bill_body(
            json!({"name": "王小明"}),
            json!([{"name": "Acetaminophen 500mg", "cost": 15}]),
            json!(["J06.9"]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["degraded"], true);
    assert_eq!(body["format"], "txt");

    let (status, bytes) = get(&app, body["downloadUrl"].as_str().unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("王小明"));
    assert!(text.contains("TOTAL AMOUNT: $105.00"));
}

#[tokio::test]
async fn billing_a_registered_patient_locks_it() {
    let (app, _dir) = test_app(Arc::new(UnconfiguredModel));
    let (_, created) = send_json(
        &app,
        "POST",
        "/patients",
        json!({"name": "Jane Roe", "gender": "female", "clinicalNotes": "cough"}),
    )
    .await;
    let id = created["patient"]["id"].as_str().unwrap().to_string();

    let (status, _) = send_json(
        &app,
        "POST",
        "/generate-bill",
        bill_body(
            json!({"id": id, "clinicalNotes": "cough, improving"}),
            json!([{"name": "Guaifenesin 400mg", "cost": 18}]),
            json!([]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, patient) = get(&app, &format!("/patients/{id}")).await;
    let patient: Value = serde_json::from_slice(&patient).unwrap();
    assert_eq!(patient["patient"]["billingStarted"], true);
    assert_eq!(patient["patient"]["clinicalNotes"], "cough, improving");
}

#[tokio::test]
async fn failed_bill_leaves_patient_unlocked() {
    let (app, dir) = test_app(Arc::new(UnconfiguredModel));
    let (_, created) = send_json(
        &app,
        "POST",
        "/patients",
        json!({"name": "Jane Roe", "gender": "female", "clinicalNotes": "cough"}),
    )
    .await;
    let id = created["patient"]["id"].as_str().unwrap().to_string();

    std::fs::remove_dir_all(dir.path().join("bills")).unwrap();
    let (status, body) = send_json(
        &app,
        "POST",
        "/generate-bill",
        bill_body(
            json!({"id": id, "clinicalNotes": "cough, improving"}),
            json!([{"name": "Guaifenesin 400mg", "cost": 18}]),
            json!([]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{body}");

    let (_, patient) = get(&app, &format!("/patients/{id}")).await;
    let patient: Value = serde_json::from_slice(&patient).unwrap();
    assert_eq!(patient["patient"]["billingStarted"], false);
    assert_eq!(patient["patient"]["clinicalNotes"], "cough");

    let (status, _) = send_json(
        &app,
        "PATCH",
        &format!("/patients/{id}"),
        json!({"name": "Janet Roe"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn patient_edits_respect_billing_lock() {
    let (app, _dir) = test_app(Arc::new(UnconfiguredModel));
    let (_, created) = send_json(
        &app,
        "POST",
        "/patients",
        json!({"name": "Jane Roe", "gender": "female", "clinicalNotes": "cough"}),
    )
    .await;
    let id = created["patient"]["id"].as_str().unwrap().to_string();
    let uri = format!("/patients/{id}");

    let (status, body) = send_json(
        &app,
        "PATCH",
        &uri,
        json!({"name": "Janet Roe", "currentMeds": "Aspirin 81mg"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["patient"]["name"], "Janet Roe");
    assert_eq!(body["patient"]["currentMeds"], "Aspirin 81mg");
    assert_eq!(body["patient"]["clinicalNotes"], "cough");

    let (status, _) = send_json(&app, "PATCH", &uri, json!({"name": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "POST",
        "/generate-bill",
        bill_body(
            json!({"id": id}),
            json!([{"name": "Guaifenesin 400mg", "cost": 18}]),
            json!([]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(&app, "PATCH", &uri, json!({"name": "Someone Else"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    let (status, _) = send_json(&app, "PATCH", &uri, json!({"currentMeds": "None"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send_json(
        &app,
        "PATCH",
        &uri,
        json!({"clinicalNotes": "cough resolved"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["patient"]["clinicalNotes"], "cough resolved");
    assert_eq!(body["patient"]["name"], "Janet Roe");
    assert_eq!(body["patient"]["billingStarted"], true);

    let (status, _) = send_json(
        &app,
        "PATCH",
        "/patients/00000000000000000000000000000000",
        json!({"clinicalNotes": "x"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn consult_requires_message_and_reports_model_failure() {
    let (app, _dir) = test_app(Arc::new(UnconfiguredModel));
    let (status, _) = send_json(&app, "POST", "/ai-consult", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) =
        send_json(&app, "POST", "/ai-consult", json!({"message": "Is I10 right?"})).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);

    let (stubbed, _stub_dir) = test_app(Arc::new(StubModel));
    let (status, body) = send_json(
        &stubbed,
        "POST",
        "/ai-consult",
        json!({"message": "Is I10 right?", "icd10Codes": ["I10", "bogus"]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Use I10 for essential hypertension.");
}

#[tokio::test]
async fn upload_stores_file_and_analyses_it() {
    let (app, _dir) = test_app(Arc::new(StubModel));
    let request = multipart_request(
        Some(("rx scan.png", "image/png", &b"\x89PNG\r\n\x1a\nrest"[..])),
        &[("clinicalNotes", "hypertension")],
    );
    let (status, body) = send(&app, request).await;
    let body: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["analysis"], "Lisinopril 10mg once daily.");
    assert_eq!(body["fileInfo"]["originalName"], "rx scan.png");
    assert_eq!(body["fileInfo"]["type"], "image/png");

    let (status, bytes) = get(&app, body["fileInfo"]["downloadUrl"].as_str().unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(bytes.starts_with(b"\x89PNG"));
}

#[tokio::test]
async fn upload_analysis_failure_is_not_an_error() {
    let (app, _dir) = test_app(Arc::new(UnconfiguredModel));
    let request = multipart_request(Some(("rx.txt", "text/plain", &b"Amoxicillin 500mg"[..])), &[]);
    let (status, body) = send(&app, request).await;
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analysis"], ANALYSIS_UNAVAILABLE);
}

#[tokio::test]
async fn upload_rejects_missing_unsupported_and_oversize_files() {
    let (app, _dir) = test_app(Arc::new(UnconfiguredModel));

    let (status, _) = send(&app, multipart_request(None, &[("patientId", "x")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        multipart_request(Some(("a.zip", "application/zip", &b"PK"[..])), &[]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let oversize = vec![b'a'; 10 * 1024 * 1024 + 1];
    let (status, _) = send(
        &app,
        multipart_request(Some(("big.txt", "text/plain", oversize.as_slice())), &[]),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn downloads_reject_unsafe_and_unknown_names() {
    let (app, _dir) = test_app(Arc::new(UnconfiguredModel));
    for uri in [
        "/bills/..%2F..%2Fetc%2Fpasswd",
        "/bills/.env",
        "/bills/bill-1-abc.pdf",
        "/uploads/missing.png",
    ] {
        let (status, _) = get(&app, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn status_endpoints_report_configuration() {
    let (app, _dir) = test_app(Arc::new(UnconfiguredModel));

    let (status, body) = get(&app, "/ai-status").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["aiStatus"], "Disconnected");
    assert!(!body["generatedCodes"].as_array().unwrap().is_empty());

    let (status, body) = get(&app, "/storage-status").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["apiKey"], "Missing");
    assert_eq!(body["uploads"]["writable"], true);
    assert_eq!(body["environment"], "test");
}
