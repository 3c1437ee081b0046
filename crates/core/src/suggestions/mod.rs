//! Suggestion gateway.
//!
//! Wraps a [`GenerativeModel`] with prompt building, reply parsing, a per-call timeout and
//! keyword fallbacks. Code and medication suggestions never fail: any model problem is
//! logged and the local rules answer instead.

mod fallback;
mod gemini;
mod model;
mod prompts;
mod reply;

pub use fallback::{fallback_codes, fallback_medications};
pub use gemini::GeminiModel;
pub use model::{create_model, Attachment, GenerateRequest, GenerativeModel, UnconfiguredModel};
pub use prompts::PatientContext;
pub use reply::{parse_codes, parse_medications, strip_fences};

use crate::constants::{ANALYSIS_UNAVAILABLE, PROBE_NOTES};
use crate::store::LineItem;
use medbill_types::DiagnosisCode;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("no generative model is configured")]
    Unconfigured,
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model returned an empty reply")]
    EmptyReply,
    #[error("malformed model reply: {0}")]
    MalformedReply(String),
    #[error("model did not answer within {0:?}")]
    Timeout(Duration),
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Where a suggestion list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    Model,
    Fallback,
}

impl SuggestionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            SuggestionSource::Model => "model",
            SuggestionSource::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Suggested<T> {
    pub items: Vec<T>,
    pub source: SuggestionSource,
}

/// Outcome of running the fixed probe note through code suggestion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub model: String,
    pub connected: bool,
    pub input: String,
    pub codes: Vec<DiagnosisCode>,
}

#[derive(Clone)]
pub struct SuggestionGateway {
    model: Arc<dyn GenerativeModel>,
    timeout: Duration,
}

impl SuggestionGateway {
    pub fn new(model: Arc<dyn GenerativeModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    async fn ask(&self, request: &GenerateRequest) -> GatewayResult<String> {
        match tokio::time::timeout(self.timeout, self.model.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.timeout)),
        }
    }

    pub async fn suggest_codes(&self, notes: &str) -> Suggested<DiagnosisCode> {
        let request = GenerateRequest::text(prompts::codes_prompt(notes));
        match self.ask(&request).await.and_then(|r| parse_codes(&r)) {
            Ok(items) => {
                tracing::info!("model suggested {} codes", items.len());
                Suggested {
                    items,
                    source: SuggestionSource::Model,
                }
            }
            Err(e) => {
                tracing::warn!("code suggestion falling back to keyword rules: {}", e);
                Suggested {
                    items: fallback_codes(notes),
                    source: SuggestionSource::Fallback,
                }
            }
        }
    }

    pub async fn suggest_medications(
        &self,
        notes: &str,
        current_medications: Option<&str>,
    ) -> Suggested<LineItem> {
        let request =
            GenerateRequest::text(prompts::medications_prompt(notes, current_medications));
        match self.ask(&request).await.and_then(|r| parse_medications(&r)) {
            Ok(items) => {
                tracing::info!("model suggested {} medications", items.len());
                Suggested {
                    items,
                    source: SuggestionSource::Model,
                }
            }
            Err(e) => {
                tracing::warn!("medication suggestion falling back to keyword rules: {}", e);
                Suggested {
                    items: fallback_medications(notes),
                    source: SuggestionSource::Fallback,
                }
            }
        }
    }

    /// Free-text consultation. Failures are returned to the caller.
    ///
    /// # Errors
    ///
    /// Returns the `GatewayError` from the model call.
    pub async fn consult(
        &self,
        message: &str,
        patient: &PatientContext,
        codes: &[DiagnosisCode],
    ) -> GatewayResult<String> {
        let request = GenerateRequest::text(prompts::consult_prompt(message, patient, codes));
        self.ask(&request).await.map(|r| r.trim().to_string())
    }

    /// Analyses an uploaded document. Never fails: on any model error a fixed notice is
    /// returned instead.
    pub async fn analyse_document(
        &self,
        patient: &PatientContext,
        attachment: Option<Attachment>,
    ) -> String {
        let request = GenerateRequest {
            prompt: prompts::analysis_prompt(patient, attachment.is_some()),
            attachment,
        };
        match self.ask(&request).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!("document analysis unavailable: {}", e);
                ANALYSIS_UNAVAILABLE.to_string()
            }
        }
    }

    pub async fn probe(&self) -> ProbeReport {
        let suggested = self.suggest_codes(PROBE_NOTES).await;
        ProbeReport {
            model: self.model.name().to_string(),
            connected: suggested.source == SuggestionSource::Model,
            input: PROBE_NOTES.to_string(),
            codes: suggested.items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedModel {
        reply: Option<&'static str>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn ok(reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, request: &GenerateRequest) -> GatewayResult<String> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            self.reply
                .map(str::to_string)
                .ok_or(GatewayError::EmptyReply)
        }
    }

    struct StalledModel;

    #[async_trait]
    impl GenerativeModel for StalledModel {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn generate(&self, _request: &GenerateRequest) -> GatewayResult<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("[\"A00\"]".into())
        }
    }

    fn gateway(model: Arc<dyn GenerativeModel>) -> SuggestionGateway {
        SuggestionGateway::new(model, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn model_codes_are_used_when_valid() {
        let model = ScriptedModel::ok("```json\n[\"I10 - Essential hypertension\"]\n```");
        let suggested = gateway(model.clone()).suggest_codes("high blood pressure").await;

        assert_eq!(suggested.source, SuggestionSource::Model);
        assert_eq!(suggested.items[0].as_str(), "I10");
        assert!(model.prompts.lock().unwrap()[0].contains("high blood pressure"));
    }

    #[tokio::test]
    async fn failing_model_falls_back_for_fever() {
        let suggested = gateway(ScriptedModel::failing())
            .suggest_codes("fever since Monday")
            .await;
        assert_eq!(suggested.source, SuggestionSource::Fallback);
        assert_eq!(suggested.items[0].as_str(), "R50.9");
    }

    #[tokio::test]
    async fn unparseable_medications_fall_back() {
        let suggested = gateway(ScriptedModel::ok("Sorry, I can't do that"))
            .suggest_medications("persistent cough", None)
            .await;
        assert_eq!(suggested.source, SuggestionSource::Fallback);
        assert_eq!(suggested.items.len(), 3);
    }

    #[tokio::test]
    async fn stalled_model_times_out_into_fallback() {
        let suggested = gateway(Arc::new(StalledModel)).suggest_codes("headache").await;
        assert_eq!(suggested.source, SuggestionSource::Fallback);
        assert_eq!(suggested.items[0].as_str(), "R51");
    }

    #[tokio::test]
    async fn consult_surfaces_failures() {
        let result = gateway(Arc::new(UnconfiguredModel))
            .consult("What is R69?", &PatientContext::default(), &[])
            .await;
        assert!(matches!(result, Err(GatewayError::Unconfigured)));

        let answer = gateway(ScriptedModel::ok("  R69 is unspecified illness. "))
            .consult("What is R69?", &PatientContext::default(), &[])
            .await
            .unwrap();
        assert_eq!(answer, "R69 is unspecified illness.");
    }

    #[tokio::test]
    async fn analysis_failure_returns_fixed_notice() {
        let text = gateway(ScriptedModel::failing())
            .analyse_document(&PatientContext::default(), None)
            .await;
        assert_eq!(text, ANALYSIS_UNAVAILABLE);
    }

    #[tokio::test]
    async fn probe_reports_connection_state() {
        let report = gateway(Arc::new(UnconfiguredModel)).probe().await;
        assert!(!report.connected);
        assert_eq!(report.model, "unconfigured");
        assert!(!report.codes.is_empty());

        let report = gateway(ScriptedModel::ok("[\"J06.9\"]")).probe().await;
        assert!(report.connected);
    }
}
