use super::gemini::GeminiModel;
use super::{GatewayError, GatewayResult};
use crate::config::GeminiSettings;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Inline file sent alongside a prompt.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub media_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub attachment: Option<Attachment>,
}

impl GenerateRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            attachment: None,
        }
    }
}

/// A text-generation backend.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Model identifier, for logs and status reports.
    fn name(&self) -> &str;

    /// Sends one prompt and returns the raw reply text.
    async fn generate(&self, request: &GenerateRequest) -> GatewayResult<String>;
}

/// Stand-in used when no API key is configured. Every call fails, so callers take their
/// fallback paths.
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredModel;

#[async_trait]
impl GenerativeModel for UnconfiguredModel {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn generate(&self, _request: &GenerateRequest) -> GatewayResult<String> {
        Err(GatewayError::Unconfigured)
    }
}

/// Picks the model implementation for the given settings.
///
/// # Errors
///
/// Returns `GatewayError::Transport` if the HTTP client cannot be built.
pub fn create_model(
    settings: Option<&GeminiSettings>,
    timeout: Duration,
) -> GatewayResult<Arc<dyn GenerativeModel>> {
    match settings {
        Some(settings) => Ok(Arc::new(GeminiModel::new(settings.clone(), timeout)?)),
        None => {
            tracing::warn!("GEMINI_API_KEY not set; suggestions will use keyword rules");
            Ok(Arc::new(UnconfiguredModel))
        }
    }
}
