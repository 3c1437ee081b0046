//! Gemini `generateContent` client.

use super::model::{GenerateRequest, GenerativeModel};
use super::{GatewayError, GatewayResult};
use crate::config::GeminiSettings;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct GeminiModel {
    client: reqwest::Client,
    settings: GeminiSettings,
}

impl GeminiModel {
    /// # Errors
    ///
    /// Returns `GatewayError::Transport` if the HTTP client cannot be built.
    pub fn new(settings: GeminiSettings, timeout: Duration) -> GatewayResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.api_base, self.settings.model
        )
    }
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Inline { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct GenerateReply {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ReplyContent>,
}

#[derive(Deserialize)]
struct ReplyContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Deserialize)]
struct ReplyPart {
    text: Option<String>,
}

fn request_body(request: &GenerateRequest) -> GenerateBody<'_> {
    let mut parts = vec![Part::Text {
        text: &request.prompt,
    }];
    if let Some(attachment) = &request.attachment {
        parts.push(Part::Inline {
            inline_data: InlineData {
                mime_type: &attachment.media_type,
                data: STANDARD.encode(&attachment.data),
            },
        });
    }
    GenerateBody {
        contents: [Content {
            role: "user",
            parts,
        }],
    }
}

fn reply_text(reply: GenerateReply) -> GatewayResult<String> {
    let text: String = reply
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GatewayError::EmptyReply);
    }
    Ok(text)
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    fn name(&self) -> &str {
        &self.settings.model
    }

    async fn generate(&self, request: &GenerateRequest) -> GatewayResult<String> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        reply_text(response.json::<GenerateReply>().await?)
    }
}
