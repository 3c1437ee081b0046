//! Bill rendering.
//!
//! A bill is first laid out as a [`BillDocument`], a backend-neutral list of sections. A
//! [`DocumentBackend`] turns that into bytes. The [`Renderer`] owns a primary backend (PDF)
//! and a fallback backend (plain text); when the primary fails or runs past its timeout the
//! fallback output is returned and the outcome is marked degraded.

mod layout;
mod pdf;
mod text;

pub use layout::{layout_bill, BillDocument, Block, Section};
pub use pdf::PdfBackend;
pub use text::{parse_total, TextBackend};

use crate::billing::BillingSummary;
use crate::encounter::Encounter;
use crate::store::LineItem;
use chrono::{DateTime, Utc};
use medbill_types::DiagnosisCode;
use medbill_uuid::RecordId;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("character {0:?} cannot be encoded by the document fonts")]
    Encoding(char),
    #[error("PDF generation failed: {0}")]
    Pdf(String),
    #[error("I/O error while rendering: {0}")]
    Io(#[from] std::io::Error),
    #[error("rendering exceeded {0:?}")]
    Timeout(Duration),
    #[error("render task failed: {0}")]
    Task(String),
    #[error("primary renderer failed ({primary}) and fallback failed ({fallback})")]
    Exhausted {
        primary: Box<RenderError>,
        fallback: Box<RenderError>,
    },
}

pub type RenderResult<T> = std::result::Result<T, RenderError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Text,
}

impl DocumentFormat {
    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Text => "txt",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Text => "text/plain; charset=utf-8",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Serialises a laid-out document into one output format.
pub trait DocumentBackend: Send + Sync {
    fn format(&self) -> DocumentFormat;

    fn render(&self, document: &BillDocument) -> RenderResult<Vec<u8>>;
}

/// A rendered bill. Immutable once built.
#[derive(Debug, Clone)]
pub struct Artifact {
    bytes: Vec<u8>,
    format: DocumentFormat,
    encounter_id: RecordId,
    generated_at: DateTime<Utc>,
}

impl Artifact {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn encounter_id(&self) -> RecordId {
        self.encounter_id
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }
}

#[derive(Debug)]
pub struct RenderOutcome {
    pub artifact: Artifact,
    /// Set when the fallback backend produced the artifact.
    pub degraded: bool,
}

/// Borrowed view of everything that goes on a bill.
#[derive(Debug, Clone, Copy)]
pub struct BillSnapshot<'a> {
    pub encounter: &'a Encounter,
    pub items: &'a [LineItem],
    pub codes: &'a [DiagnosisCode],
    pub ai_notes: Option<&'a str>,
    pub summary: &'a BillingSummary,
}

#[derive(Clone)]
pub struct Renderer {
    primary: Arc<dyn DocumentBackend>,
    fallback: Arc<dyn DocumentBackend>,
    timeout: Duration,
}

impl Renderer {
    pub fn new(
        primary: Arc<dyn DocumentBackend>,
        fallback: Arc<dyn DocumentBackend>,
        timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            timeout,
        }
    }

    /// PDF first, plain text as fallback.
    pub fn standard(timeout: Duration) -> Self {
        Self::new(
            Arc::new(PdfBackend::default()),
            Arc::new(TextBackend::default()),
            timeout,
        )
    }

    /// Renders the primary format on the blocking pool under the configured timeout,
    /// falling back to the secondary backend on error or timeout.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Exhausted` if both backends fail.
    pub async fn render(&self, snapshot: BillSnapshot<'_>) -> RenderResult<RenderOutcome> {
        let generated_at = Utc::now();
        let document = Arc::new(layout_bill(&snapshot, generated_at));

        let backend = Arc::clone(&self.primary);
        let doc = Arc::clone(&document);
        let task = tokio::task::spawn_blocking(move || backend.render(&doc));

        let primary = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(RenderError::Task(join.to_string())),
            Err(_) => Err(RenderError::Timeout(self.timeout)),
        };

        self.finish(snapshot.encounter.id(), generated_at, &document, primary)
    }

    fn finish(
        &self,
        encounter_id: RecordId,
        generated_at: DateTime<Utc>,
        document: &BillDocument,
        primary: RenderResult<Vec<u8>>,
    ) -> RenderResult<RenderOutcome> {
        let (bytes, format, degraded) = match primary {
            Ok(bytes) => (bytes, self.primary.format(), false),
            Err(primary_err) => {
                tracing::warn!(
                    "{} rendering failed for encounter {}: {}; using {} fallback",
                    self.primary.format(),
                    encounter_id,
                    primary_err,
                    self.fallback.format()
                );
                match self.fallback.render(document) {
                    Ok(bytes) => (bytes, self.fallback.format(), true),
                    Err(fallback_err) => {
                        return Err(RenderError::Exhausted {
                            primary: Box::new(primary_err),
                            fallback: Box::new(fallback_err),
                        })
                    }
                }
            }
        };

        Ok(RenderOutcome {
            artifact: Artifact {
                bytes,
                format,
                encounter_id,
                generated_at,
            },
            degraded,
        })
    }
}
