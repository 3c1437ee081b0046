//! Bill generation: validate, total, render, store.

use crate::billing::BillingSummary;
use crate::encounter::Encounter;
use crate::render::{BillSnapshot, Renderer};
use crate::repository::BillRecord;
use crate::store::CodeStore;
use crate::CoreResult;
use medbill_files::{ArtifactName, ArtifactStore};
use medbill_uuid::RecordId;
use rust_decimal::Decimal;

/// Everything needed to produce one bill.
#[derive(Debug, Clone)]
pub struct BillRequest {
    pub encounter: Encounter,
    pub store: CodeStore,
    pub ai_notes: Option<String>,
    /// Total as computed by the client. Informational only.
    pub client_total: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct GeneratedBill {
    pub record: BillRecord,
    pub summary: BillingSummary,
}

#[derive(Clone)]
pub struct BillService {
    renderer: Renderer,
    artifacts: ArtifactStore,
}

impl BillService {
    pub fn new(renderer: Renderer, artifacts: ArtifactStore) -> Self {
        Self {
            renderer,
            artifacts,
        }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Generates and stores a bill.
    ///
    /// The total is recomputed from the request's line items and codes; `client_total` is
    /// only compared and logged. Nothing is written unless the summary is billable and a
    /// backend rendered it.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotReadyForBilling` for an empty or unpriced item list,
    /// `CoreError::Render` if both backends fail, or `CoreError::Storage` if the artifact
    /// cannot be written.
    pub async fn generate(&self, request: BillRequest) -> CoreResult<GeneratedBill> {
        let summary = request.store.summary();
        summary.ready_for_billing()?;

        if let Some(warning) = stale_total_warning(request.client_total, &summary) {
            tracing::warn!("encounter {}: {}", request.encounter.id(), warning);
        }

        let outcome = self
            .renderer
            .render(BillSnapshot {
                encounter: &request.encounter,
                items: request.store.line_items(),
                codes: request.store.codes(),
                ai_notes: request.ai_notes.as_deref(),
                summary: &summary,
            })
            .await?;

        let artifact = outcome.artifact;
        let name = ArtifactName::generate(
            "bill",
            artifact.format().extension(),
            artifact.generated_at(),
        )?;
        let stored = self.artifacts.write_once(&name, artifact.bytes())?;

        tracing::info!(
            "generated {} bill {} for encounter {} (degraded: {})",
            artifact.format(),
            stored.name,
            artifact.encounter_id(),
            outcome.degraded
        );

        Ok(GeneratedBill {
            record: BillRecord {
                id: RecordId::new(),
                encounter_id: artifact.encounter_id(),
                patient_name: request.encounter.patient_name().to_string(),
                artifact: stored,
                total: summary.grand_total,
                format: artifact.format(),
                degraded: outcome.degraded,
                generated_at: artifact.generated_at(),
            },
            summary,
        })
    }
}

/// Describes a client total that disagrees with the recomputed one. The client value is
/// never used.
fn stale_total_warning(client_total: Option<Decimal>, summary: &BillingSummary) -> Option<String> {
    let client_total = client_total?;
    (client_total != summary.grand_total).then(|| {
        format!(
            "stale client total {} ignored; server total is {}",
            client_total, summary.grand_total
        )
    })
}
