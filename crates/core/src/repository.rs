//! Process-lifetime record repository.
//!
//! Holds registered encounters, prescription uploads and generated bills in memory. One
//! instance is created at startup and shared through the router state.

use crate::encounter::Encounter;
use crate::render::DocumentFormat;
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use medbill_files::StoredArtifact;
use medbill_uuid::RecordId;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionRecord {
    pub id: RecordId,
    pub patient_id: Option<String>,
    pub original_name: String,
    pub artifact: StoredArtifact,
    pub analysis: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillRecord {
    pub id: RecordId,
    pub encounter_id: RecordId,
    pub patient_name: String,
    pub artifact: StoredArtifact,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub format: DocumentFormat,
    pub degraded: bool,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct RecordRepository {
    encounters: RwLock<Vec<Encounter>>,
    prescriptions: RwLock<Vec<PrescriptionRecord>>,
    bills: RwLock<Vec<BillRecord>>,
}

// Every write is a single push or element replacement, so poisoned data is still whole.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl RecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_encounter(&self, encounter: Encounter) -> Encounter {
        tracing::info!("registered encounter {}", encounter.id());
        write(&self.encounters).push(encounter.clone());
        encounter
    }

    pub fn list_encounters(&self) -> Vec<Encounter> {
        read(&self.encounters).clone()
    }

    pub fn find_encounter(&self, id: RecordId) -> Option<Encounter> {
        read(&self.encounters).iter().find(|e| e.id() == id).cloned()
    }

    /// Applies `change` to a stored encounter and returns the updated copy.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` for an unknown id, or whatever `change` returns. A
    /// failed change leaves the stored encounter untouched.
    pub fn update_encounter<F>(&self, id: RecordId, change: F) -> CoreResult<Encounter>
    where
        F: FnOnce(&mut Encounter) -> CoreResult<()>,
    {
        let mut encounters = write(&self.encounters);
        let stored = encounters
            .iter_mut()
            .find(|e| e.id() == id)
            .ok_or_else(|| CoreError::NotFound(format!("patient {id}")))?;

        let mut updated = stored.clone();
        change(&mut updated)?;
        *stored = updated.clone();
        Ok(updated)
    }

    pub fn record_prescription(&self, record: PrescriptionRecord) {
        tracing::info!("recorded prescription upload {}", record.id);
        write(&self.prescriptions).push(record);
    }

    pub fn list_prescriptions(&self) -> Vec<PrescriptionRecord> {
        read(&self.prescriptions).clone()
    }

    pub fn record_bill(&self, record: BillRecord) {
        tracing::info!(
            "recorded bill {} for encounter {}",
            record.id,
            record.encounter_id
        );
        write(&self.bills).push(record);
    }

    pub fn list_bills(&self) -> Vec<BillRecord> {
        read(&self.bills).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encounter::PatientIntake;

    fn encounter() -> Encounter {
        Encounter::register(PatientIntake {
            name: Some("Jane Roe".into()),
            gender: Some("female".into()),
            clinical_notes: Some("cough".into()),
            current_medications: None,
        })
        .unwrap()
    }

    #[test]
    fn save_list_and_find() {
        let repo = RecordRepository::new();
        let saved = repo.save_encounter(encounter());

        assert_eq!(repo.list_encounters().len(), 1);
        assert_eq!(
            repo.find_encounter(saved.id()).unwrap().patient_name(),
            "Jane Roe"
        );
        assert!(repo.find_encounter(RecordId::new()).is_none());
    }

    #[test]
    fn failed_update_leaves_record_untouched() {
        let repo = RecordRepository::new();
        let id = repo.save_encounter(encounter()).id();

        repo.update_encounter(id, |e| {
            e.begin_billing();
            Ok(())
        })
        .unwrap();

        let result = repo.update_encounter(id, |e| {
            e.update_notes("changed");
            e.set_current_medications("Aspirin")
        });
        assert!(matches!(result, Err(CoreError::BillingLocked(_))));
        assert_eq!(repo.find_encounter(id).unwrap().clinical_notes(), "cough");
    }

    #[test]
    fn update_unknown_is_not_found() {
        let repo = RecordRepository::new();
        let result = repo.update_encounter(RecordId::new(), |_| Ok(()));
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }
}
