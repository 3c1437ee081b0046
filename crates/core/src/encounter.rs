//! Patient encounters.
//!
//! An [`Encounter`] holds one visit's intake data. Once billing has started the encounter is
//! locked: clinical notes may still be corrected, every other field is frozen.

use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use medbill_types::RequiredText;
use medbill_uuid::RecordId;
use serde::Serialize;

/// Raw intake values as submitted by a client.
#[derive(Debug, Clone, Default)]
pub struct PatientIntake {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub clinical_notes: Option<String>,
    pub current_medications: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    id: RecordId,
    patient_name: RequiredText,
    gender: String,
    clinical_notes: String,
    current_medications: String,
    created_at: DateTime<Utc>,
    billing_started: bool,
}

impl Encounter {
    /// Registers a new encounter. Name, gender and clinical notes are all required.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::MissingField` naming the first missing or blank field.
    pub fn register(intake: PatientIntake) -> CoreResult<Self> {
        let patient_name = RequiredText::new("name", intake.name.as_deref())?;
        let gender = RequiredText::new("gender", intake.gender.as_deref())?;
        let notes = RequiredText::new("clinicalNotes", intake.clinical_notes.as_deref())?;

        Ok(Self {
            id: RecordId::new(),
            patient_name,
            gender: gender.into_inner(),
            clinical_notes: notes.into_inner(),
            current_medications: trimmed(intake.current_medications),
            created_at: Utc::now(),
            billing_started: false,
        })
    }

    /// Builds a transient encounter for a one-off bill. Only the patient name is required;
    /// the remaining fields render as "Not provided" when blank.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::MissingField` if the name is missing or blank.
    pub fn for_billing(intake: PatientIntake) -> CoreResult<Self> {
        let patient_name = RequiredText::new("name", intake.name.as_deref())?;
        Ok(Self {
            id: RecordId::new(),
            patient_name,
            gender: trimmed(intake.gender),
            clinical_notes: trimmed(intake.clinical_notes),
            current_medications: trimmed(intake.current_medications),
            created_at: Utc::now(),
            billing_started: false,
        })
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn patient_name(&self) -> &str {
        self.patient_name.as_str()
    }

    pub fn gender(&self) -> &str {
        &self.gender
    }

    pub fn clinical_notes(&self) -> &str {
        &self.clinical_notes
    }

    pub fn current_medications(&self) -> &str {
        &self.current_medications
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn billing_started(&self) -> bool {
        self.billing_started
    }

    /// Marks the encounter as billed. Idempotent.
    pub fn begin_billing(&mut self) {
        self.billing_started = true;
    }

    /// Replaces the clinical notes. Allowed at any time.
    pub fn update_notes(&mut self, notes: impl Into<String>) {
        self.clinical_notes = notes.into().trim().to_string();
    }

    /// Replaces the current medications text.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::BillingLocked` once billing has started.
    pub fn set_current_medications(&mut self, medications: impl Into<String>) -> CoreResult<()> {
        self.ensure_unlocked()?;
        self.current_medications = medications.into().trim().to_string();
        Ok(())
    }

    /// Renames the patient.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::BillingLocked` once billing has started, or
    /// `CoreError::MissingField` for a blank name.
    pub fn rename_patient(&mut self, name: &str) -> CoreResult<()> {
        self.ensure_unlocked()?;
        self.patient_name = RequiredText::new("name", Some(name))?;
        Ok(())
    }

    fn ensure_unlocked(&self) -> CoreResult<()> {
        if self.billing_started {
            return Err(CoreError::BillingLocked(self.id.to_string()));
        }
        Ok(())
    }
}

fn trimmed(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intake() -> PatientIntake {
        PatientIntake {
            name: Some(" Jane Roe ".into()),
            gender: Some("female".into()),
            clinical_notes: Some("Persistent cough".into()),
            current_medications: None,
        }
    }

    #[test]
    fn register_trims_and_requires_fields() {
        let encounter = Encounter::register(intake()).unwrap();
        assert_eq!(encounter.patient_name(), "Jane Roe");
        assert_eq!(encounter.current_medications(), "");
        assert!(!encounter.billing_started());

        let mut missing = intake();
        missing.gender = Some("   ".into());
        let err = Encounter::register(missing).unwrap_err();
        assert_eq!(err.to_string(), "gender is required");
    }

    #[test]
    fn for_billing_only_needs_a_name() {
        let encounter = Encounter::for_billing(PatientIntake {
            name: Some("Sam".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(encounter.gender(), "");
        assert!(Encounter::for_billing(PatientIntake::default()).is_err());
    }

    #[test]
    fn billing_locks_everything_but_notes() {
        let mut encounter = Encounter::register(intake()).unwrap();
        encounter.begin_billing();

        encounter.update_notes("Cough resolved ");
        assert_eq!(encounter.clinical_notes(), "Cough resolved");

        assert!(matches!(
            encounter.set_current_medications("Aspirin"),
            Err(CoreError::BillingLocked(_))
        ));
        assert!(matches!(
            encounter.rename_patient("Someone Else"),
            Err(CoreError::BillingLocked(_))
        ));
        assert_eq!(encounter.patient_name(), "Jane Roe");
    }

    #[test]
    fn edits_allowed_before_billing() {
        let mut encounter = Encounter::register(intake()).unwrap();
        encounter.set_current_medications("Aspirin 81mg").unwrap();
        encounter.rename_patient("Janet Roe").unwrap();
        assert_eq!(encounter.current_medications(), "Aspirin 81mg");
        assert_eq!(encounter.patient_name(), "Janet Roe");
    }
}
