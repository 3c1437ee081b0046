use medbill_types::DiagnosisCode;

/// Patient context included in free-text prompts. Names are never sent to the model.
#[derive(Debug, Clone, Default)]
pub struct PatientContext {
    pub gender: Option<String>,
    pub clinical_notes: Option<String>,
    pub current_medications: Option<String>,
}

fn or_none(value: &Option<String>) -> &str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("Not provided")
}

pub fn codes_prompt(notes: &str) -> String {
    format!(
        "You are a medical coding assistant. Read the clinical notes below and return the \
         most relevant ICD-10 diagnosis codes.\n\n\
         Clinical notes: \"{notes}\"\n\n\
         Respond with a JSON array of at most 5 strings, each formatted as \
         \"CODE - Description\", for example [\"J06.9 - Acute upper respiratory infection\"]. \
         Return only the array."
    )
}

pub fn medications_prompt(notes: &str, current_medications: Option<&str>) -> String {
    let current = current_medications
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or("None");
    format!(
        "You are a clinical pharmacist helping prepare a bill. Suggest common medications \
         for the presentation below, avoiding duplicates of what the patient already takes.\n\n\
         Clinical notes: \"{notes}\"\n\
         Current medications: \"{current}\"\n\n\
         Respond with a JSON array of at most 5 objects of the form \
         {{\"name\": \"Drug and strength\", \"cost\": 12.50, \"purpose\": \"short reason\"}} \
         using typical US retail prices in dollars. Return only the array."
    )
}

pub fn consult_prompt(message: &str, patient: &PatientContext, codes: &[DiagnosisCode]) -> String {
    let codes = if codes.is_empty() {
        "None".to_string()
    } else {
        codes
            .iter()
            .map(DiagnosisCode::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "You are a medical billing and coding consultant answering a clinician.\n\n\
         Patient gender: {}\n\
         Clinical notes: {}\n\
         Current medications: {}\n\
         ICD-10 codes: {codes}\n\n\
         Question: {message}\n\n\
         Answer concisely and mention coding or billing considerations where relevant.",
        or_none(&patient.gender),
        or_none(&patient.clinical_notes),
        or_none(&patient.current_medications),
    )
}

pub fn analysis_prompt(patient: &PatientContext, has_attachment: bool) -> String {
    let subject = if has_attachment {
        "the attached prescription or medical document"
    } else {
        "the uploaded prescription (its contents could not be attached)"
    };
    format!(
        "Review {subject} for a billing workflow.\n\n\
         Clinical notes: {}\n\
         Current medications: {}\n\n\
         List the medications with dosages, likely ICD-10 codes, possible interactions, and \
         any billing considerations. Keep the answer short and structured.",
        or_none(&patient.clinical_notes),
        or_none(&patient.current_medications),
    )
}
