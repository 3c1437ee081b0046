//! Request input validation.
//!
//! These checks run before any model call, render or disk write so that bad input is
//! rejected with a validation error and no side effects.

use crate::constants::{ALLOWED_UPLOAD_TYPES, MIN_SUGGESTION_NOTES_LEN};
use crate::{CoreError, CoreResult};
use medbill_types::DiagnosisCode;

/// Returns the trimmed notes if they are long enough to suggest codes from.
///
/// # Errors
///
/// Returns `CoreError::InvalidInput` if the notes are missing or shorter than the minimum.
pub fn validate_suggestion_notes(notes: Option<&str>) -> CoreResult<&str> {
    let notes = notes.map(str::trim).unwrap_or_default();
    if notes.chars().count() < MIN_SUGGESTION_NOTES_LEN {
        return Err(CoreError::InvalidInput(format!(
            "Clinical notes must be at least {MIN_SUGGESTION_NOTES_LEN} characters long"
        )));
    }
    Ok(notes)
}

/// Returns the trimmed value, or an error naming `field` if it is missing or blank.
///
/// # Errors
///
/// Returns `CoreError::InvalidInput` for a missing or blank value.
pub fn require_text<'a>(field: &str, value: Option<&'a str>) -> CoreResult<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(CoreError::InvalidInput(format!("{field} is required"))),
    }
}

/// Parses every code, accepting labelled forms such as `"I10 - Essential hypertension"`.
///
/// # Errors
///
/// Returns `CoreError::InvalidCode` for the first malformed entry.
pub fn parse_code_list<S: AsRef<str>>(codes: &[S]) -> CoreResult<Vec<DiagnosisCode>> {
    codes
        .iter()
        .map(|c| DiagnosisCode::from_labelled(c.as_ref()).map_err(CoreError::from))
        .collect()
}

/// Checks an upload's declared media type and size.
///
/// # Errors
///
/// Returns `CoreError::InvalidInput` for an unsupported media type and
/// `CoreError::PayloadTooLarge` for an oversize file.
pub fn validate_upload(media_type: &str, size: usize, limit: usize) -> CoreResult<()> {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if !ALLOWED_UPLOAD_TYPES.contains(&essence.as_str()) {
        return Err(CoreError::InvalidInput(format!(
            "Invalid file type '{media_type}'. Only PDF, images and text files are allowed."
        )));
    }
    if size > limit {
        return Err(CoreError::PayloadTooLarge { size, limit });
    }
    Ok(())
}
