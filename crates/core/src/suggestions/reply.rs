//! Parsing of model replies.
//!
//! Models are asked for bare JSON arrays but often wrap them in Markdown code fences or add
//! a sentence around them. Parsing is tolerant of that framing and strict about content: an
//! array that yields nothing usable is an error, so the caller falls back.

use super::{GatewayError, GatewayResult};
use crate::constants::MAX_SUGGESTED_CODES;
use crate::store::{coerce_cost, LineItem};
use medbill_types::DiagnosisCode;
use serde::Deserialize;

/// Removes code fences and any prose outside the outermost JSON array.
pub fn strip_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    match (trimmed.find('['), trimmed.rfind(']')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CodeEntry {
    Labelled(String),
    Object { code: String },
}

pub fn parse_codes(reply: &str) -> GatewayResult<Vec<DiagnosisCode>> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(strip_fences(reply))
        .map_err(|e| GatewayError::MalformedReply(e.to_string()))?;

    let mut codes: Vec<DiagnosisCode> = Vec::new();
    for entry in entries {
        let Ok(entry) = serde_json::from_value::<CodeEntry>(entry) else {
            continue;
        };
        let raw = match entry {
            CodeEntry::Labelled(s) | CodeEntry::Object { code: s } => s,
        };
        match DiagnosisCode::from_labelled(&raw) {
            Ok(code) if !codes.contains(&code) => codes.push(code),
            Ok(_) => {}
            Err(e) => tracing::debug!("discarding model code: {}", e),
        }
        if codes.len() == MAX_SUGGESTED_CODES {
            break;
        }
    }

    if codes.is_empty() {
        return Err(GatewayError::MalformedReply(
            "reply contained no valid ICD-10 codes".into(),
        ));
    }
    Ok(codes)
}

#[derive(Deserialize)]
struct MedicationEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    cost: serde_json::Value,
    #[serde(default)]
    purpose: Option<String>,
}

pub fn parse_medications(reply: &str) -> GatewayResult<Vec<LineItem>> {
    let deserializer = &mut serde_json::Deserializer::from_str(strip_fences(reply));
    let entries: Vec<MedicationEntry> = serde_path_to_error::deserialize(deserializer)
        .map_err(|e| GatewayError::MalformedReply(format!("{} at {}", e.inner(), e.path())))?;

    let items: Vec<LineItem> = entries
        .into_iter()
        .filter(|m| !m.name.trim().is_empty())
        .map(|m| {
            let item = LineItem::new(m.name, coerce_cost(&m.cost));
            match m.purpose {
                Some(purpose) => item.with_purpose(purpose),
                None => item,
            }
        })
        .collect();

    if items.is_empty() {
        return Err(GatewayError::MalformedReply(
            "reply contained no named medications".into(),
        ));
    }
    Ok(items)
}
