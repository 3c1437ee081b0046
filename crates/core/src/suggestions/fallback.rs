//! Offline keyword rules used whenever the model cannot answer.

use crate::store::LineItem;
use medbill_types::DiagnosisCode;
use rust_decimal::Decimal;

/// Code assigned when no keyword matches.
const UNSPECIFIED_CODE: &str = "R69";

struct CodeRule {
    keywords: &'static [&'static str],
    code: &'static str,
}

const CODE_RULES: &[CodeRule] = &[
    CodeRule {
        keywords: &["respiratory", "cough", "cold"],
        code: "J06.9",
    },
    CodeRule {
        keywords: &["fever"],
        code: "R50.9",
    },
    CodeRule {
        keywords: &["hypertension", "blood pressure"],
        code: "I10",
    },
    CodeRule {
        keywords: &["diabetes"],
        code: "E11.9",
    },
    CodeRule {
        keywords: &["headache"],
        code: "R51",
    },
    CodeRule {
        keywords: &["pain"],
        code: "R52",
    },
];

/// Matches when every group has at least one keyword present.
struct MedicationRule {
    all_of: &'static [&'static [&'static str]],
    medications: &'static [(&'static str, i64, &'static str)],
}

const MEDICATION_RULES: &[MedicationRule] = &[
    MedicationRule {
        all_of: &[&["respiratory", "cough", "cold"]],
        medications: &[
            ("Acetaminophen 500mg", 1500, "Fever and pain relief"),
            ("Dextromethorphan 15mg", 1250, "Cough suppressant"),
            ("Guaifenesin 400mg", 1800, "Expectorant"),
        ],
    },
    MedicationRule {
        all_of: &[&["hypertension"]],
        medications: &[("Lisinopril 10mg", 2200, "Blood pressure control")],
    },
    MedicationRule {
        all_of: &[&["infection"], &["bacterial"]],
        medications: &[("Amoxicillin 500mg", 3500, "Bacterial infection")],
    },
];

fn mentions(notes: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| notes.contains(k))
}

/// Keyword-matched codes in rule order, never empty.
pub fn fallback_codes(notes: &str) -> Vec<DiagnosisCode> {
    let notes = notes.to_lowercase();
    let mut codes: Vec<DiagnosisCode> = Vec::new();

    for rule in CODE_RULES {
        if mentions(&notes, rule.keywords) {
            if let Ok(code) = DiagnosisCode::parse(rule.code) {
                if !codes.contains(&code) {
                    codes.push(code);
                }
            }
        }
    }

    if codes.is_empty() {
        codes.extend(DiagnosisCode::parse(UNSPECIFIED_CODE).ok());
    }
    codes
}

/// Keyword-matched medications with list prices. May be empty.
pub fn fallback_medications(notes: &str) -> Vec<LineItem> {
    let notes = notes.to_lowercase();
    MEDICATION_RULES
        .iter()
        .filter(|rule| rule.all_of.iter().all(|group| mentions(&notes, group)))
        .flat_map(|rule| rule.medications.iter())
        .map(|(name, cents, purpose)| {
            LineItem::new(*name, Decimal::new(*cents, 2)).with_purpose(*purpose)
        })
        .collect()
}
