//! Code/medication store for one encounter.
//!
//! Diagnosis codes keep insertion order and are deduplicated by exact string match. Line
//! items keep whatever order they were added in; zero-cost items are allowed here and only
//! rejected when a bill is generated.

use crate::billing::{compute_summary, BillingSummary};
use crate::{CoreError, CoreResult};
use medbill_types::DiagnosisCode;
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

/// A priced billing line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    name: String,
    #[serde(with = "rust_decimal::serde::float")]
    cost: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    purpose: Option<String>,
}

impl LineItem {
    /// Creates a line item. Negative costs are clamped to zero.
    pub fn new(name: impl Into<String>, cost: Decimal) -> Self {
        Self {
            name: name.into().trim().to_string(),
            cost: cost.max(Decimal::ZERO),
            purpose: None,
        }
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        let purpose = purpose.into().trim().to_string();
        self.purpose = (!purpose.is_empty()).then_some(purpose);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cost(&self) -> Decimal {
        self.cost
    }

    pub fn purpose(&self) -> Option<&str> {
        self.purpose.as_deref()
    }
}

/// Coerces a loosely typed cost into a non-negative decimal.
///
/// Numbers and numeric strings are accepted; a leading `$` and surrounding whitespace are
/// ignored. Anything else, including negative values, becomes zero.
pub fn coerce_cost(value: &serde_json::Value) -> Decimal {
    let parsed = match value {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        serde_json::Value::String(s) => {
            let s = s.trim();
            Decimal::from_str(s.strip_prefix('$').unwrap_or(s).trim()).ok()
        }
        _ => None,
    };
    parsed
        .filter(|d| d.is_sign_positive())
        .unwrap_or(Decimal::ZERO)
}

#[derive(Debug, Clone, Default)]
pub struct CodeStore {
    codes: Vec<DiagnosisCode>,
    items: Vec<LineItem>,
}

impl CodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and adds a code token. Returns `false` if the code was already present.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidCode` if `token` is not ICD-10 shaped.
    pub fn add_code(&mut self, token: &str) -> CoreResult<bool> {
        let code = DiagnosisCode::parse(token)?;
        Ok(self.insert_code(code))
    }

    /// Adds an already validated code. Returns `false` for a duplicate.
    pub fn insert_code(&mut self, code: DiagnosisCode) -> bool {
        if self.codes.contains(&code) {
            return false;
        }
        self.codes.push(code);
        true
    }

    /// # Errors
    ///
    /// Returns `CoreError::IndexOutOfRange` and leaves the store untouched if `index` is
    /// past the end.
    pub fn remove_code(&mut self, index: usize) -> CoreResult<DiagnosisCode> {
        if index >= self.codes.len() {
            return Err(CoreError::IndexOutOfRange {
                kind: "code",
                index,
                len: self.codes.len(),
            });
        }
        Ok(self.codes.remove(index))
    }

    pub fn add_line_item(&mut self, item: LineItem) {
        self.items.push(item);
    }

    /// # Errors
    ///
    /// Returns `CoreError::IndexOutOfRange` and leaves the store untouched if `index` is
    /// past the end.
    pub fn remove_line_item(&mut self, index: usize) -> CoreResult<LineItem> {
        if index >= self.items.len() {
            return Err(CoreError::IndexOutOfRange {
                kind: "line item",
                index,
                len: self.items.len(),
            });
        }
        Ok(self.items.remove(index))
    }

    /// Replaces both lists, deduplicating the incoming codes.
    pub fn replace_all(
        &mut self,
        codes: impl IntoIterator<Item = DiagnosisCode>,
        items: impl IntoIterator<Item = LineItem>,
    ) {
        self.codes.clear();
        for code in codes {
            self.insert_code(code);
        }
        self.items = items.into_iter().collect();
    }

    pub fn codes(&self) -> &[DiagnosisCode] {
        &self.codes
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.items
    }

    /// Recomputes the billing summary from the current contents.
    pub fn summary(&self) -> BillingSummary {
        compute_summary(&self.items, self.codes.len())
    }
}
