//! Billing aggregation.
//!
//! The summary is derived from line items and the code count every time it is needed and is
//! never stored, so it cannot go stale.

use crate::constants::{coding_fee_per_code, consultation_fee, max_line_item_cost};
use crate::store::LineItem;
use crate::{CoreError, CoreResult};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// A line item that cannot be billed as it stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlaggedItem {
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub per_item_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub consultation_fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub coding_fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub grand_total: Decimal,
    pub item_count: usize,
    pub code_count: usize,
    pub flagged: Vec<FlaggedItem>,
}

/// True for a cost above zero and no higher than the per-item ceiling.
fn is_billable(cost: Decimal) -> bool {
    cost > Decimal::ZERO && cost <= max_line_item_cost()
}

/// Sums line items and adds the consultation fee plus the per-code coding fee.
///
/// Items priced at zero or above [`max_line_item_cost`] are counted, contribute nothing and
/// are flagged. Bounding each summand this way keeps the arithmetic from overflowing.
pub fn compute_summary(items: &[LineItem], code_count: usize) -> BillingSummary {
    let per_item_total: Decimal = items
        .iter()
        .map(LineItem::cost)
        .filter(|cost| is_billable(*cost))
        .sum();
    let consultation_fee = consultation_fee();
    let coding_fee = coding_fee_per_code() * Decimal::from(code_count);

    let flagged = items
        .iter()
        .enumerate()
        .filter(|(_, item)| !is_billable(item.cost()))
        .map(|(index, item)| FlaggedItem {
            index,
            name: item.name().to_string(),
        })
        .collect();

    BillingSummary {
        grand_total: round_money(per_item_total + consultation_fee + coding_fee),
        per_item_total: round_money(per_item_total),
        consultation_fee,
        coding_fee,
        item_count: items.len(),
        code_count,
        flagged,
    }
}

impl BillingSummary {
    /// Checks that the bill can be finalised.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotReadyForBilling` if there are no line items or any item is
    /// flagged.
    pub fn ready_for_billing(&self) -> CoreResult<()> {
        if self.item_count == 0 {
            return Err(CoreError::NotReadyForBilling(
                "At least one medication is required".into(),
            ));
        }
        if !self.flagged.is_empty() {
            let names: Vec<String> = self
                .flagged
                .iter()
                .map(|f| {
                    if f.name.is_empty() {
                        format!("item {}", f.index + 1)
                    } else {
                        f.name.clone()
                    }
                })
                .collect();
            return Err(CoreError::NotReadyForBilling(format!(
                "Medications missing valid costs (above $0.00, at most ${}): {}",
                format_money(max_line_item_cost()),
                names.join(", ")
            )));
        }
        Ok(())
    }
}

/// Rounds to cents, halves away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Formats an amount as `0.00`.
pub fn format_money(value: Decimal) -> String {
    format!("{:.2}", round_money(value))
}
