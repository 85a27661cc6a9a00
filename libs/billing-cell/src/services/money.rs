use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Rounds to cents, half away from zero, and pins the scale at two places so
/// `50` and `50.000` both print as `50.00`.
pub fn round_currency(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Largest amount an invoice column can hold, `numeric(12, 2)` in the schema.
pub const MAX_INVOICE_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

impl InvoiceTotals {
    /// subtotal and tax are rounded independently; total is their exact sum.
    /// `None` when any step overflows or the total does not fit an invoice column.
    pub fn compute<'a>(amounts: impl IntoIterator<Item = &'a Decimal>, tax_rate: Decimal) -> Option<Self> {
        let sum = amounts
            .into_iter()
            .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(*amount))?;
        let subtotal = round_currency(sum);
        let tax = round_currency(subtotal.checked_mul(tax_rate)?);
        let total = subtotal.checked_add(tax)?;
        if total > MAX_INVOICE_AMOUNT {
            return None;
        }
        Some(Self { subtotal, tax, total })
    }
}
