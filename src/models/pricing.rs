use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome of a pricing pass. Derived, never stored on its own.
///
/// Invariants: `0 <= discount <= subtotal` and `total = subtotal - discount`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl PricingResult {
    /// Builds a result from a subtotal and a raw discount, clamping the
    /// discount so the total can never go negative.
    pub fn new(subtotal: Decimal, discount: Decimal) -> Self {
        let discount = discount.max(Decimal::ZERO).min(subtotal);
        Self {
            subtotal,
            discount,
            total: subtotal - discount,
        }
    }

    pub fn undiscounted(subtotal: Decimal) -> Self {
        Self::new(subtotal, Decimal::ZERO)
    }
}
