use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// A single cart or prescription line as seen by a pricing pass.
///
/// Immutable once constructed; the engine never persists line items itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub unit_price: Decimal,
    /// Surcharge added by the selected product attribute, zero when the
    /// item has no attribute selected.
    #[serde(default)]
    pub attribute_surcharge: Decimal,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(
        unit_price: Decimal,
        attribute_surcharge: Decimal,
        quantity: u32,
    ) -> Result<Self, ServiceError> {
        let item = Self {
            unit_price,
            attribute_surcharge,
            quantity,
        };
        item.validate()?;
        Ok(item)
    }

    /// Shorthand for an item without an attribute surcharge.
    pub fn priced(unit_price: Decimal, quantity: u32) -> Result<Self, ServiceError> {
        Self::new(unit_price, Decimal::ZERO, quantity)
    }

    /// Checks the construction invariants. Items arriving through serde
    /// bypass [`LineItem::new`], so pricing re-validates before summing.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.quantity == 0 {
            return Err(ServiceError::ValidationError(
                "line item quantity must be at least 1".to_string(),
            ));
        }
        if self.unit_price.is_sign_negative() || self.attribute_surcharge.is_sign_negative() {
            return Err(ServiceError::ValidationError(
                "line item amounts must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn effective_unit_price(&self) -> Decimal {
        self.unit_price + self.attribute_surcharge
    }

    pub fn line_total(&self) -> Decimal {
        self.effective_unit_price() * Decimal::from(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn line_total_includes_surcharge() {
        let item = LineItem::new(dec!(10.00), dec!(1.50), 3).unwrap();
        assert_eq!(item.line_total(), dec!(34.50));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        assert!(LineItem::priced(dec!(5.00), 0).is_err());
    }

    #[test]
    fn negative_price_is_rejected() {
        assert!(LineItem::priced(dec!(-1.00), 1).is_err());
    }
}
