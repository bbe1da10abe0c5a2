//! Pure pricing arithmetic over cart line items.
//!
//! Everything here is side-effect free and works in fixed-point decimal;
//! binary floating point never touches a money value.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::errors::ServiceError;
use crate::models::{Coupon, LineItem, PricingResult};

use super::coupons;

/// Sums the line totals of `items`. An empty slice prices to zero; whether
/// an empty cart is acceptable is the caller's policy.
pub fn compute_subtotal(items: &[LineItem]) -> Decimal {
    items.iter().map(LineItem::line_total).sum()
}

/// Prices a cart end to end: validates every item, sums the subtotal, and
/// applies at most one coupon discount. The coupon is only read; redeeming
/// it is a separate, explicit operation at order commit.
pub fn price_cart(
    items: &[LineItem],
    coupon: Option<&Coupon>,
    as_of: NaiveDate,
) -> Result<PricingResult, ServiceError> {
    for item in items {
        item.validate()?;
    }
    let subtotal = compute_subtotal(items);
    match coupon {
        Some(coupon) => {
            let discount = coupons::apply_discount(coupon, subtotal, as_of)?;
            Ok(PricingResult::new(subtotal, discount))
        }
        None => Ok(PricingResult::undiscounted(subtotal)),
    }
}
