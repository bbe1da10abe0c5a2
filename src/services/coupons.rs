use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::errors::ServiceError;
use crate::models::{Coupon, DiscountKind};
use crate::store::CouponStore;

/// Computes the raw discount a coupon grants on `subtotal`, without any
/// validity gate. Percentage discounts round to the currency's minor-unit
/// precision (2 decimal places), round-half-up; the result is clamped so
/// it can never exceed the subtotal.
pub fn discount_for(coupon: &Coupon, subtotal: Decimal) -> Decimal {
    let discount = match coupon.kind {
        DiscountKind::Percentage => (subtotal * coupon.amount / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        DiscountKind::Flat => coupon.amount,
    };
    discount.min(subtotal)
}

/// Validity-gated discount computation. Fails with
/// [`ServiceError::InvalidCoupon`] rather than silently discounting with
/// an expired or exhausted coupon. Never mutates the coupon; redemption is
/// a separate operation.
pub fn apply_discount(
    coupon: &Coupon,
    subtotal: Decimal,
    as_of: NaiveDate,
) -> Result<Decimal, ServiceError> {
    if !coupon.is_valid(as_of) {
        return Err(ServiceError::InvalidCoupon(format!(
            "coupon {} is expired or exhausted",
            coupon.code
        )));
    }
    Ok(discount_for(coupon, subtotal))
}

/// Result of previewing a coupon against a cart subtotal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiscountPreview {
    pub code: String,
    pub discount: Decimal,
    pub discounted_total: Decimal,
    /// Uses left on the code at preview time; redeeming consumes one.
    pub remaining_uses: u32,
}

/// Coupon lookup, preview, and redemption against the coupon store.
#[derive(Clone)]
pub struct CouponService {
    store: Arc<dyn CouponStore>,
}

impl CouponService {
    pub fn new(store: Arc<dyn CouponStore>) -> Self {
        Self { store }
    }

    /// Registers a new coupon. Fails with [`ServiceError::Conflict`] when
    /// the code is already taken.
    #[instrument(skip(self, coupon), fields(code = %coupon.code))]
    pub async fn register(&self, coupon: Coupon) -> Result<(), ServiceError> {
        self.store.insert(coupon).await
    }

    /// Computes what a coupon would take off `subtotal` without consuming
    /// a use. This is the cart-view path; placing the order redeems.
    #[instrument(skip(self))]
    pub async fn preview(
        &self,
        code: &str,
        subtotal: Decimal,
        as_of: NaiveDate,
    ) -> Result<DiscountPreview, ServiceError> {
        let coupon = self
            .store
            .find_by_code(code)
            .await?
            .ok_or_else(|| ServiceError::InvalidCoupon(format!("coupon {} not found", code)))?;

        let discount = apply_discount(&coupon, subtotal, as_of)?;
        debug!(%code, %discount, "coupon preview computed");
        Ok(DiscountPreview {
            remaining_uses: coupon.remaining_uses(),
            code: coupon.code,
            discount,
            discounted_total: subtotal - discount,
        })
    }

    /// Consumes one use of the coupon, atomically. Called exactly once per
    /// committed order placement that carries the code.
    #[instrument(skip(self))]
    pub async fn redeem(&self, code: &str, as_of: NaiveDate) -> Result<Coupon, ServiceError> {
        let coupon = self.store.try_redeem(code, as_of).await?;
        debug!(%code, times_used = coupon.times_used, "coupon redeemed");
        Ok(coupon)
    }

    /// Returns a use consumed by [`CouponService::redeem`] when the order
    /// it belonged to could not be committed.
    #[instrument(skip(self))]
    pub async fn release(&self, code: &str) -> Result<(), ServiceError> {
        warn!(%code, "releasing coupon redemption after failed placement");
        self.store.release(code).await
    }
}
