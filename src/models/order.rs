use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::pricing::PricingResult;

/// Fulfillment ladder for an order. `Completed` and `Cancelled` are
/// terminal; every other state may advance or be cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum OrderStatus {
    Pending,
    Approved,
    #[strum(serialize = "On Route")]
    OnRoute,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// An order as persisted by the engine: who bought, what it cost after
/// discounting, and where it stands in fulfillment. Line-item detail stays
/// with the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub pricing: PricingResult,
    pub currency: String,
    pub coupon_code: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        customer_id: Uuid,
        pricing: PricingResult,
        currency: impl Into<String>,
        coupon_code: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            customer_id,
            pricing,
            currency: currency.into(),
            coupon_code,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_route_displays_with_space() {
        assert_eq!(OrderStatus::OnRoute.to_string(), "On Route");
    }

    #[test]
    fn terminal_states() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::OnRoute.is_terminal());
    }
}
