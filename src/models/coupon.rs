use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// How a coupon's `amount` is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `amount` is subtracted from the subtotal as-is, in currency units.
    Flat,
    /// `amount` is a percentage of the subtotal.
    Percentage,
}

impl FromStr for DiscountKind {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(Self::Flat),
            "percentage" => Ok(Self::Percentage),
            other => Err(ServiceError::UnsupportedDiscountKind(other.to_string())),
        }
    }
}

/// A discount code bounded by an expiry date and a usage cap.
///
/// `times_used <= usage_limit` holds at all times; the increment happens
/// only through the store's atomic redeem so concurrent redemptions can
/// never push past the cap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    pub kind: DiscountKind,
    pub amount: Decimal,
    pub expiry_date: NaiveDate,
    pub usage_limit: u32,
    pub times_used: u32,
}

impl Coupon {
    pub fn new(
        code: impl Into<String>,
        kind: DiscountKind,
        amount: Decimal,
        expiry_date: NaiveDate,
        usage_limit: u32,
    ) -> Result<Self, ServiceError> {
        if amount.is_sign_negative() {
            return Err(ServiceError::ValidationError(
                "coupon amount must not be negative".to_string(),
            ));
        }
        if usage_limit == 0 {
            return Err(ServiceError::ValidationError(
                "coupon usage limit must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            code: code.into(),
            kind,
            amount,
            expiry_date,
            usage_limit,
            times_used: 0,
        })
    }

    /// A coupon is usable iff it has not expired and is under its usage
    /// cap. Both conditions are necessary; there is no partial validity.
    pub fn is_valid(&self, as_of: NaiveDate) -> bool {
        self.expiry_date >= as_of && self.times_used < self.usage_limit
    }

    pub fn remaining_uses(&self) -> u32 {
        self.usage_limit.saturating_sub(self.times_used)
    }
}
