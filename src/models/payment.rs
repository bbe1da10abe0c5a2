use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Settlement state of a payment. `Completed` and `Failed` are terminal;
/// no transition leaves a terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// How a payment is funded, carrying only the fields relevant to each
/// method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery; settled manually at fulfillment confirmation.
    Cod,
    /// Debited from the customer's stored wallet balance.
    Wallet { customer_id: Uuid },
    /// External payment gateway order awaiting a signed callback.
    Gateway { gateway_order_ref: String },
}

impl PaymentMethod {
    pub fn kind(&self) -> PaymentMethodKind {
        match self {
            Self::Cod => PaymentMethodKind::Cod,
            Self::Wallet { .. } => PaymentMethodKind::Wallet,
            Self::Gateway { .. } => PaymentMethodKind::Gateway,
        }
    }
}

/// Discriminant-only view of [`PaymentMethod`], used where the caller
/// selects a method before any payload exists (requests, config toggles).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
    Cod,
    Wallet,
    Gateway,
}

/// A payment record owned by an order. Created once at `Pending` and
/// mutated exactly once into a terminal state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// Gateway payment reference captured from the verified callback;
    /// `None` for COD and wallet payments.
    pub external_reference: Option<String>,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn new(order_id: Uuid, method: PaymentMethod, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            method,
            status: PaymentStatus::Pending,
            external_reference: None,
            amount,
            created_at: Utc::now(),
            settled_at: None,
        }
    }

    /// Moves the payment into a terminal state. Fails with
    /// [`ServiceError::AlreadySettled`] when the payment is already
    /// terminal, leaving it unchanged.
    pub fn transition(&mut self, to: PaymentStatus, at: DateTime<Utc>) -> Result<(), ServiceError> {
        if self.status.is_terminal() {
            return Err(ServiceError::AlreadySettled(self.id));
        }
        if to == PaymentStatus::Pending {
            return Err(ServiceError::InvalidStatus(
                "payment cannot transition back to Pending".to_string(),
            ));
        }
        self.status = to;
        self.settled_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn terminal_payment_rejects_further_transitions() {
        let mut payment = Payment::new(Uuid::new_v4(), PaymentMethod::Cod, dec!(10.00));
        payment
            .transition(PaymentStatus::Completed, Utc::now())
            .unwrap();

        let err = payment
            .transition(PaymentStatus::Failed, Utc::now())
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadySettled(id) if id == payment.id));
        assert_eq!(payment.status, PaymentStatus::Completed);
    }

    #[test]
    fn pending_is_not_a_transition_target() {
        let mut payment = Payment::new(Uuid::new_v4(), PaymentMethod::Cod, dec!(10.00));
        assert!(payment
            .transition(PaymentStatus::Pending, Utc::now())
            .is_err());
    }

    #[test]
    fn method_serializes_with_an_internal_tag() {
        let method = PaymentMethod::Wallet {
            customer_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&method).unwrap();
        assert_eq!(json["method"], "wallet");
        assert_eq!(json["customer_id"], "00000000-0000-0000-0000-000000000000");

        let json = serde_json::to_value(&PaymentMethod::Cod).unwrap();
        assert_eq!(json["method"], "cod");
    }
}
