//! Storage ports for the engine's shared mutable records.
//!
//! Durable persistence is an external collaborator: the embedding
//! application implements these traits over its database of choice. The
//! contracts below push the per-entity atomicity the engine needs into the
//! store, where a real backend can use a conditional update or row-level
//! lock: `try_redeem` and `try_debit` are read-modify-write operations that
//! must be serialized per entity, and `transition` must refuse to move a
//! payment out of a terminal state even under concurrent callers.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{Coupon, Order, OrderStatus, Payment, PaymentStatus};

pub mod memory;

pub use memory::InMemoryStore;

#[async_trait]
pub trait CouponStore: Send + Sync {
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, ServiceError>;

    /// Inserts a new coupon; fails with [`ServiceError::Conflict`] when
    /// the code is already taken.
    async fn insert(&self, coupon: Coupon) -> Result<(), ServiceError>;

    /// Atomically validates and increments `times_used`, returning the
    /// updated coupon. Fails with [`ServiceError::InvalidCoupon`] when the
    /// code is unknown, expired, or at its usage cap. Two concurrent calls
    /// against a coupon with one remaining use must yield exactly one
    /// success.
    async fn try_redeem(&self, code: &str, as_of: NaiveDate) -> Result<Coupon, ServiceError>;

    /// Compensating decrement for a redemption whose order could not be
    /// committed. Saturates at zero.
    async fn release(&self, code: &str) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn balance(&self, customer_id: Uuid) -> Result<Decimal, ServiceError>;

    async fn deposit(&self, customer_id: Uuid, amount: Decimal) -> Result<Decimal, ServiceError>;

    /// Atomically debits the wallet, returning the new balance. Fails with
    /// [`ServiceError::InsufficientFunds`] when the balance is short; two
    /// concurrent debits must never both read the same stale balance.
    async fn try_debit(&self, customer_id: Uuid, amount: Decimal)
        -> Result<Decimal, ServiceError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order) -> Result<(), ServiceError>;

    async fn find(&self, order_id: Uuid) -> Result<Option<Order>, ServiceError>;

    /// Persists a status change, returning the updated order.
    async fn update_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<Order, ServiceError>;

    async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Order>, ServiceError>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert(&self, payment: Payment) -> Result<(), ServiceError>;

    async fn find(&self, payment_id: Uuid) -> Result<Option<Payment>, ServiceError>;

    async fn find_by_order(&self, order_id: Uuid) -> Result<Option<Payment>, ServiceError>;

    /// Atomically moves a payment into a terminal state, recording the
    /// gateway reference when one is supplied. Fails with
    /// [`ServiceError::AlreadySettled`] when the payment is already
    /// terminal, leaving it unchanged.
    async fn transition(
        &self,
        payment_id: Uuid,
        to: PaymentStatus,
        external_reference: Option<String>,
    ) -> Result<Payment, ServiceError>;
}
