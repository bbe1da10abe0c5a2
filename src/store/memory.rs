//! In-memory store used by the test suite and by embedders that do not
//! need durable storage. Per-entity atomicity comes from `DashMap`'s
//! entry locking: a `get_mut` holds the entry exclusively for the whole
//! read-modify-write, which is the same discipline a database backend
//! provides with a row lock or conditional update.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{Coupon, Order, OrderStatus, Payment, PaymentStatus};

use super::{CouponStore, OrderStore, PaymentStore, WalletStore};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    coupons: DashMap<String, Coupon>,
    wallets: DashMap<Uuid, Decimal>,
    orders: DashMap<Uuid, Order>,
    payments: DashMap<Uuid, Payment>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CouponStore for InMemoryStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, ServiceError> {
        Ok(self.coupons.get(code).map(|c| c.clone()))
    }

    async fn insert(&self, coupon: Coupon) -> Result<(), ServiceError> {
        match self.coupons.entry(coupon.code.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(ServiceError::Conflict(format!(
                "coupon code {} already exists",
                coupon.code
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(coupon);
                Ok(())
            }
        }
    }

    async fn try_redeem(&self, code: &str, as_of: NaiveDate) -> Result<Coupon, ServiceError> {
        let mut entry = self
            .coupons
            .get_mut(code)
            .ok_or_else(|| ServiceError::InvalidCoupon(format!("coupon {} not found", code)))?;

        if !entry.is_valid(as_of) {
            return Err(ServiceError::InvalidCoupon(format!(
                "coupon {} is expired or exhausted",
                code
            )));
        }
        entry.times_used += 1;
        Ok(entry.clone())
    }

    async fn release(&self, code: &str) -> Result<(), ServiceError> {
        let mut entry = self
            .coupons
            .get_mut(code)
            .ok_or_else(|| ServiceError::NotFound(format!("coupon {} not found", code)))?;
        entry.times_used = entry.times_used.saturating_sub(1);
        Ok(())
    }
}

#[async_trait]
impl WalletStore for InMemoryStore {
    async fn balance(&self, customer_id: Uuid) -> Result<Decimal, ServiceError> {
        Ok(self
            .wallets
            .get(&customer_id)
            .map(|b| *b)
            .unwrap_or(Decimal::ZERO))
    }

    async fn deposit(&self, customer_id: Uuid, amount: Decimal) -> Result<Decimal, ServiceError> {
        if amount.is_sign_negative() {
            return Err(ServiceError::ValidationError(
                "deposit amount must not be negative".to_string(),
            ));
        }
        let mut balance = self.wallets.entry(customer_id).or_insert(Decimal::ZERO);
        *balance += amount;
        Ok(*balance)
    }

    async fn try_debit(
        &self,
        customer_id: Uuid,
        amount: Decimal,
    ) -> Result<Decimal, ServiceError> {
        let mut balance = self.wallets.entry(customer_id).or_insert(Decimal::ZERO);
        if *balance < amount {
            return Err(ServiceError::InsufficientFunds {
                required: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        Ok(*balance)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert(&self, order: Order) -> Result<(), ServiceError> {
        self.orders.insert(order.id, order);
        Ok(())
    }

    async fn find(&self, order_id: Uuid) -> Result<Option<Order>, ServiceError> {
        Ok(self.orders.get(&order_id).map(|o| o.clone()))
    }

    async fn update_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<Order, ServiceError> {
        let mut entry = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))?;
        entry.status = status;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Order>, ServiceError> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| o.customer_id == customer_id)
            .map(|o| o.clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn insert(&self, payment: Payment) -> Result<(), ServiceError> {
        self.payments.insert(payment.id, payment);
        Ok(())
    }

    async fn find(&self, payment_id: Uuid) -> Result<Option<Payment>, ServiceError> {
        Ok(self.payments.get(&payment_id).map(|p| p.clone()))
    }

    async fn find_by_order(&self, order_id: Uuid) -> Result<Option<Payment>, ServiceError> {
        Ok(self
            .payments
            .iter()
            .find(|p| p.order_id == order_id)
            .map(|p| p.clone()))
    }

    async fn transition(
        &self,
        payment_id: Uuid,
        to: PaymentStatus,
        external_reference: Option<String>,
    ) -> Result<Payment, ServiceError> {
        let mut entry = self
            .payments
            .get_mut(&payment_id)
            .ok_or_else(|| ServiceError::NotFound(format!("payment {} not found", payment_id)))?;
        entry.transition(to, Utc::now())?;
        if external_reference.is_some() {
            entry.external_reference = external_reference;
        }
        Ok(entry.clone())
    }
}
