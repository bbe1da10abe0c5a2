//! Port for the external payment gateway's order-creation API.
//!
//! The gateway itself is an opaque external service; only the signed
//! callback verification (see `services::payments`) happens in-process.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// A gateway-side order handle returned by `create_order`, echoed back to
/// the client so it can complete the payment against the gateway.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub reference: String,
    /// Amount in the currency's minor unit, as gateways quote it.
    pub amount_minor: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Registers an order with the gateway ahead of client-side capture.
    /// Failures surface as [`ServiceError::ExternalServiceError`].
    async fn create_order(
        &self,
        amount: Decimal,
        currency: &str,
    ) -> Result<GatewayOrder, ServiceError>;
}

/// Gateway double that hands out sequential references without any
/// network. Used by the test suite and by demo embeddings.
#[derive(Debug, Default)]
pub struct StubGateway {
    counter: AtomicU64,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_order(
        &self,
        amount: Decimal,
        currency: &str,
    ) -> Result<GatewayOrder, ServiceError> {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let amount_minor = (amount * Decimal::ONE_HUNDRED)
            .trunc()
            .to_i64()
            .ok_or_else(|| {
                ServiceError::ExternalServiceError("amount out of gateway range".to_string())
            })?;
        Ok(GatewayOrder {
            reference: format!("gw_order_{}", seq),
            amount_minor,
            currency: currency.to_string(),
        })
    }
}
