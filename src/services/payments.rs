use std::sync::Arc;

use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sha2::Sha256;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::CheckoutConfig;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::gateway::{GatewayOrder, PaymentGateway};
use crate::models::{Payment, PaymentMethod, PaymentStatus};
use crate::store::{PaymentStore, WalletStore};

type HmacSha256 = Hmac<Sha256>;

/// Payment lifecycle service: creation at `Pending`, immediate settlement
/// for COD and wallet payments, and HMAC-verified settlement from gateway
/// callbacks. Terminal payments are frozen; every re-settlement attempt
/// fails with [`ServiceError::AlreadySettled`].
#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn PaymentStore>,
    wallet: Arc<dyn WalletStore>,
    gateway: Arc<dyn PaymentGateway>,
    gateway_secret: String,
    event_sender: Option<EventSender>,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn PaymentStore>,
        wallet: Arc<dyn WalletStore>,
        gateway: Arc<dyn PaymentGateway>,
        config: &CheckoutConfig,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            store,
            wallet,
            gateway,
            gateway_secret: config.gateway_secret.clone().unwrap_or_default(),
            event_sender,
        }
    }

    /// Creates a payment record in `Pending` for an order.
    #[instrument(skip(self), fields(order_id = %order_id, %amount))]
    pub async fn create(
        &self,
        order_id: Uuid,
        method: PaymentMethod,
        amount: Decimal,
    ) -> Result<Payment, ServiceError> {
        let payment = Payment::new(order_id, method, amount);
        self.store.insert(payment.clone()).await?;
        info!(payment_id = %payment.id, "payment created");
        Ok(payment)
    }

    /// Registers an order with the external gateway, then creates the
    /// matching `Pending` payment carrying the gateway order reference.
    #[instrument(skip(self), fields(order_id = %order_id, %amount))]
    pub async fn create_gateway_payment(
        &self,
        order_id: Uuid,
        amount: Decimal,
        currency: &str,
    ) -> Result<(Payment, GatewayOrder), ServiceError> {
        let gateway_order = self.gateway.create_order(amount, currency).await?;
        let payment = self
            .create(
                order_id,
                PaymentMethod::Gateway {
                    gateway_order_ref: gateway_order.reference.clone(),
                },
                amount,
            )
            .await?;
        Ok((payment, gateway_order))
    }

    pub async fn get(&self, payment_id: Uuid) -> Result<Option<Payment>, ServiceError> {
        self.store.find(payment_id).await
    }

    pub async fn get_by_order(&self, order_id: Uuid) -> Result<Option<Payment>, ServiceError> {
        self.store.find_by_order(order_id).await
    }

    /// Settles a pending payment synchronously, used for COD fulfillment
    /// confirmation and for failure marking. The store enforces the
    /// terminal guard atomically.
    #[instrument(skip(self), fields(payment_id = %payment_id, succeeded))]
    pub async fn settle_immediate(
        &self,
        payment_id: Uuid,
        succeeded: bool,
    ) -> Result<Payment, ServiceError> {
        let to = if succeeded {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Failed
        };
        let payment = self.store.transition(payment_id, to, None).await?;
        info!(status = %payment.status, "payment settled");
        self.emit(match payment.status {
            PaymentStatus::Completed => Event::PaymentCompleted(payment.id),
            _ => Event::PaymentFailed(payment.id),
        })
        .await;
        Ok(payment)
    }

    /// Settles a wallet payment: debits the customer's balance and marks
    /// the payment `Completed` as one unit. If the completion cannot be
    /// committed after the debit, the debit is credited back.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn settle_wallet(&self, payment_id: Uuid) -> Result<Payment, ServiceError> {
        let payment = self
            .store
            .find(payment_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("payment {} not found", payment_id)))?;

        let customer_id = match payment.method {
            PaymentMethod::Wallet { customer_id } => customer_id,
            ref other => {
                return Err(ServiceError::ValidationError(format!(
                    "payment {} is not a wallet payment (method {})",
                    payment_id,
                    other.kind()
                )))
            }
        };
        if payment.status.is_terminal() {
            return Err(ServiceError::AlreadySettled(payment_id));
        }

        self.wallet.try_debit(customer_id, payment.amount).await?;

        match self
            .store
            .transition(payment_id, PaymentStatus::Completed, None)
            .await
        {
            Ok(settled) => {
                info!(%customer_id, amount = %settled.amount, "wallet payment completed");
                self.emit(Event::PaymentCompleted(settled.id)).await;
                Ok(settled)
            }
            Err(err) => {
                // The debit is already durable; undo it before reporting.
                if let Err(credit_err) =
                    self.wallet.deposit(customer_id, payment.amount).await
                {
                    warn!(error = %credit_err, %customer_id, "failed to credit wallet back");
                }
                Err(err)
            }
        }
    }

    /// Verifies a gateway callback and settles the payment accordingly.
    ///
    /// The signature is recomputed as HMAC-SHA256 over
    /// `"{order_ref}|{payment_ref}"` keyed by the configured secret and
    /// compared in constant time. A match completes the payment and
    /// records `payment_ref`; a mismatch marks it `Failed` and returns
    /// [`ServiceError::SignatureMismatch`].
    #[instrument(skip(self, provided_signature), fields(payment_id = %payment_id))]
    pub async fn verify_gateway_callback(
        &self,
        payment_id: Uuid,
        order_ref: &str,
        payment_ref: &str,
        provided_signature: &str,
    ) -> Result<Payment, ServiceError> {
        let payment = self
            .store
            .find(payment_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("payment {} not found", payment_id)))?;

        match &payment.method {
            PaymentMethod::Gateway { gateway_order_ref } if gateway_order_ref == order_ref => {}
            PaymentMethod::Gateway { .. } => {
                return Err(ServiceError::ValidationError(
                    "callback order reference does not match payment".to_string(),
                ))
            }
            other => {
                return Err(ServiceError::ValidationError(format!(
                    "payment {} is not a gateway payment (method {})",
                    payment_id,
                    other.kind()
                )))
            }
        }
        if payment.status.is_terminal() {
            return Err(ServiceError::AlreadySettled(payment_id));
        }

        let expected = expected_signature(&self.gateway_secret, order_ref, payment_ref);
        if constant_time_eq(&expected, provided_signature) {
            let settled = self
                .store
                .transition(
                    payment_id,
                    PaymentStatus::Completed,
                    Some(payment_ref.to_string()),
                )
                .await?;
            info!("gateway payment verified");
            self.emit(Event::PaymentCompleted(settled.id)).await;
            Ok(settled)
        } else {
            warn!("gateway signature verification failed");
            let failed = self
                .store
                .transition(payment_id, PaymentStatus::Failed, None)
                .await?;
            self.emit(Event::PaymentFailed(failed.id)).await;
            Err(ServiceError::SignatureMismatch)
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send payment event");
            }
        }
    }
}

fn expected_signature(secret: &str, order_ref: &str, payment_ref: &str) -> String {
    let signed = format!("{}|{}", order_ref, payment_ref);
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(signed.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_signature_vector() {
        // HMAC-SHA256("order_1|pay_1", "s3cr3t")
        assert_eq!(
            expected_signature("s3cr3t", "order_1", "pay_1"),
            "c4ba7785e595b717abd8b4847eaf30e97f23acbdbe1b8f5cbbf17d28d63b068f"
        );
    }

    #[test]
    fn constant_time_eq_matches_semantics() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(constant_time_eq("", ""));
    }
}
