use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::CheckoutConfig;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::gateway::GatewayOrder;
use crate::models::{
    LineItem, Order, OrderStatus, Payment, PaymentMethod, PaymentMethodKind, PricingResult,
};
use crate::services::{coupons, pricing, CouponService, OrderService, PaymentService};

/// Request to place an order from a priced-out cart.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    pub customer_id: Uuid,
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<LineItem>,
    #[validate(length(min = 1, max = 50, message = "Coupon code must be between 1 and 50 characters"))]
    pub coupon_code: Option<String>,
    pub payment_method: PaymentMethodKind,
    /// Overrides the configured currency when set.
    #[validate(length(min = 3, max = 3, message = "Currency must be 3 characters"))]
    pub currency: Option<String>,
}

/// Outcome of a successful placement. For gateway payments the
/// `gateway_order` is handed back to the client to complete capture.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order: Order,
    pub payment: Payment,
    pub gateway_order: Option<GatewayOrder>,
}

/// Orchestrates order placement: pricing, coupon redemption, payment
/// creation, and per-method settlement.
#[derive(Clone)]
pub struct CheckoutService {
    config: CheckoutConfig,
    coupons: CouponService,
    payments: PaymentService,
    orders: OrderService,
    event_sender: Option<EventSender>,
}

impl CheckoutService {
    pub fn new(
        config: CheckoutConfig,
        coupons: CouponService,
        payments: PaymentService,
        orders: OrderService,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            config,
            coupons,
            payments,
            orders,
            event_sender,
        }
    }

    /// Places an order.
    ///
    /// The coupon (when given) is redeemed atomically before any funds
    /// move and released again if a later step fails, so a placement
    /// consumes at most one use and only when it commits. A bad code
    /// rejects the placement; it is never silently ignored.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id, method = %request.payment_method))]
    pub async fn place_order(
        &self,
        request: PlaceOrderRequest,
    ) -> Result<OrderConfirmation, ServiceError> {
        if request.items.is_empty() {
            return Err(ServiceError::EmptyCart);
        }
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        for item in &request.items {
            item.validate()?;
        }

        let kind = request.payment_method;
        if !self.config.is_method_enabled(kind) {
            warn!("payment method is disabled");
            return Err(ServiceError::PaymentMethodDisabled(kind.to_string()));
        }

        let as_of = Utc::now().date_naive();
        let subtotal = pricing::compute_subtotal(&request.items);

        let (pricing, redeemed) = match request.coupon_code.as_deref() {
            Some(code) => {
                let coupon = self.coupons.redeem(code, as_of).await?;
                let discount = coupons::discount_for(&coupon, subtotal);
                (PricingResult::new(subtotal, discount), Some(coupon))
            }
            None => (PricingResult::undiscounted(subtotal), None),
        };

        let currency = request
            .currency
            .clone()
            .unwrap_or_else(|| self.config.currency.clone());
        let order = Order::new(
            request.customer_id,
            pricing,
            currency.clone(),
            request.coupon_code.clone(),
        );

        match self.settle_placement(&order, kind, &currency).await {
            Ok((payment, gateway_order)) => {
                info!(order_id = %order.id, total = %order.pricing.total, "order placed");
                self.emit(Event::OrderPlaced {
                    order_id: order.id,
                    customer_id: order.customer_id,
                    total: order.pricing.total,
                })
                .await;
                if let Some(coupon) = &redeemed {
                    self.emit(Event::CouponRedeemed {
                        code: coupon.code.clone(),
                        order_id: order.id,
                    })
                    .await;
                }
                Ok(OrderConfirmation {
                    order,
                    payment,
                    gateway_order,
                })
            }
            Err(err) => {
                if let Some(coupon) = &redeemed {
                    if let Err(release_err) = self.coupons.release(&coupon.code).await {
                        error!(error = %release_err, code = %coupon.code,
                            "failed to release coupon after aborted placement");
                    }
                }
                Err(err)
            }
        }
    }

    /// Runs the per-method settlement step and persists the order and its
    /// payment. COD orders stay `Pending` until fulfillment is confirmed;
    /// wallet orders debit and complete synchronously; gateway orders
    /// wait `Pending` for the signed callback.
    async fn settle_placement(
        &self,
        order: &Order,
        kind: PaymentMethodKind,
        currency: &str,
    ) -> Result<(Payment, Option<GatewayOrder>), ServiceError> {
        let total = order.pricing.total;
        match kind {
            PaymentMethodKind::Cod => {
                self.orders.create(order.clone()).await?;
                let payment = self
                    .payments
                    .create(order.id, PaymentMethod::Cod, total)
                    .await?;
                Ok((payment, None))
            }
            PaymentMethodKind::Wallet => {
                self.orders.create(order.clone()).await?;
                let payment = self
                    .payments
                    .create(
                        order.id,
                        PaymentMethod::Wallet {
                            customer_id: order.customer_id,
                        },
                        total,
                    )
                    .await?;
                match self.payments.settle_wallet(payment.id).await {
                    Ok(settled) => Ok((settled, None)),
                    Err(err) => {
                        // Leave an auditable trail: the payment fails and
                        // the order is cancelled before the error surfaces.
                        if let Err(settle_err) =
                            self.payments.settle_immediate(payment.id, false).await
                        {
                            warn!(error = %settle_err, "failed to mark wallet payment failed");
                        }
                        if let Err(cancel_err) = self.orders.cancel(order.id).await {
                            warn!(error = %cancel_err, "failed to cancel order after wallet failure");
                        }
                        Err(err)
                    }
                }
            }
            PaymentMethodKind::Gateway => {
                // Register with the gateway before persisting anything so
                // a gateway failure leaves no partial order behind.
                let (payment, gateway_order) = {
                    let staged = self
                        .payments
                        .create_gateway_payment(order.id, total, currency)
                        .await?;
                    self.orders.create(order.clone()).await?;
                    staged
                };
                Ok((payment, Some(gateway_order)))
            }
        }
    }

    /// Confirms fulfillment of a COD order: completes its payment and
    /// closes out the order.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn confirm_cod_fulfillment(&self, order_id: Uuid) -> Result<Payment, ServiceError> {
        let payment = self
            .payments
            .get_by_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("no payment for order {}", order_id)))?;

        if payment.method.kind() != PaymentMethodKind::Cod {
            return Err(ServiceError::ValidationError(format!(
                "order {} is not a COD order",
                order_id
            )));
        }

        let settled = self.payments.settle_immediate(payment.id, true).await?;
        self.orders
            .update_status(order_id, OrderStatus::Completed)
            .await?;
        Ok(settled)
    }

    /// Preview path for the cart view: what would this coupon take off
    /// this subtotal? Consumes nothing.
    pub async fn preview_coupon(
        &self,
        code: &str,
        items: &[LineItem],
    ) -> Result<coupons::DiscountPreview, ServiceError> {
        if items.is_empty() {
            return Err(ServiceError::EmptyCart);
        }
        for item in items {
            item.validate()?;
        }
        let subtotal = pricing::compute_subtotal(items);
        self.coupons
            .preview(code, subtotal, Utc::now().date_naive())
            .await
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send checkout event");
            }
        }
    }
}
