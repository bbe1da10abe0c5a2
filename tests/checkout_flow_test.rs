//! End-to-end placement flows through the checkout service.
//!
//! Covers:
//! - COD placement and manual fulfillment confirmation
//! - Wallet placement, debit, and insufficient-funds compensation
//! - Gateway placement and reference hand-off
//! - Coupon redemption at commit vs preview
//! - Rejection paths (empty cart, disabled method, bad coupon)

mod common;

use assert_matches::assert_matches;
use common::{item, TestEngine};
use rust_decimal_macros::dec;
use uuid::Uuid;

use checkout_engine::config::CheckoutConfig;
use checkout_engine::errors::ServiceError;
use checkout_engine::events::Event;
use checkout_engine::models::{
    DiscountKind, OrderStatus, PaymentMethod, PaymentMethodKind, PaymentStatus,
};
use checkout_engine::services::checkout::PlaceOrderRequest;
use checkout_engine::store::CouponStore;

fn request(customer_id: Uuid, method: PaymentMethodKind) -> PlaceOrderRequest {
    PlaceOrderRequest {
        customer_id,
        items: vec![item(dec!(40.00), 2), item(dec!(20.00), 1)],
        coupon_code: None,
        payment_method: method,
        currency: None,
    }
}

// ==================== COD ====================

#[tokio::test]
async fn cod_order_stays_pending_until_fulfillment_confirmed() {
    let engine = TestEngine::new();
    let customer = Uuid::new_v4();

    let confirmation = engine
        .checkout
        .place_order(request(customer, PaymentMethodKind::Cod))
        .await
        .unwrap();

    assert_eq!(confirmation.order.pricing.total, dec!(100.00));
    assert_eq!(confirmation.order.status, OrderStatus::Pending);
    assert_eq!(confirmation.payment.status, PaymentStatus::Pending);
    assert_eq!(confirmation.payment.method, PaymentMethod::Cod);
    assert!(confirmation.gateway_order.is_none());

    let settled = engine
        .checkout
        .confirm_cod_fulfillment(confirmation.order.id)
        .await
        .unwrap();
    assert_eq!(settled.status, PaymentStatus::Completed);

    let order = engine
        .orders
        .get_order(confirmation.order.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Completed);

    // Confirming a second time hits the terminal guard.
    let err = engine
        .checkout
        .confirm_cod_fulfillment(confirmation.order.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::AlreadySettled(_));
}

// ==================== Wallet ====================

#[tokio::test]
async fn wallet_order_debits_and_completes_synchronously() {
    let engine = TestEngine::new();
    let customer = Uuid::new_v4();
    engine.seed_wallet(customer, dec!(150.00)).await;

    let confirmation = engine
        .checkout
        .place_order(request(customer, PaymentMethodKind::Wallet))
        .await
        .unwrap();

    assert_eq!(confirmation.payment.status, PaymentStatus::Completed);
    assert!(confirmation.payment.settled_at.is_some());
    assert_eq!(engine.wallet_balance(customer).await, dec!(50.00));
}

#[tokio::test]
async fn wallet_shortfall_fails_placement_and_compensates() {
    let engine = TestEngine::new();
    let customer = Uuid::new_v4();
    engine.seed_wallet(customer, dec!(10.00)).await;
    engine
        .seed_coupon("ONESHOT", DiscountKind::Flat, dec!(5.00), 1)
        .await;

    let mut req = request(customer, PaymentMethodKind::Wallet);
    req.coupon_code = Some("ONESHOT".to_string());

    let err = engine.checkout.place_order(req).await.unwrap_err();
    assert_matches!(err, ServiceError::InsufficientFunds { .. });

    // Balance untouched, coupon use returned.
    assert_eq!(engine.wallet_balance(customer).await, dec!(10.00));
    let coupon = engine.store.find_by_code("ONESHOT").await.unwrap().unwrap();
    assert_eq!(coupon.times_used, 0);

    // The aborted placement leaves an auditable cancelled order with a
    // failed payment.
    let orders = engine.orders.list_for_customer(customer).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Cancelled);
    let payment = engine
        .payments
        .get_by_order(orders[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Failed);
}

// ==================== Gateway ====================

#[tokio::test]
async fn gateway_placement_hands_back_the_gateway_order() {
    let engine = TestEngine::new();
    let customer = Uuid::new_v4();

    let confirmation = engine
        .checkout
        .place_order(request(customer, PaymentMethodKind::Gateway))
        .await
        .unwrap();

    let gateway_order = confirmation.gateway_order.expect("gateway order handle");
    assert_eq!(gateway_order.amount_minor, 10000);
    assert_eq!(gateway_order.currency, "INR");
    assert_eq!(confirmation.payment.status, PaymentStatus::Pending);
    assert_matches!(
        &confirmation.payment.method,
        PaymentMethod::Gateway { gateway_order_ref } if *gateway_order_ref == gateway_order.reference
    );
}

// ==================== Coupons ====================

#[tokio::test]
async fn coupon_discount_is_applied_and_consumed_at_placement() {
    let engine = TestEngine::new();
    let customer = Uuid::new_v4();
    engine
        .seed_coupon("SAVE10", DiscountKind::Percentage, dec!(10), 5)
        .await;

    let mut req = request(customer, PaymentMethodKind::Cod);
    req.coupon_code = Some("SAVE10".to_string());

    let confirmation = engine.checkout.place_order(req).await.unwrap();
    assert_eq!(confirmation.order.pricing.subtotal, dec!(100.00));
    assert_eq!(confirmation.order.pricing.discount, dec!(10.00));
    assert_eq!(confirmation.order.pricing.total, dec!(90.00));
    assert_eq!(confirmation.payment.amount, dec!(90.00));

    let coupon = engine.store.find_by_code("SAVE10").await.unwrap().unwrap();
    assert_eq!(coupon.times_used, 1);
}

#[tokio::test]
async fn preview_consumes_nothing() {
    let engine = TestEngine::new();
    engine
        .seed_coupon("SAVE10", DiscountKind::Percentage, dec!(10), 1)
        .await;

    let items = vec![item(dec!(50.00), 2)];
    let preview = engine
        .checkout
        .preview_coupon("SAVE10", &items)
        .await
        .unwrap();
    assert_eq!(preview.discount, dec!(10.00));
    assert_eq!(preview.discounted_total, dec!(90.00));
    assert_eq!(preview.remaining_uses, 1);

    let coupon = engine.store.find_by_code("SAVE10").await.unwrap().unwrap();
    assert_eq!(coupon.times_used, 0);
}

#[tokio::test]
async fn unknown_coupon_rejects_the_placement() {
    let engine = TestEngine::new();
    let customer = Uuid::new_v4();

    let mut req = request(customer, PaymentMethodKind::Cod);
    req.coupon_code = Some("NO-SUCH-CODE".to_string());

    let err = engine.checkout.place_order(req).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidCoupon(_));
    assert!(engine
        .orders
        .list_for_customer(customer)
        .await
        .unwrap()
        .is_empty());
}

// ==================== Rejection paths ====================

#[tokio::test]
async fn empty_cart_is_rejected() {
    let engine = TestEngine::new();
    let mut req = request(Uuid::new_v4(), PaymentMethodKind::Cod);
    req.items.clear();

    let err = engine.checkout.place_order(req).await.unwrap_err();
    assert_matches!(err, ServiceError::EmptyCart);
}

#[tokio::test]
async fn disabled_method_is_rejected_and_persists_nothing() {
    let config = CheckoutConfig {
        cod_enabled: false,
        ..common::test_config()
    };
    let engine = TestEngine::with_config(config);
    let customer = Uuid::new_v4();

    let err = engine
        .checkout
        .place_order(request(customer, PaymentMethodKind::Cod))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::PaymentMethodDisabled(_));
    assert!(engine
        .orders
        .list_for_customer(customer)
        .await
        .unwrap()
        .is_empty());
}

// ==================== Events ====================

#[tokio::test]
async fn placement_emits_order_and_coupon_events() {
    let mut engine = TestEngine::new();
    let customer = Uuid::new_v4();
    engine
        .seed_coupon("SAVE10", DiscountKind::Percentage, dec!(10), 5)
        .await;

    let mut req = request(customer, PaymentMethodKind::Cod);
    req.coupon_code = Some("SAVE10".to_string());
    let confirmation = engine.checkout.place_order(req).await.unwrap();

    let mut saw_placed = false;
    let mut saw_redeemed = false;
    while let Ok(event) = engine.events.try_recv() {
        match event {
            Event::OrderPlaced {
                order_id, total, ..
            } => {
                assert_eq!(order_id, confirmation.order.id);
                assert_eq!(total, dec!(90.00));
                saw_placed = true;
            }
            Event::CouponRedeemed { code, order_id } => {
                assert_eq!(code, "SAVE10");
                assert_eq!(order_id, confirmation.order.id);
                saw_redeemed = true;
            }
            _ => {}
        }
    }
    assert!(saw_placed);
    assert!(saw_redeemed);
}
