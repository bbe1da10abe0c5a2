//! Shared test harness: an engine wired against the in-memory store and
//! the stub gateway, with seeding helpers.
#![allow(dead_code)]

use std::sync::{Arc, Once};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use uuid::Uuid;

use checkout_engine::config::CheckoutConfig;
use checkout_engine::events::{Event, EventSender};
use checkout_engine::gateway::StubGateway;
use checkout_engine::models::{Coupon, DiscountKind, LineItem};
use checkout_engine::services::{CheckoutService, CouponService, OrderService, PaymentService};
use checkout_engine::store::{InMemoryStore, WalletStore};

pub const GATEWAY_SECRET: &str = "s3cr3t";

static TRACING: Once = Once::new();

/// Installs an env-filtered subscriber once per test binary so failing
/// tests can be traced with `RUST_LOG=checkout_engine=debug`.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub struct TestEngine {
    pub store: Arc<InMemoryStore>,
    pub checkout: CheckoutService,
    pub coupons: CouponService,
    pub payments: PaymentService,
    pub orders: OrderService,
    pub events: mpsc::Receiver<Event>,
}

impl TestEngine {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: CheckoutConfig) -> Self {
        init_tracing();
        let store = Arc::new(InMemoryStore::new());
        let (sender, events) = EventSender::channel(64);
        let coupons = CouponService::new(store.clone());
        let payments = PaymentService::new(
            store.clone(),
            store.clone(),
            Arc::new(StubGateway::new()),
            &config,
            Some(sender.clone()),
        );
        let orders = OrderService::new(store.clone(), Some(sender.clone()));
        let checkout = CheckoutService::new(
            config,
            coupons.clone(),
            payments.clone(),
            orders.clone(),
            Some(sender),
        );
        Self {
            store,
            checkout,
            coupons,
            payments,
            orders,
            events,
        }
    }

    pub async fn seed_coupon(
        &self,
        code: &str,
        kind: DiscountKind,
        amount: Decimal,
        usage_limit: u32,
    ) {
        let coupon = Coupon::new(code, kind, amount, far_future(), usage_limit).unwrap();
        self.coupons.register(coupon).await.unwrap();
    }

    pub async fn seed_wallet(&self, customer_id: Uuid, amount: Decimal) {
        self.store.deposit(customer_id, amount).await.unwrap();
    }

    pub async fn wallet_balance(&self, customer_id: Uuid) -> Decimal {
        self.store.balance(customer_id).await.unwrap()
    }
}

pub fn test_config() -> CheckoutConfig {
    CheckoutConfig {
        gateway_secret: Some(GATEWAY_SECRET.to_string()),
        ..CheckoutConfig::default()
    }
}

pub fn far_future() -> NaiveDate {
    NaiveDate::from_ymd_opt(2099, 12, 31).unwrap()
}

pub fn item(unit_price: Decimal, quantity: u32) -> LineItem {
    LineItem::priced(unit_price, quantity).unwrap()
}

/// Recomputes the gateway callback signature the way the gateway would
/// sign it, independent of the engine's own verification code.
pub fn gateway_signature(secret: &str, order_ref: &str, payment_ref: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}|{}", order_ref, payment_ref).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
