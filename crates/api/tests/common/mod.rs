//! Shared fixtures for the integration tests: in-memory state
//! wiring, a scripted payment gateway, and a recording notification
//! channel.

#![allow(dead_code)] // not every test binary uses every fixture

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pomelo_api::config::{ApiConfig, PaymentProviderConfig};
use pomelo_api::middleware::{Role, issue_token};
use pomelo_api::models::{NewProduct, Product};
use pomelo_api::services::checkout::{CheckoutInput, CheckoutItemInput, ShippingAddressInput};
use pomelo_api::services::notify::{Notification, NotificationChannel, NotificationDispatcher, NotifyError};
use pomelo_api::services::payment::{PaymentError, PaymentGateway, PaymentIntent};
use pomelo_api::state::{AppState, ServiceSet};
use pomelo_api::store::CatalogStore;
use pomelo_api::store::memory::MemoryStore;
use pomelo_core::{Color, Money, ProductId, Size, UserId};
use rust_decimal::Decimal;
use secrecy::SecretString;

pub const JWT_SECRET: &str = "0123456789abcdef0123456789abcdef";

/// Config pointing at nothing; the tests inject in-memory services.
pub fn test_config() -> ApiConfig {
    ApiConfig {
        database_url: SecretString::from("postgres://unused"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        jwt_secret: SecretString::from(JWT_SECRET),
        payment: PaymentProviderConfig {
            base_url: "http://localhost:0".to_owned(),
            secret_key: SecretString::from("sk_test_unused"),
            timeout_secs: 1,
        },
        smtp: None,
        sms: None,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

// =============================================================================
// Scripted payment gateway
// =============================================================================

/// Gateway double: succeeds by default, fails with whatever errors
/// have been queued.
pub struct FakeGateway {
    script: Mutex<VecDeque<PaymentError>>,
    calls: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Queue an error for the next call.
    pub fn push_error(&self, err: PaymentError) {
        self.script.lock().expect("lock").push_back(err);
    }

    /// How many times `create_intent` was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_intent(
        &self,
        amount: Money,
        _token: Option<&str>,
        idempotency_key: Option<&str>,
    ) -> Result<PaymentIntent, PaymentError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.script.lock().expect("lock").pop_front() {
            return Err(err);
        }
        // Same key, same intent - mirrors provider-side idempotency.
        let id = idempotency_key
            .map_or_else(|| format!("pi_test_{call}"), |k| format!("pi_for_{k}"));
        Ok(PaymentIntent {
            id,
            status: "succeeded".to_owned(),
            client_secret: Some("cs_test_secret".to_owned()),
            card_brand: Some("visa".to_owned()),
            card_last4: Some("4242".to_owned()),
            amount,
        })
    }
}

// =============================================================================
// Recording notification channel
// =============================================================================

/// Channel double that records every delivered notification.
#[derive(Default)]
pub struct RecordingChannel {
    events: Mutex<Vec<Notification>>,
}

impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn low_stock_count(&self) -> usize {
        self.events
            .lock()
            .expect("lock")
            .iter()
            .filter(|n| matches!(n, Notification::LowStock { .. }))
            .count()
    }

    pub fn delivered_count(&self) -> usize {
        self.events
            .lock()
            .expect("lock")
            .iter()
            .filter(|n| matches!(n, Notification::OrderDelivered { .. }))
            .count()
    }

    pub fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("lock").clone()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("lock")
            .push(notification.clone());
        Ok(())
    }
}

// =============================================================================
// State assembly
// =============================================================================

/// Everything a test needs: state plus typed handles on the doubles.
///
/// `MemoryStore` implements all four store traits; the per-trait
/// handles keep method calls unambiguous in tests.
pub struct TestHarness {
    pub state: AppState,
    pub catalog: Arc<dyn pomelo_api::store::CatalogStore>,
    pub carts: Arc<dyn pomelo_api::store::CartStore>,
    pub orders: Arc<dyn pomelo_api::store::OrderStore>,
    pub payments: Arc<dyn pomelo_api::store::PaymentStore>,
    pub gateway: Arc<FakeGateway>,
    pub channel: Arc<RecordingChannel>,
}

pub fn harness() -> TestHarness {
    let store = Arc::new(MemoryStore::new());
    let gateway = FakeGateway::new();
    let channel = RecordingChannel::new();

    let state = AppState::with_services(
        test_config(),
        ServiceSet {
            catalog: store.clone(),
            carts: store.clone(),
            orders: store.clone(),
            payments: store.clone(),
            gateway: gateway.clone(),
            dispatcher: NotificationDispatcher::new(vec![
                channel.clone() as Arc<dyn NotificationChannel>,
            ]),
        },
    );

    TestHarness {
        state,
        catalog: store.clone(),
        carts: store.clone(),
        orders: store.clone(),
        payments: store,
        gateway,
        channel,
    }
}

/// Seed a black/medium product with the given price (in cents),
/// discount, and stock.
pub async fn seed_product(
    catalog: &Arc<dyn CatalogStore>,
    name: &str,
    price_cents: i64,
    discount_percent: i16,
    stock: i32,
) -> Product {
    catalog
        .insert(NewProduct {
            name: name.to_owned(),
            price: Money {
                amount: Decimal::new(price_cents, 2),
                currency: pomelo_core::CurrencyCode::Usd,
            },
            discount_percent,
            stock,
            sizes: vec![Size::S, Size::M, Size::L],
            colors: vec![Color::Black, Color::White],
            images: vec![format!("https://cdn.pomelomarket.dev/img/{name}.jpg")],
        })
        .await
        .expect("seed product")
}

/// A checkout request with a valid shipping address. Totals are
/// whatever the caller says they are.
pub fn checkout_input(
    items: &[(ProductId, i32)],
    items_price: Decimal,
    tax_price: Decimal,
    shipping_price: Decimal,
) -> CheckoutInput {
    CheckoutInput {
        order_items: items
            .iter()
            .map(|&(product_id, quantity)| CheckoutItemInput {
                product_id,
                quantity,
            })
            .collect(),
        shipping_address: ShippingAddressInput {
            email: "jo@example.com".to_owned(),
            phone: "+14155550123".to_owned(),
            address: "1 Market St".to_owned(),
            city: "San Francisco".to_owned(),
            postal_code: "94105".to_owned(),
            country: "US".to_owned(),
        },
        payment_method: "card".to_owned(),
        payment_token: Some("pm_card_visa".to_owned()),
        items_price,
        tax_price,
        shipping_price,
        total_price: items_price + tax_price + shipping_price,
        idempotency_key: None,
    }
}

/// Sign a bearer token against the test secret.
pub fn token_for(user: UserId, admin: bool) -> String {
    let role = if admin { Role::Admin } else { Role::Customer };
    issue_token(
        user,
        Some("jo@example.com"),
        role,
        &SecretString::from(JWT_SECRET),
        3600,
    )
    .expect("sign token")
}

/// Poll until `cond` holds; panics after ~500ms. Used to observe
/// fire-and-forget notification tasks.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}
