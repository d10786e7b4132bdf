//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::cart::CartEngine;
use crate::services::checkout::CheckoutOrchestrator;
use crate::services::notify::{
    EmailChannel, NotificationChannel, NotificationDispatcher, NotifyError, SmsChannel,
};
use crate::services::orders::OrderLedger;
use crate::services::payment::{HttpPaymentGateway, PaymentError, PaymentGateway};
use crate::store::postgres::{PgCartStore, PgCatalogStore, PgOrderStore, PgPaymentStore};
use crate::store::{CartStore, CatalogStore, OrderStore, PaymentStore};

/// Error assembling application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("payment gateway: {0}")]
    Payment(#[from] PaymentError),
    #[error("notification channel: {0}")]
    Notify(#[from] NotifyError),
}

/// The injected seams of the pipeline: stores, gateway, dispatcher.
///
/// Production wiring comes from [`AppState::new`]; tests assemble
/// their own set over the in-memory store and a scripted gateway.
pub struct ServiceSet {
    pub catalog: Arc<dyn CatalogStore>,
    pub carts: Arc<dyn CartStore>,
    pub orders: Arc<dyn OrderStore>,
    pub payments: Arc<dyn PaymentStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub dispatcher: NotificationDispatcher,
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. There are no process-wide singletons:
/// every component receives its collaborators from here.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: Option<PgPool>,
    catalog: Arc<dyn CatalogStore>,
    payments: Arc<dyn PaymentStore>,
    gateway: Arc<dyn PaymentGateway>,
    cart_engine: CartEngine,
    checkout: CheckoutOrchestrator,
    ledger: OrderLedger,
}

impl AppState {
    /// Production wiring: Postgres stores, HTTP payment gateway, and
    /// whichever notification channels the config enables.
    ///
    /// # Errors
    ///
    /// Returns an error if the payment gateway or a notification
    /// channel fails to construct.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();
        if let Some(smtp) = &config.smtp {
            channels.push(Arc::new(EmailChannel::new(smtp)?));
        }
        if let Some(sms) = &config.sms {
            channels.push(Arc::new(SmsChannel::new(sms)?));
        }

        let services = ServiceSet {
            catalog: Arc::new(PgCatalogStore::new(pool.clone())),
            carts: Arc::new(PgCartStore::new(pool.clone())),
            orders: Arc::new(PgOrderStore::new(pool.clone())),
            payments: Arc::new(PgPaymentStore::new(pool.clone())),
            gateway: Arc::new(HttpPaymentGateway::new(&config.payment)?),
            dispatcher: NotificationDispatcher::new(channels),
        };

        Ok(Self::assemble(config, Some(pool), services))
    }

    /// Assemble state over an explicit service set (tests, local dev
    /// on the in-memory store).
    #[must_use]
    pub fn with_services(config: ApiConfig, services: ServiceSet) -> Self {
        Self::assemble(config, None, services)
    }

    fn assemble(config: ApiConfig, pool: Option<PgPool>, services: ServiceSet) -> Self {
        let ledger = OrderLedger::new(services.orders, services.dispatcher);
        let cart_engine = CartEngine::new(services.catalog.clone(), services.carts.clone());
        let checkout = CheckoutOrchestrator::new(
            services.catalog.clone(),
            services.carts,
            ledger.clone(),
            services.gateway.clone(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog: services.catalog,
                payments: services.payments,
                gateway: services.gateway,
                cart_engine,
                checkout,
                ledger,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// The database pool, when running on Postgres.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// The catalog store.
    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn CatalogStore> {
        &self.inner.catalog
    }

    /// The standalone payment store.
    #[must_use]
    pub fn payments(&self) -> &Arc<dyn PaymentStore> {
        &self.inner.payments
    }

    /// The payment gateway adapter.
    #[must_use]
    pub fn gateway(&self) -> &Arc<dyn PaymentGateway> {
        &self.inner.gateway
    }

    /// The cart engine.
    #[must_use]
    pub fn cart_engine(&self) -> &CartEngine {
        &self.inner.cart_engine
    }

    /// The checkout orchestrator.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutOrchestrator {
        &self.inner.checkout
    }

    /// The order ledger.
    #[must_use]
    pub fn ledger(&self) -> &OrderLedger {
        &self.inner.ledger
    }
}
