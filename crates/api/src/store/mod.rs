//! Persistence interfaces for the transaction pipeline.
//!
//! Every component talks to storage through the traits in this module
//! so nothing in the pipeline depends on a process-wide connection.
//! [`postgres`] holds the production implementations; [`memory`] is a
//! mutex-guarded implementation for tests and local development.
//!
//! # Atomicity contract
//!
//! - `CartStore::add_line` runs its read-check-write cycle (product
//!   stock, existing line, merge) in one atomic region per
//!   {cart, product}, so concurrent adds cannot jointly overcommit
//!   inventory.
//! - `OrderStore::create` persists the order, its item snapshots, the
//!   payment record, and the stock decrement in a single transaction,
//!   and honors the draft's idempotency key: a replay returns the
//!   stored order and decrements nothing.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pomelo_core::{CartLineId, OrderId, ProductId, UserId};

use crate::models::{
    AddLine, Cart, CartError, NewProduct, Order, OrderDraft, Payment, PaymentDraft, PlacedOrder,
    Product,
};

/// Errors raised by store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Constraint violation (e.g. duplicate payment for an order).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A cart rule rejected the mutation (stock ceiling, variant).
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The order is already flagged paid.
    #[error("order {0} is already paid")]
    AlreadyPaid(OrderId),

    /// The order is already flagged delivered.
    #[error("order {0} is already delivered")]
    AlreadyDelivered(OrderId),
}

/// Read access to catalog products, plus insertion for seeding.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Fetch one product.
    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// All products, newest first.
    async fn list(&self) -> Result<Vec<Product>, StoreError>;

    /// Insert a product (seed data, admin tooling).
    async fn insert(&self, new: NewProduct) -> Result<Product, StoreError>;
}

/// Per-user cart persistence.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The user's cart with its lines, if one exists.
    async fn get(&self, user: UserId) -> Result<Option<Cart>, StoreError>;

    /// Add-or-merge a line, atomically per {cart, product}.
    ///
    /// Creates the cart lazily on first add. Snapshots the product's
    /// price/discount for fresh lines; merges quantity for an
    /// existing variant key. Fails without mutating anything when the
    /// stock ceiling would be exceeded.
    async fn add_line(&self, user: UserId, req: AddLine) -> Result<Cart, StoreError>;

    /// Remove one line. Returns the updated cart, or `None` when the
    /// removed line was the last one and the cart was deleted.
    async fn remove_line(
        &self,
        user: UserId,
        line: CartLineId,
    ) -> Result<Option<Cart>, StoreError>;

    /// Drop the user's cart entirely (successful checkout). Missing
    /// cart is not an error.
    async fn clear(&self, user: UserId) -> Result<(), StoreError>;
}

/// Order persistence: creation transaction plus lifecycle flags.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Create order + items + payment and decrement stock, in one
    /// transaction. See the module docs for the idempotency contract.
    async fn create(&self, draft: OrderDraft) -> Result<PlacedOrder, StoreError>;

    /// Fetch one order with its item snapshots.
    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Orders placed by one user, newest first.
    async fn list_by_user(&self, user: UserId) -> Result<Vec<Order>, StoreError>;

    /// Every order, newest first (admin).
    async fn list_all(&self) -> Result<Vec<Order>, StoreError>;

    /// One-way transition to paid.
    ///
    /// # Errors
    ///
    /// `AlreadyPaid` when the flag is already set; `NotFound` when
    /// the order doesn't exist.
    async fn mark_paid(&self, id: OrderId, at: DateTime<Utc>) -> Result<Order, StoreError>;

    /// One-way transition to delivered.
    ///
    /// # Errors
    ///
    /// `AlreadyDelivered` when the flag is already set; `NotFound`
    /// when the order doesn't exist.
    async fn mark_delivered(&self, id: OrderId, at: DateTime<Utc>) -> Result<Order, StoreError>;

    /// Hard-delete an order.
    ///
    /// # Errors
    ///
    /// `NotFound` when the order doesn't exist.
    async fn delete(&self, id: OrderId) -> Result<(), StoreError>;
}

/// Standalone payment records (the `POST /payments` surface).
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Record a payment against an existing order.
    ///
    /// # Errors
    ///
    /// `NotFound` when the order doesn't exist; `Conflict` when the
    /// order already has a payment.
    async fn record(&self, order: OrderId, draft: PaymentDraft) -> Result<Payment, StoreError>;

    /// The payment linked to an order, if any.
    async fn get_by_order(&self, order: OrderId) -> Result<Option<Payment>, StoreError>;
}
