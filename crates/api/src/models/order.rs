//! Order records: immutable snapshots with two one-way flags.

use chrono::{DateTime, Utc};
use pomelo_core::{Money, OrderId, OrderItemId, ProductId, UserId};
use serde::Serialize;

use super::payment::Payment;

/// A validated shipping address stored on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingAddress {
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// One item of an order: data copied from the product at creation
/// time, immune to later product edits.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Money,
    pub image: Option<String>,
}

/// A placed order.
///
/// Immutable once created except for the two one-way flags:
/// `is_paid` (sets `paid_at`) and `is_delivered` (sets
/// `delivered_at`).
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub items_price: Money,
    pub tax_price: Money,
    pub shipping_price: Money,
    pub total_price: Money,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    /// Replay key supplied at creation, if any. Not part of the API
    /// representation.
    #[serde(skip)]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Snapshot data for one item of an order draft.
#[derive(Debug, Clone)]
pub struct OrderItemDraft {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Money,
    pub image: Option<String>,
}

/// Everything the store needs to persist an order, its payment, and
/// the stock decrement in one transaction.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub items: Vec<OrderItemDraft>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub items_price: Money,
    pub tax_price: Money,
    pub shipping_price: Money,
    pub total_price: Money,
    /// Client-supplied replay key. Creating twice with the same key
    /// returns the first order instead of a duplicate.
    pub idempotency_key: Option<String>,
    pub payment: super::payment::PaymentDraft,
}

/// Post-decrement stock level for one ordered product, used for
/// low-stock alerting.
#[derive(Debug, Clone)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub name: String,
    pub stock: i32,
}

/// Result of the order-creation transaction.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub payment: Payment,
    /// Stock levels after decrement, one per ordered product. Empty
    /// on an idempotent replay (nothing was decremented).
    pub stock_after: Vec<StockLevel>,
    /// True when an existing order was returned for the idempotency
    /// key instead of creating a new one.
    pub replayed: bool,
}
