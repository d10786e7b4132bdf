//! Order ledger: lifecycle operations and post-commit side effects.

use std::sync::Arc;

use chrono::Utc;
use pomelo_core::{OrderId, UserId};
use tracing::instrument;

use crate::error::Result;
use crate::models::{Order, OrderDraft, PlacedOrder};
use crate::services::notify::{Notification, NotificationDispatcher};
use crate::store::OrderStore;

/// Stock level at or below which a restock alert fires.
pub const LOW_STOCK_THRESHOLD: i32 = 2;

/// Owns order persistence calls and the best-effort side effects that
/// follow them (low-stock alerts, delivery notifications).
#[derive(Clone)]
pub struct OrderLedger {
    orders: Arc<dyn OrderStore>,
    dispatcher: NotificationDispatcher,
}

impl OrderLedger {
    /// Create a ledger over its store and dispatcher.
    #[must_use]
    pub fn new(orders: Arc<dyn OrderStore>, dispatcher: NotificationDispatcher) -> Self {
        Self { orders, dispatcher }
    }

    /// Persist an order (snapshot items, payment, stock decrement in
    /// one transaction) and fire low-stock alerts for any product the
    /// decrement left at or below the threshold.
    ///
    /// An idempotent replay skips the alerts: nothing was decremented.
    #[instrument(skip(self, draft), fields(user = %draft.user_id))]
    pub async fn place_order(&self, draft: OrderDraft) -> Result<PlacedOrder> {
        let placed = self.orders.create(draft).await?;

        if !placed.replayed {
            for level in &placed.stock_after {
                if level.stock <= LOW_STOCK_THRESHOLD {
                    drop(self.dispatcher.dispatch(Notification::LowStock {
                        product_id: level.product_id,
                        name: level.name.clone(),
                        stock: level.stock,
                    }));
                }
            }
        }

        Ok(placed)
    }

    /// Fetch one order.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.get(id).await?)
    }

    /// Orders placed by one user, newest first.
    pub async fn list_by_user(&self, user: UserId) -> Result<Vec<Order>> {
        Ok(self.orders.list_by_user(user).await?)
    }

    /// Every order, newest first.
    pub async fn list_all(&self) -> Result<Vec<Order>> {
        Ok(self.orders.list_all().await?)
    }

    /// One-way transition to paid. Rejects a second call.
    #[instrument(skip(self))]
    pub async fn mark_paid(&self, id: OrderId) -> Result<Order> {
        Ok(self.orders.mark_paid(id, Utc::now()).await?)
    }

    /// One-way transition to delivered, then a best-effort delivery
    /// notification. Rejects a second call.
    ///
    /// Delivered does not require paid; the flags are independently
    /// gated.
    #[instrument(skip(self))]
    pub async fn mark_delivered(&self, id: OrderId) -> Result<Order> {
        let order = self.orders.mark_delivered(id, Utc::now()).await?;

        drop(self.dispatcher.dispatch(Notification::OrderDelivered {
            order_id: order.id,
            email: order.shipping_address.email.clone(),
        }));

        Ok(order)
    }

    /// Hard-delete an order.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: OrderId) -> Result<()> {
        Ok(self.orders.delete(id).await?)
    }
}
