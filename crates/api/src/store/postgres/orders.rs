//! Order repository.
//!
//! `create` is the checkout transaction: order row, item snapshots,
//! payment record, and the stock decrement all commit or roll back
//! together. The idempotency key turns a replayed creation into a
//! read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pomelo_core::{OrderId, OrderItemId, ProductId, UserId};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{Order, OrderDraft, OrderItem, PlacedOrder, ShippingAddress, StockLevel};
use crate::store::{OrderStore, StoreError};

use super::money;
use super::payments::PaymentRow;

const ORDER_COLUMNS: &str = "id, user_id, email, phone, address, city, postal_code, country, \
                             payment_method, items_price, tax_price, shipping_price, total_price, \
                             is_paid, paid_at, is_delivered, delivered_at, idempotency_key, \
                             created_at";

/// Postgres-backed order store.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create an order store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(self.with_items(row).await?))
    }

    async fn with_items(&self, row: OrderRow) -> Result<Order, StoreError> {
        let items = sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, product_id, name, quantity, unit_price, image
             FROM shop.order_item WHERE order_id = $1 ORDER BY id",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(row.into_order(items))
    }

    /// Load the stored order + payment for a replayed idempotency key.
    async fn fetch_replay(&self, id: OrderId) -> Result<PlacedOrder, StoreError> {
        let order = self
            .fetch(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("order {id}")))?;

        let payment = sqlx::query_as::<_, PaymentRow>(
            "SELECT id, order_id, method, provider_ref, provider_status, card_brand, card_last4,
                    amount, is_paid, paid_at, created_at
             FROM shop.payment WHERE order_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::DataCorruption(format!("order {id} has no payment")))?;

        Ok(PlacedOrder {
            order,
            payment: payment.into_payment(),
            stock_after: Vec::new(),
            replayed: true,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    email: String,
    phone: String,
    address: String,
    city: String,
    postal_code: String,
    country: String,
    payment_method: String,
    items_price: Decimal,
    tax_price: Decimal,
    shipping_price: Decimal,
    total_price: Decimal,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    is_delivered: bool,
    delivered_at: Option<DateTime<Utc>>,
    idempotency_key: Option<String>,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItemRow>) -> Order {
        Order {
            id: self.id,
            user_id: self.user_id,
            items: items.into_iter().map(OrderItemRow::into_item).collect(),
            shipping_address: ShippingAddress {
                email: self.email,
                phone: self.phone,
                address: self.address,
                city: self.city,
                postal_code: self.postal_code,
                country: self.country,
            },
            payment_method: self.payment_method,
            items_price: money(self.items_price),
            tax_price: money(self.tax_price),
            shipping_price: money(self.shipping_price),
            total_price: money(self.total_price),
            is_paid: self.is_paid,
            paid_at: self.paid_at,
            is_delivered: self.is_delivered,
            delivered_at: self.delivered_at,
            idempotency_key: self.idempotency_key,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    product_id: ProductId,
    name: String,
    quantity: i32,
    unit_price: Decimal,
    image: Option<String>,
}

impl OrderItemRow {
    fn into_item(self) -> OrderItem {
        OrderItem {
            id: self.id,
            product_id: self.product_id,
            name: self.name,
            quantity: self.quantity,
            unit_price: money(self.unit_price),
            image: self.image,
        }
    }
}

/// Decrement stock for one item, floored at zero, returning the new
/// level.
async fn decrement_stock(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    quantity: i32,
) -> Result<StockLevel, StoreError> {
    let row: Option<(ProductId, String, i32)> = sqlx::query_as(
        "UPDATE shop.product
         SET stock = GREATEST(stock - $1, 0), updated_at = now()
         WHERE id = $2
         RETURNING id, name, stock",
    )
    .bind(quantity)
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await?;

    let (id, name, stock) =
        row.ok_or_else(|| StoreError::NotFound(format!("product {product_id}")))?;
    Ok(StockLevel {
        product_id: id,
        name,
        stock,
    })
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create(&self, draft: OrderDraft) -> Result<PlacedOrder, StoreError> {
        // Fast path for a replayed key, before opening a transaction.
        if let Some(key) = draft.idempotency_key.as_deref() {
            let existing: Option<OrderId> =
                sqlx::query_scalar("SELECT id FROM shop.order WHERE idempotency_key = $1")
                    .bind(key)
                    .fetch_optional(&self.pool)
                    .await?;
            if let Some(id) = existing {
                return self.fetch_replay(id).await;
            }
        }

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO shop.order
                 (user_id, email, phone, address, city, postal_code, country, payment_method,
                  items_price, tax_price, shipping_price, total_price, idempotency_key)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(draft.user_id)
        .bind(&draft.shipping_address.email)
        .bind(&draft.shipping_address.phone)
        .bind(&draft.shipping_address.address)
        .bind(&draft.shipping_address.city)
        .bind(&draft.shipping_address.postal_code)
        .bind(&draft.shipping_address.country)
        .bind(&draft.payment_method)
        .bind(draft.items_price.amount)
        .bind(draft.tax_price.amount)
        .bind(draft.shipping_price.amount)
        .bind(draft.total_price.amount)
        .bind(draft.idempotency_key.as_deref())
        .fetch_one(&mut *tx)
        .await;

        let order_row = match inserted {
            Ok(row) => row,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                // A concurrent request with the same idempotency key
                // won the race; serve its order.
                drop(tx);
                let key = draft.idempotency_key.as_deref().unwrap_or_default();
                let id: OrderId =
                    sqlx::query_scalar("SELECT id FROM shop.order WHERE idempotency_key = $1")
                        .bind(key)
                        .fetch_one(&self.pool)
                        .await?;
                return self.fetch_replay(id).await;
            }
            Err(e) => return Err(e.into()),
        };

        let mut items = Vec::with_capacity(draft.items.len());
        let mut stock_after = Vec::with_capacity(draft.items.len());
        for item in &draft.items {
            let item_row = sqlx::query_as::<_, OrderItemRow>(
                "INSERT INTO shop.order_item (order_id, product_id, name, quantity, unit_price, image)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING id, product_id, name, quantity, unit_price, image",
            )
            .bind(order_row.id)
            .bind(item.product_id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.unit_price.amount)
            .bind(item.image.as_deref())
            .fetch_one(&mut *tx)
            .await?;
            items.push(item_row);

            stock_after.push(decrement_stock(&mut tx, item.product_id, item.quantity).await?);
        }

        let payment_row = sqlx::query_as::<_, PaymentRow>(
            "INSERT INTO shop.payment
                 (order_id, method, provider_ref, provider_status, card_brand, card_last4,
                  amount, is_paid, paid_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, CASE WHEN $8 THEN now() ELSE NULL END)
             RETURNING id, order_id, method, provider_ref, provider_status, card_brand, card_last4,
                       amount, is_paid, paid_at, created_at",
        )
        .bind(order_row.id)
        .bind(&draft.payment.method)
        .bind(draft.payment.provider_ref.as_deref())
        .bind(draft.payment.provider_status.as_deref())
        .bind(draft.payment.card_brand.as_deref())
        .bind(draft.payment.card_last4.as_deref())
        .bind(draft.payment.amount.amount)
        .bind(draft.payment.paid)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(PlacedOrder {
            order: order_row.into_order(items),
            payment: payment_row.into_payment(),
            stock_after,
            replayed: false,
        })
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.fetch(id).await
    }

    async fn list_by_user(&self, user: UserId) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.order WHERE user_id = $1 ORDER BY id DESC"
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(self.with_items(row).await?);
        }
        Ok(orders)
    }

    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.order ORDER BY id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(self.with_items(row).await?);
        }
        Ok(orders)
    }

    async fn mark_paid(&self, id: OrderId, at: DateTime<Utc>) -> Result<Order, StoreError> {
        let updated = sqlx::query(
            "UPDATE shop.order SET is_paid = TRUE, paid_at = $2 WHERE id = $1 AND is_paid = FALSE",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return match self.fetch(id).await? {
                Some(_) => Err(StoreError::AlreadyPaid(id)),
                None => Err(StoreError::NotFound(format!("order {id}"))),
            };
        }

        self.fetch(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("order {id}")))
    }

    async fn mark_delivered(&self, id: OrderId, at: DateTime<Utc>) -> Result<Order, StoreError> {
        let updated = sqlx::query(
            "UPDATE shop.order
             SET is_delivered = TRUE, delivered_at = $2
             WHERE id = $1 AND is_delivered = FALSE",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return match self.fetch(id).await? {
                Some(_) => Err(StoreError::AlreadyDelivered(id)),
                None => Err(StoreError::NotFound(format!("order {id}"))),
            };
        }

        self.fetch(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("order {id}")))
    }

    async fn delete(&self, id: OrderId) -> Result<(), StoreError> {
        let deleted = sqlx::query("DELETE FROM shop.order WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("order {id}")));
        }
        Ok(())
    }
}
