//! Cart repository.
//!
//! `add_line` is the concurrency-sensitive operation: the product row
//! is locked `FOR UPDATE` for the whole read-check-write cycle so two
//! concurrent adds for the same user/product cannot both pass the
//! stock check and jointly overcommit inventory.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pomelo_core::{CartId, CartLineId, Color, ProductId, Size, UserId, VariantKey};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::models::{AddLine, Cart, CartLine, Product, cart};
use crate::store::{CartStore, StoreError};

use super::catalog::ProductRow;
use super::money;

const LINE_COLUMNS: &str =
    "id, cart_id, product_id, color, size, quantity, unit_price, discount_percent, added_at";

/// Postgres-backed cart store.
#[derive(Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    /// Create a cart store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, user: UserId) -> Result<Option<Cart>, StoreError> {
        let cart_row = sqlx::query_as::<_, CartRow>(
            "SELECT id, user_id, created_at, updated_at FROM shop.cart WHERE user_id = $1",
        )
        .bind(user)
        .fetch_optional(&self.pool)
        .await?;

        let Some(cart_row) = cart_row else {
            return Ok(None);
        };

        let line_rows = sqlx::query_as::<_, CartLineRow>(&format!(
            "SELECT {LINE_COLUMNS} FROM shop.cart_line WHERE cart_id = $1 ORDER BY id"
        ))
        .bind(cart_row.id)
        .fetch_all(&self.pool)
        .await?;

        let lines = line_rows
            .into_iter()
            .map(CartLine::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Cart {
            id: cart_row.id,
            user_id: cart_row.user_id,
            lines,
            created_at: cart_row.created_at,
            updated_at: cart_row.updated_at,
        }))
    }
}

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    user_id: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: CartLineId,
    cart_id: CartId,
    product_id: ProductId,
    color: String,
    size: String,
    quantity: i32,
    unit_price: Decimal,
    discount_percent: i16,
    added_at: DateTime<Utc>,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = StoreError;

    fn try_from(row: CartLineRow) -> Result<Self, StoreError> {
        let color = Color::from_str(&row.color)
            .map_err(|e| StoreError::DataCorruption(format!("cart line {}: {e}", row.id)))?;
        let size = Size::from_str(&row.size)
            .map_err(|e| StoreError::DataCorruption(format!("cart line {}: {e}", row.id)))?;

        Ok(Self {
            id: row.id,
            cart_id: row.cart_id,
            key: VariantKey::new(row.product_id, color, size),
            quantity: row.quantity,
            unit_price: money(row.unit_price),
            discount_percent: row.discount_percent,
            added_at: row.added_at,
        })
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn get(&self, user: UserId) -> Result<Option<Cart>, StoreError> {
        self.fetch(user).await
    }

    async fn add_line(&self, user: UserId, req: AddLine) -> Result<Cart, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Lock the product row for the whole merge decision.
        let product_row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, discount_percent, stock, sizes, colors, images,
                    created_at, updated_at
             FROM shop.product WHERE id = $1 FOR UPDATE",
        )
        .bind(req.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("product {}", req.product_id)))?;
        let product = Product::try_from(product_row)?;

        // Upsert the cart row; either way we hold its lock afterwards.
        let cart_id: CartId = sqlx::query_scalar(
            "INSERT INTO shop.cart (user_id) VALUES ($1)
             ON CONFLICT (user_id) DO UPDATE SET updated_at = now()
             RETURNING id",
        )
        .bind(user)
        .fetch_one(&mut *tx)
        .await?;

        let existing: Option<(CartLineId, i32)> = sqlx::query_as(
            "SELECT id, quantity FROM shop.cart_line
             WHERE cart_id = $1 AND product_id = $2 AND color = $3 AND size = $4
             FOR UPDATE",
        )
        .bind(cart_id)
        .bind(req.product_id)
        .bind(req.color.to_string())
        .bind(req.size.to_string())
        .fetch_optional(&mut *tx)
        .await?;

        match existing {
            Some((line_id, in_cart)) => {
                // An error here drops the transaction: the line stays
                // unchanged, no partial merge.
                let merged = cart::merged_quantity(in_cart, req.quantity, product.stock)?;
                sqlx::query("UPDATE shop.cart_line SET quantity = $1 WHERE id = $2")
                    .bind(merged)
                    .bind(line_id)
                    .execute(&mut *tx)
                    .await?;
            }
            None => {
                let (unit_price, discount_percent) = cart::fresh_line_snapshot(&product, req)?;
                sqlx::query(
                    "INSERT INTO shop.cart_line
                         (cart_id, product_id, color, size, quantity, unit_price, discount_percent)
                     VALUES ($1, $2, $3, $4, $5, $6, $7)",
                )
                .bind(cart_id)
                .bind(req.product_id)
                .bind(req.color.to_string())
                .bind(req.size.to_string())
                .bind(req.quantity)
                .bind(unit_price.amount)
                .bind(discount_percent)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        self.fetch(user).await?.ok_or_else(|| {
            StoreError::DataCorruption(format!("cart for user {user} missing after add"))
        })
    }

    async fn remove_line(
        &self,
        user: UserId,
        line: CartLineId,
    ) -> Result<Option<Cart>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let cart_id: Option<CartId> =
            sqlx::query_scalar("SELECT id FROM shop.cart WHERE user_id = $1 FOR UPDATE")
                .bind(user)
                .fetch_optional(&mut *tx)
                .await?;
        let cart_id = cart_id.ok_or_else(|| StoreError::NotFound("cart".to_owned()))?;

        let deleted = sqlx::query("DELETE FROM shop.cart_line WHERE id = $1 AND cart_id = $2")
            .bind(line)
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("cart line {line}")));
        }

        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM shop.cart_line WHERE cart_id = $1")
                .bind(cart_id)
                .fetch_one(&mut *tx)
                .await?;

        // Last line removed: the cart row goes with it.
        if remaining == 0 {
            sqlx::query("DELETE FROM shop.cart WHERE id = $1")
                .bind(cart_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            return Ok(None);
        }

        sqlx::query("UPDATE shop.cart SET updated_at = now() WHERE id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.fetch(user).await
    }

    async fn clear(&self, user: UserId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM shop.cart WHERE user_id = $1")
            .bind(user)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
