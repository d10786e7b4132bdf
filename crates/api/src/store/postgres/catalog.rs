//! Catalog repository.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pomelo_core::{Color, ProductId, Size};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::models::{NewProduct, Product};
use crate::store::{CatalogStore, StoreError};

use super::money;

const PRODUCT_COLUMNS: &str = "id, name, price, discount_percent, stock, sizes, colors, images, \
                               created_at, updated_at";

/// Postgres-backed catalog store.
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    /// Create a catalog store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ProductRow {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub discount_percent: i16,
    pub stock: i32,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, StoreError> {
        let sizes = row
            .sizes
            .iter()
            .map(|s| Size::from_str(s))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::DataCorruption(format!("product {}: {e}", row.id)))?;
        let colors = row
            .colors
            .iter()
            .map(|c| Color::from_str(c))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::DataCorruption(format!("product {}: {e}", row.id)))?;

        Ok(Self {
            id: row.id,
            name: row.name,
            price: money(row.price),
            discount_percent: row.discount_percent,
            stock: row.stock,
            sizes,
            colors,
            images: row.images,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product ORDER BY id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn insert(&self, new: NewProduct) -> Result<Product, StoreError> {
        let sizes: Vec<String> = new.sizes.iter().map(ToString::to_string).collect();
        let colors: Vec<String> = new.colors.iter().map(ToString::to_string).collect();

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO shop.product (name, price, discount_percent, stock, sizes, colors, images)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(new.price.amount)
        .bind(new.discount_percent)
        .bind(new.stock)
        .bind(&sizes)
        .bind(&colors)
        .bind(&new.images)
        .fetch_one(&self.pool)
        .await?;

        Product::try_from(row)
    }
}
