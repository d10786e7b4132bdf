//! Catalog product records.

use chrono::{DateTime, Utc};
use pomelo_core::{Color, Money, ProductId, Size};
use serde::Serialize;

/// A catalog product.
///
/// Owned by the catalog store; stock is mutated only by the order
/// creation transaction (decrement, floored at zero).
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// List price before discount.
    pub price: Money,
    /// Percentage discount, 0-100.
    pub discount_percent: i16,
    /// Units on hand. Never negative.
    pub stock: i32,
    /// Sizes this product is sold in. Non-empty.
    pub sizes: Vec<Size>,
    /// Colors this product is sold in. Non-empty.
    pub colors: Vec<Color>,
    /// Image URLs, display order. Non-empty.
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The discount-adjusted unit price, rounded to cents.
    ///
    /// This is the price a cart line snapshots at add-time.
    #[must_use]
    pub fn discounted_unit_price(&self) -> Money {
        self.price
            .discounted(self.discount_percent)
            .unwrap_or(self.price)
    }

    /// Whether the product is offered in this color and size.
    #[must_use]
    pub fn has_variant(&self, color: Color, size: Size) -> bool {
        self.colors.contains(&color) && self.sizes.contains(&size)
    }

    /// The primary (first) image URL, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// Input for inserting a catalog product (seeding, admin tooling).
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub discount_percent: i16,
    pub stock: i32,
    pub sizes: Vec<Size>,
    pub colors: Vec<Color>,
    pub images: Vec<String>,
}
