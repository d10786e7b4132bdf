//! Cart lines and the merge/stock rules that govern them.
//!
//! The functions here are pure: both store implementations call them
//! from inside their atomic region, so the stock ceiling is enforced
//! exactly once, in one place.

use chrono::{DateTime, Utc};
use pomelo_core::{CartId, CartLineId, Color, Money, ProductId, Size, UserId, VariantKey};
use serde::Serialize;

use super::product::Product;

/// Domain errors raised while mutating a cart.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Quantity must be at least one.
    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    /// The product is not offered in the requested color/size.
    #[error("product {product} is not offered in {color}/{size}")]
    UnknownVariant {
        product: ProductId,
        color: Color,
        size: Size,
    },

    /// A fresh line asks for more units than are on hand.
    #[error("out of stock: {requested} requested, {available} available")]
    OutOfStock { requested: i32, available: i32 },

    /// Merging into an existing line would exceed current stock.
    /// The existing line is left unchanged.
    #[error(
        "insufficient stock: {in_cart} in cart + {requested} requested exceeds {available} available"
    )]
    InsufficientStock {
        in_cart: i32,
        requested: i32,
        available: i32,
    },
}

/// One line of a cart: a variant key plus quantity and the price
/// snapshot taken when the line was first added.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub id: CartLineId,
    pub cart_id: CartId,
    pub key: VariantKey,
    pub quantity: i32,
    /// Unit price captured at add-time. Not recomputed later.
    pub unit_price: Money,
    /// Discount percent captured at add-time.
    pub discount_percent: i16,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// The discount-adjusted unit price this line was locked at.
    #[must_use]
    pub fn final_unit_price(&self) -> Money {
        self.unit_price
            .discounted(self.discount_percent)
            .unwrap_or(self.unit_price)
    }

    /// Final unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.final_unit_price()
            .times(u32::try_from(self.quantity).unwrap_or(0))
    }
}

/// A user's cart. Created lazily on first add, deleted when the last
/// line is removed or checkout succeeds.
#[derive(Debug, Clone)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Sum of line totals.
    #[must_use]
    pub fn items_total(&self) -> Money {
        self.lines.iter().fold(
            Money::zero(pomelo_core::CurrencyCode::Usd),
            |acc, line| {
                acc.checked_add(line.line_total()).unwrap_or(acc)
            },
        )
    }
}

/// Typed input to `CartStore::add_line`.
#[derive(Debug, Clone, Copy)]
pub struct AddLine {
    pub product_id: ProductId,
    pub quantity: i32,
    pub color: Color,
    pub size: Size,
}

/// Validate a fresh (non-merging) add against the product.
///
/// Checks the stock ceiling and the variant axes, and returns the
/// price snapshot `(unit_price, discount_percent)` the new line locks
/// in.
///
/// # Errors
///
/// Returns [`CartError`] if the quantity is invalid, the variant is
/// not offered, or stock is short.
pub fn fresh_line_snapshot(product: &Product, req: AddLine) -> Result<(Money, i16), CartError> {
    if req.quantity < 1 {
        return Err(CartError::InvalidQuantity(req.quantity));
    }
    if !product.has_variant(req.color, req.size) {
        return Err(CartError::UnknownVariant {
            product: product.id,
            color: req.color,
            size: req.size,
        });
    }
    if product.stock < req.quantity {
        return Err(CartError::OutOfStock {
            requested: req.quantity,
            available: product.stock,
        });
    }
    Ok((product.price, product.discount_percent))
}

/// Compute the merged quantity for an add that hits an existing line.
///
/// The merge must not push the line past current stock; when it
/// would, the line is left unchanged (no partial merge).
///
/// # Errors
///
/// Returns [`CartError::InsufficientStock`] when `in_cart + requested`
/// exceeds `stock`, and [`CartError::InvalidQuantity`] for a
/// non-positive request.
pub fn merged_quantity(in_cart: i32, requested: i32, stock: i32) -> Result<i32, CartError> {
    if requested < 1 {
        return Err(CartError::InvalidQuantity(requested));
    }
    let merged = in_cart.saturating_add(requested);
    if merged > stock {
        return Err(CartError::InsufficientStock {
            in_cart,
            requested,
            available: stock,
        });
    }
    Ok(merged)
}

// =============================================================================
// Display views
// =============================================================================

/// A cart line enriched with current product data for display.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub line_id: CartLineId,
    pub product_id: ProductId,
    /// Current product name (not snapshotted).
    pub name: String,
    pub color: Color,
    pub size: Size,
    pub quantity: i32,
    /// Unit price locked at add-time.
    pub unit_price: Money,
    pub discount_percent: i16,
    /// Discount-adjusted unit price.
    pub final_unit_price: Money,
    pub line_total: Money,
    /// Current product price, for "price changed" display.
    pub current_price: Money,
    pub image: Option<String>,
}

/// A cart ready for display: lines enriched with current product
/// name/price.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    /// `None` once the cart has been deleted (last line removed).
    pub cart_id: Option<CartId>,
    pub lines: Vec<CartLineView>,
    pub items_total: Money,
}

impl CartView {
    /// An empty view for a cart that no longer exists.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            cart_id: None,
            lines: Vec::new(),
            items_total: Money::zero(pomelo_core::CurrencyCode::Usd),
        }
    }
}
