//! Cart engine: validated cart mutation and display enrichment.

use std::sync::Arc;

use pomelo_core::{CartLineId, Color, ProductId, Size, UserId};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, FieldViolation, Result};
use crate::models::{AddLine, Cart, CartLineView, CartView};
use crate::store::{CartStore, CatalogStore};

/// Add-to-cart request body.
///
/// Color and size arrive as raw strings and are parsed here so a bad
/// value produces a listed violation instead of a deserialization
/// failure.
#[derive(Debug, Deserialize)]
pub struct AddItemInput {
    pub product_id: ProductId,
    pub quantity: i32,
    pub color: String,
    pub size: String,
}

/// Cart operations: add-or-merge, display, removal.
#[derive(Clone)]
pub struct CartEngine {
    catalog: Arc<dyn CatalogStore>,
    carts: Arc<dyn CartStore>,
}

impl CartEngine {
    /// Create a cart engine over its stores.
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogStore>, carts: Arc<dyn CartStore>) -> Self {
        Self { catalog, carts }
    }

    /// Add an item to the user's cart, merging on the variant key.
    ///
    /// # Errors
    ///
    /// `Validation` for a malformed request; `NotFound` for a missing
    /// product; `OutOfStock`/`InsufficientStock` when the stock
    /// ceiling rejects the add.
    #[instrument(skip(self))]
    pub async fn add_item(&self, user: UserId, input: AddItemInput) -> Result<CartView> {
        let req = validate_add_item(&input)?;
        let cart = self.carts.add_line(user, req).await?;
        self.enrich(cart).await
    }

    /// The user's cart, enriched for display. `None` when no cart
    /// exists.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user: UserId) -> Result<Option<CartView>> {
        match self.carts.get(user).await? {
            Some(cart) => Ok(Some(self.enrich(cart).await?)),
            None => Ok(None),
        }
    }

    /// Remove one line. When the last line goes, the cart goes with
    /// it and an empty view is returned.
    ///
    /// # Errors
    ///
    /// `NotFound` when the cart or the line doesn't exist.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user: UserId, line: CartLineId) -> Result<CartView> {
        match self.carts.remove_line(user, line).await? {
            Some(cart) => self.enrich(cart).await,
            None => Ok(CartView::empty()),
        }
    }

    /// Join cart lines with current product name/price for display.
    /// Snapshot prices stay authoritative for totals.
    async fn enrich(&self, cart: Cart) -> Result<CartView> {
        let items_total = cart.items_total();
        let mut lines = Vec::with_capacity(cart.lines.len());
        for line in cart.lines {
            let product = self.catalog.get(line.key.product).await?;
            let (name, current_price, image) = match product {
                Some(p) => {
                    let image = p.primary_image().map(ToOwned::to_owned);
                    let price = p.discounted_unit_price();
                    (p.name, price, image)
                }
                // Product deleted since the add; fall back to the
                // snapshot so the line still renders.
                None => ("(no longer available)".to_owned(), line.unit_price, None),
            };
            lines.push(CartLineView {
                line_id: line.id,
                product_id: line.key.product,
                name,
                color: line.key.color,
                size: line.key.size,
                quantity: line.quantity,
                unit_price: line.unit_price,
                discount_percent: line.discount_percent,
                final_unit_price: line.final_unit_price(),
                line_total: line.line_total(),
                current_price,
                image,
            });
        }

        Ok(CartView {
            cart_id: Some(cart.id),
            lines,
            items_total,
        })
    }
}

/// Collect-all validation of an add-to-cart request.
fn validate_add_item(input: &AddItemInput) -> Result<AddLine> {
    let mut violations = Vec::new();

    if input.quantity < 1 {
        violations.push(FieldViolation::new(
            "quantity",
            "must be at least 1".to_owned(),
        ));
    }

    let color = if input.color.is_empty() {
        violations.push(FieldViolation::new("color", "is required"));
        None
    } else {
        match input.color.parse::<Color>() {
            Ok(color) => Some(color),
            Err(e) => {
                violations.push(FieldViolation::new("color", e.to_string()));
                None
            }
        }
    };

    let size = if input.size.is_empty() {
        violations.push(FieldViolation::new("size", "is required"));
        None
    } else {
        match input.size.parse::<Size>() {
            Ok(size) => Some(size),
            Err(e) => {
                violations.push(FieldViolation::new("size", e.to_string()));
                None
            }
        }
    };

    match (color, size) {
        (Some(color), Some(size)) if violations.is_empty() => Ok(AddLine {
            product_id: input.product_id,
            quantity: input.quantity,
            color,
            size,
        }),
        _ => Err(AppError::Validation(violations)),
    }
}
