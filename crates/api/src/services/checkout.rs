//! Checkout orchestrator: cart snapshot in, persisted order out.
//!
//! The sequence is: collect-all validation, product resolution,
//! payment authorization, then the single order-creation transaction
//! (order + payment + stock decrement), then cart cleanup. A failure
//! at any step before the transaction leaves no trace; the
//! idempotency key makes a retry after a successful charge safe to
//! replay.

use std::sync::{Arc, LazyLock};

use pomelo_core::{Email, Money, ProductId, UserId};
use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, FieldViolation, Result};
use crate::models::{Order, OrderDraft, OrderItemDraft, PaymentDraft, ShippingAddress};
use crate::services::orders::OrderLedger;
use crate::services::payment::PaymentGateway;
use crate::store::{CartStore, CatalogStore};

/// E.164-ish: optional `+`, 7-15 digits, no leading zero.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9][0-9]{6,14}$").expect("phone pattern is valid"));

/// Postal codes: 3-10 alphanumerics with optional inner space/hyphen.
static POSTAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 \-]{1,8}[A-Za-z0-9]$").expect("postal pattern is valid")
});

/// One line of the checkout request.
#[derive(Debug, Deserialize)]
pub struct CheckoutItemInput {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Shipping address as submitted; validated field by field.
#[derive(Debug, Deserialize)]
pub struct ShippingAddressInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
}

/// Checkout request body.
#[derive(Debug, Deserialize)]
pub struct CheckoutInput {
    #[serde(default)]
    pub order_items: Vec<CheckoutItemInput>,
    pub shipping_address: ShippingAddressInput,
    #[serde(default)]
    pub payment_method: String,
    /// Provider payment-method token from the browser.
    pub payment_token: Option<String>,
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
    /// Replay key; also accepted via the `Idempotency-Key` header.
    pub idempotency_key: Option<String>,
}

/// A checkout request that passed validation.
#[derive(Debug)]
struct ValidatedCheckout {
    items: Vec<(ProductId, i32)>,
    shipping_address: ShippingAddress,
    payment_method: String,
    items_price: Money,
    tax_price: Money,
    shipping_price: Money,
    total_price: Money,
}

/// Converts a cart snapshot into a persisted order, charging the
/// payment provider in between.
#[derive(Clone)]
pub struct CheckoutOrchestrator {
    catalog: Arc<dyn CatalogStore>,
    carts: Arc<dyn CartStore>,
    ledger: OrderLedger,
    gateway: Arc<dyn PaymentGateway>,
}

impl CheckoutOrchestrator {
    /// Create an orchestrator over its collaborators.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        carts: Arc<dyn CartStore>,
        ledger: OrderLedger,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            catalog,
            carts,
            ledger,
            gateway,
        }
    }

    /// Run the full checkout sequence for a user.
    ///
    /// # Errors
    ///
    /// `Validation` with every violated field; `NotFound` naming the
    /// first unresolvable product (the whole checkout aborts);
    /// `Payment` errors per the provider taxonomy, before any order
    /// or stock mutation.
    #[instrument(skip(self, input))]
    pub async fn checkout(&self, user: UserId, input: CheckoutInput) -> Result<Order> {
        let validated = validate_checkout(&input)?;

        // Resolve every product and snapshot its current state. A
        // missing id aborts the whole checkout - no partial orders.
        let mut items = Vec::with_capacity(validated.items.len());
        for &(product_id, quantity) in &validated.items {
            let product = self
                .catalog
                .get(product_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;
            items.push(OrderItemDraft {
                product_id,
                name: product.name.clone(),
                quantity,
                unit_price: product.discounted_unit_price(),
                image: product.primary_image().map(ToOwned::to_owned),
            });
        }

        // Authorize the charge. Provider failure aborts with no order
        // and no stock change.
        let intent = self
            .gateway
            .create_intent(
                validated.total_price,
                input.payment_token.as_deref(),
                input.idempotency_key.as_deref(),
            )
            .await?;

        let draft = OrderDraft {
            user_id: user,
            items,
            shipping_address: validated.shipping_address,
            payment_method: validated.payment_method.clone(),
            items_price: validated.items_price,
            tax_price: validated.tax_price,
            shipping_price: validated.shipping_price,
            total_price: validated.total_price,
            idempotency_key: input.idempotency_key.clone(),
            payment: PaymentDraft {
                method: validated.payment_method,
                provider_ref: Some(intent.id.clone()),
                provider_status: Some(intent.status.clone()),
                card_brand: intent.card_brand.clone(),
                card_last4: intent.card_last4.clone(),
                amount: validated.total_price,
                paid: intent.succeeded(),
            },
        };

        let placed = self.ledger.place_order(draft).await?;

        // The cart served its purpose. Clearing after a replay is a
        // no-op.
        self.carts.clear(user).await?;

        Ok(placed.order)
    }
}

/// Collect-all validation: every violated field is reported, not just
/// the first.
fn validate_checkout(input: &CheckoutInput) -> Result<ValidatedCheckout> {
    let mut violations = Vec::new();

    if input.order_items.is_empty() {
        violations.push(FieldViolation::new("order_items", "must not be empty"));
    }
    for (index, item) in input.order_items.iter().enumerate() {
        if item.quantity < 1 {
            violations.push(FieldViolation::new(
                format!("order_items[{index}].quantity"),
                "must be at least 1",
            ));
        }
    }

    let addr = &input.shipping_address;
    if let Err(e) = Email::parse(&addr.email) {
        violations.push(FieldViolation::new("shipping_address.email", e.to_string()));
    }
    if !PHONE_RE.is_match(&addr.phone) {
        violations.push(FieldViolation::new(
            "shipping_address.phone",
            "must be an international phone number",
        ));
    }
    if addr.address.trim().is_empty() {
        violations.push(FieldViolation::new("shipping_address.address", "is required"));
    }
    if addr.city.trim().is_empty() {
        violations.push(FieldViolation::new("shipping_address.city", "is required"));
    }
    if !POSTAL_RE.is_match(&addr.postal_code) {
        violations.push(FieldViolation::new(
            "shipping_address.postal_code",
            "must be a valid postal code",
        ));
    }
    if addr.country.trim().is_empty() {
        violations.push(FieldViolation::new("shipping_address.country", "is required"));
    }

    if input.payment_method.trim().is_empty() {
        violations.push(FieldViolation::new("payment_method", "is required"));
    }

    let mut price = |field: &str, amount: Decimal| -> Option<Money> {
        match Money::usd(amount) {
            Ok(money) => Some(money),
            Err(_) => {
                violations.push(FieldViolation::new(field, "must not be negative"));
                None
            }
        }
    };
    let items_price = price("items_price", input.items_price);
    let tax_price = price("tax_price", input.tax_price);
    let shipping_price = price("shipping_price", input.shipping_price);
    let total_price = price("total_price", input.total_price);

    if let (Some(items), Some(tax), Some(shipping), Some(total)) =
        (items_price, tax_price, shipping_price, total_price)
        && items.amount + tax.amount + shipping.amount != total.amount
    {
        violations.push(FieldViolation::new(
            "total_price",
            "must equal items_price + tax_price + shipping_price",
        ));
    }

    if !violations.is_empty() {
        return Err(AppError::Validation(violations));
    }

    let (Some(items_price), Some(tax_price), Some(shipping_price), Some(total_price)) =
        (items_price, tax_price, shipping_price, total_price)
    else {
        // Unreachable: a None always pushes a violation above.
        return Err(AppError::Internal("price validation desync".to_owned()));
    };

    Ok(ValidatedCheckout {
        items: input
            .order_items
            .iter()
            .map(|i| (i.product_id, i.quantity))
            .collect(),
        shipping_address: ShippingAddress {
            email: addr.email.clone(),
            phone: addr.phone.clone(),
            address: addr.address.trim().to_owned(),
            city: addr.city.trim().to_owned(),
            postal_code: addr.postal_code.clone(),
            country: addr.country.trim().to_owned(),
        },
        payment_method: input.payment_method.clone(),
        items_price,
        tax_price,
        shipping_price,
        total_price,
    })
}
