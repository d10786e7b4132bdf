//! `PostgreSQL` store implementations.
//!
//! # Schema: `shop`
//!
//! - `product` - catalog records (price, discount, stock, variant axes)
//! - `cart` / `cart_line` - one cart per user, lines keyed by
//!   (cart, product, color, size)
//! - `order` / `order_item` - immutable order snapshots with one-way
//!   paid/delivered flags
//! - `payment` - one payment per order
//!
//! Migrations live in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p pomelo-cli -- migrate
//! ```
//!
//! Queries use the runtime sqlx API so the workspace builds without a
//! live database.

mod cart;
mod catalog;
mod orders;
mod payments;

pub use cart::PgCartStore;
pub use catalog::PgCatalogStore;
pub use orders::PgOrderStore;
pub use payments::PgPaymentStore;

use std::time::Duration;

use pomelo_core::{CurrencyCode, Money};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// The store runs single-currency; amounts persist as bare numerics.
pub(crate) const STORE_CURRENCY: CurrencyCode = CurrencyCode::Usd;

/// Wrap a database amount in [`Money`]. Non-negativity is enforced by
/// CHECK constraints, so no re-validation here.
pub(crate) const fn money(amount: Decimal) -> Money {
    Money {
        amount,
        currency: STORE_CURRENCY,
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
