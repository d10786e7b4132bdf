//! Catalog seeding command.
//!
//! Inserts a handful of sample products so a fresh database has
//! something to sell.

use pomelo_api::models::NewProduct;
use pomelo_api::store::CatalogStore;
use pomelo_api::store::postgres::PgCatalogStore;
use pomelo_core::{Color, Money, Size};
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::{CommandError, required_env};

fn sample_products() -> Vec<NewProduct> {
    let price = |cents: i64| Money {
        amount: Decimal::new(cents, 2),
        currency: pomelo_core::CurrencyCode::Usd,
    };

    vec![
        NewProduct {
            name: "Heavyweight Tee".to_owned(),
            price: price(2400),
            discount_percent: 0,
            stock: 50,
            sizes: vec![Size::S, Size::M, Size::L, Size::Xl],
            colors: vec![Color::Black, Color::White, Color::Navy],
            images: vec!["https://cdn.pomelomarket.dev/img/heavyweight-tee.jpg".to_owned()],
        },
        NewProduct {
            name: "Relaxed Hoodie".to_owned(),
            price: price(6800),
            discount_percent: 15,
            stock: 24,
            sizes: vec![Size::M, Size::L, Size::Xl, Size::Xxl],
            colors: vec![Color::Gray, Color::Black],
            images: vec!["https://cdn.pomelomarket.dev/img/relaxed-hoodie.jpg".to_owned()],
        },
        NewProduct {
            name: "Canvas Tote".to_owned(),
            price: price(1800),
            discount_percent: 0,
            stock: 5,
            sizes: vec![Size::M],
            colors: vec![Color::White, Color::Yellow],
            images: vec!["https://cdn.pomelomarket.dev/img/canvas-tote.jpg".to_owned()],
        },
    ]
}

/// Insert the sample catalog.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert
/// fails.
pub async fn run() -> Result<(), CommandError> {
    let database_url = required_env("POMELO_DATABASE_URL")?;

    let pool = PgPool::connect(&database_url).await?;
    let catalog = PgCatalogStore::new(pool);

    for product in sample_products() {
        let inserted = catalog.insert(product).await?;
        tracing::info!(id = %inserted.id, name = %inserted.name, "seeded product");
    }

    tracing::info!("Seeding complete");
    Ok(())
}
