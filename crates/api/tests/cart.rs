//! Cart engine integration tests over the in-memory store.

mod common;

use common::{harness, seed_product};
use pomelo_api::error::AppError;
use pomelo_api::services::cart::AddItemInput;
use pomelo_api::store::StoreError;
use pomelo_core::{ProductId, UserId};
use rust_decimal_macros::dec;

fn add(product: ProductId, quantity: i32, color: &str, size: &str) -> AddItemInput {
    AddItemInput {
        product_id: product,
        quantity,
        color: color.to_owned(),
        size: size.to_owned(),
    }
}

const USER: UserId = UserId::new(1);

#[tokio::test]
async fn adding_twice_merges_into_one_line() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 2000, 0, 10).await;
    let engine = h.state.cart_engine();

    engine
        .add_item(USER, add(product.id, 2, "black", "m"))
        .await
        .expect("first add");
    let cart = engine
        .add_item(USER, add(product.id, 3, "black", "m"))
        .await
        .expect("merge add");

    assert_eq!(cart.lines.len(), 1, "merge must not create a second line");
    let line = cart.lines.first().expect("one line");
    assert_eq!(line.quantity, 5);
}

#[tokio::test]
async fn different_variant_gets_its_own_line() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 2000, 0, 10).await;
    let engine = h.state.cart_engine();

    engine
        .add_item(USER, add(product.id, 1, "black", "m"))
        .await
        .expect("black/m");
    let cart = engine
        .add_item(USER, add(product.id, 1, "black", "l"))
        .await
        .expect("black/l");

    assert_eq!(cart.lines.len(), 2);
}

#[tokio::test]
async fn fresh_add_beyond_stock_is_out_of_stock() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 2000, 0, 2).await;

    let err = h
        .state
        .cart_engine()
        .add_item(USER, add(product.id, 3, "black", "m"))
        .await
        .expect_err("short stock");

    assert!(matches!(
        err,
        AppError::Store(StoreError::Cart(
            pomelo_api::models::CartError::OutOfStock { .. }
        ))
    ));
}

#[tokio::test]
async fn merge_beyond_stock_fails_and_leaves_line_unchanged() {
    // stock=5: adding 3 fits, merging another 3 would overcommit, and
    // the rejected merge must leave the original line untouched.
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 2000, 0, 5).await;
    let engine = h.state.cart_engine();

    engine
        .add_item(USER, add(product.id, 3, "black", "m"))
        .await
        .expect("first add fits");

    let err = engine
        .add_item(USER, add(product.id, 3, "black", "m"))
        .await
        .expect_err("merge would exceed stock");
    assert!(matches!(
        err,
        AppError::Store(StoreError::Cart(
            pomelo_api::models::CartError::InsufficientStock { .. }
        ))
    ));

    let cart = engine
        .get_cart(USER)
        .await
        .expect("get")
        .expect("cart exists");
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines.first().expect("line").quantity, 3);
}

#[tokio::test]
async fn line_quantity_never_exceeds_stock_at_add_time() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 2000, 0, 4).await;
    let engine = h.state.cart_engine();

    for _ in 0..10 {
        let _ = engine.add_item(USER, add(product.id, 1, "black", "m")).await;
    }

    let cart = engine
        .get_cart(USER)
        .await
        .expect("get")
        .expect("cart exists");
    assert_eq!(cart.lines.first().expect("line").quantity, 4);
}

#[tokio::test]
async fn missing_product_is_not_found() {
    let h = harness();
    let err = h
        .state
        .cart_engine()
        .add_item(USER, add(ProductId::new(999), 1, "black", "m"))
        .await
        .expect_err("missing product");
    assert!(matches!(err, AppError::Store(StoreError::NotFound(_))));
}

#[tokio::test]
async fn unoffered_variant_is_rejected() {
    let h = harness();
    // Seeded products come in black/white, xs..l only.
    let product = seed_product(&h.catalog, "tee", 2000, 0, 10).await;

    let err = h
        .state
        .cart_engine()
        .add_item(USER, add(product.id, 1, "red", "m"))
        .await
        .expect_err("red not offered");
    assert!(matches!(
        err,
        AppError::Store(StoreError::Cart(
            pomelo_api::models::CartError::UnknownVariant { .. }
        ))
    ));
}

#[tokio::test]
async fn price_is_snapshotted_with_discount_at_add_time() {
    let h = harness();
    let product = seed_product(&h.catalog, "hoodie", 6800, 15, 10).await;

    let cart = h
        .state
        .cart_engine()
        .add_item(USER, add(product.id, 2, "black", "m"))
        .await
        .expect("add");

    let line = cart.lines.first().expect("line");
    assert_eq!(line.unit_price.amount, dec!(68.00));
    assert_eq!(line.discount_percent, 15);
    assert_eq!(line.final_unit_price.amount, dec!(57.80));
    assert_eq!(line.line_total.amount, dec!(115.60));
    assert_eq!(cart.items_total.amount, dec!(115.60));
}

#[tokio::test]
async fn removing_the_last_line_deletes_the_cart() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 2000, 0, 10).await;
    let engine = h.state.cart_engine();

    let cart = engine
        .add_item(USER, add(product.id, 1, "black", "m"))
        .await
        .expect("add");
    let line_id = cart.lines.first().expect("line").line_id;

    let after = engine.remove_item(USER, line_id).await.expect("remove");
    assert!(after.lines.is_empty());
    assert!(after.cart_id.is_none(), "cart record should be gone");

    // No stale cart: a fresh GET sees nothing at all.
    assert!(engine.get_cart(USER).await.expect("get").is_none());
}

#[tokio::test]
async fn removing_one_of_two_lines_keeps_the_cart() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 2000, 0, 10).await;
    let engine = h.state.cart_engine();

    engine
        .add_item(USER, add(product.id, 1, "black", "m"))
        .await
        .expect("add m");
    let cart = engine
        .add_item(USER, add(product.id, 1, "white", "l"))
        .await
        .expect("add l");
    let first_line = cart.lines.first().expect("line").line_id;

    let after = engine.remove_item(USER, first_line).await.expect("remove");
    assert_eq!(after.lines.len(), 1);
    assert!(after.cart_id.is_some());
}

#[tokio::test]
async fn removing_a_missing_line_is_not_found() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 2000, 0, 10).await;
    let engine = h.state.cart_engine();

    engine
        .add_item(USER, add(product.id, 1, "black", "m"))
        .await
        .expect("add");

    let err = engine
        .remove_item(USER, pomelo_core::CartLineId::new(9999))
        .await
        .expect_err("missing line");
    assert!(matches!(err, AppError::Store(StoreError::NotFound(_))));
}

#[tokio::test]
async fn get_cart_enriches_lines_with_current_product_data() {
    let h = harness();
    let product = seed_product(&h.catalog, "tote", 1800, 0, 10).await;

    h.state
        .cart_engine()
        .add_item(USER, add(product.id, 1, "black", "m"))
        .await
        .expect("add");

    let cart = h
        .state
        .cart_engine()
        .get_cart(USER)
        .await
        .expect("get")
        .expect("cart");
    let line = cart.lines.first().expect("line");
    assert_eq!(line.name, "tote");
    assert_eq!(line.current_price.amount, dec!(18.00));
    assert!(line.image.is_some());
}
