//! Checkout orchestrator integration tests: the full
//! validate-charge-persist sequence over the in-memory store and the
//! scripted gateway.

mod common;

use common::{checkout_input, harness, seed_product, wait_until};
use pomelo_api::error::AppError;
use pomelo_api::services::cart::AddItemInput;
use pomelo_api::services::payment::PaymentError;
use pomelo_api::store::{CatalogStore, OrderStore, PaymentStore};
use pomelo_core::{ProductId, UserId};
use rust_decimal_macros::dec;

const USER: UserId = UserId::new(1);

#[tokio::test]
async fn empty_cart_checkout_fails_validation_and_creates_nothing() {
    let h = harness();

    let input = checkout_input(&[], dec!(0), dec!(0), dec!(0));
    let err = h
        .state
        .checkout()
        .checkout(USER, input)
        .await
        .expect_err("empty items");

    assert!(matches!(err, AppError::Validation(_)));
    assert!(h.orders.list_all().await.expect("list").is_empty());
    assert_eq!(h.gateway.calls(), 0, "no charge attempt");
}

#[tokio::test]
async fn failed_payment_creates_no_order_and_decrements_no_stock() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 5000, 0, 10).await;
    h.gateway
        .push_error(PaymentError::Card("Your card was declined.".to_owned()));

    let input = checkout_input(&[(product.id, 2)], dec!(100.00), dec!(0), dec!(0));
    let err = h
        .state
        .checkout()
        .checkout(USER, input)
        .await
        .expect_err("declined");

    assert!(matches!(err, AppError::Payment(PaymentError::Card(_))));
    assert!(h.orders.list_all().await.expect("list").is_empty());
    let after = h.catalog.get(product.id).await.expect("get").expect("product");
    assert_eq!(after.stock, 10, "stock untouched");
}

#[tokio::test]
async fn successful_checkout_creates_unpaid_order_and_decrements_stock() {
    // Payment and order are separate records: the order itself starts
    // unpaid even when the charge settled, and stock drops by the
    // ordered quantity.
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 5000, 0, 10).await;

    let input = checkout_input(&[(product.id, 2)], dec!(100.00), dec!(0), dec!(0));
    let order = h
        .state
        .checkout()
        .checkout(USER, input)
        .await
        .expect("checkout");

    assert!(!order.is_paid, "order starts unpaid");
    assert!(order.paid_at.is_none());
    assert_eq!(order.total_price.amount, dec!(100.00));
    assert_eq!(order.items.len(), 1);
    let item = order.items.first().expect("item");
    assert_eq!(item.quantity, 2);
    assert_eq!(item.name, "tee");
    assert_eq!(item.unit_price.amount, dec!(50.00));

    let after = h.catalog.get(product.id).await.expect("get").expect("product");
    assert_eq!(after.stock, 8);

    // The linked payment carries the provider result.
    let payment = h
        .payments
        .get_by_order(order.id)
        .await
        .expect("get payment")
        .expect("payment exists");
    assert!(payment.is_paid);
    assert_eq!(payment.amount.amount, dec!(100.00));
    assert!(payment.provider_ref.is_some());
    assert_eq!(payment.card_last4.as_deref(), Some("4242"));
}

#[tokio::test]
async fn order_items_snapshot_current_discounted_price() {
    let h = harness();
    let product = seed_product(&h.catalog, "hoodie", 6800, 15, 10).await;

    let input = checkout_input(&[(product.id, 1)], dec!(57.80), dec!(0), dec!(0));
    let order = h
        .state
        .checkout()
        .checkout(USER, input)
        .await
        .expect("checkout");

    assert_eq!(
        order.items.first().expect("item").unit_price.amount,
        dec!(57.80)
    );
}

#[tokio::test]
async fn unknown_product_aborts_the_whole_checkout() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 5000, 0, 10).await;

    let input = checkout_input(
        &[(product.id, 1), (ProductId::new(999), 1)],
        dec!(100.00),
        dec!(0),
        dec!(0),
    );
    let err = h
        .state
        .checkout()
        .checkout(USER, input)
        .await
        .expect_err("missing product");

    let AppError::NotFound(message) = err else {
        panic!("expected NotFound, got {err:?}");
    };
    assert!(message.contains("999"), "names the missing id: {message}");

    assert!(h.orders.list_all().await.expect("list").is_empty());
    let after = h.catalog.get(product.id).await.expect("get").expect("product");
    assert_eq!(after.stock, 10, "no partial decrement");
    assert_eq!(h.gateway.calls(), 0, "aborts before charging");
}

#[tokio::test]
async fn checkout_clears_the_cart() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 5000, 0, 10).await;

    h.state
        .cart_engine()
        .add_item(
            USER,
            AddItemInput {
                product_id: product.id,
                quantity: 2,
                color: "black".to_owned(),
                size: "m".to_owned(),
            },
        )
        .await
        .expect("add to cart");

    let input = checkout_input(&[(product.id, 2)], dec!(100.00), dec!(0), dec!(0));
    h.state
        .checkout()
        .checkout(USER, input)
        .await
        .expect("checkout");

    assert!(
        h.state
            .cart_engine()
            .get_cart(USER)
            .await
            .expect("get")
            .is_none(),
        "cart deleted on successful checkout"
    );
}

#[tokio::test]
async fn decrement_never_drives_stock_below_zero() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 5000, 0, 3).await;

    // Checkout does not re-check stock; the decrement floors at 0.
    let input = checkout_input(&[(product.id, 5)], dec!(250.00), dec!(0), dec!(0));
    h.state
        .checkout()
        .checkout(USER, input)
        .await
        .expect("checkout");

    let after = h.catalog.get(product.id).await.expect("get").expect("product");
    assert_eq!(after.stock, 0);
}

#[tokio::test]
async fn stock_reaching_threshold_fires_exactly_one_alert() {
    let h = harness();
    // 5 - 3 = 2, exactly at the threshold: one alert for this product.
    let low = seed_product(&h.catalog, "tote", 1800, 0, 5).await;
    // 10 - 3 = 7, well above: no alert.
    let high = seed_product(&h.catalog, "tee", 2000, 0, 10).await;

    let input = checkout_input(
        &[(low.id, 3), (high.id, 3)],
        dec!(114.00),
        dec!(0),
        dec!(0),
    );
    h.state
        .checkout()
        .checkout(USER, input)
        .await
        .expect("checkout");

    let channel = h.channel.clone();
    wait_until(move || channel.low_stock_count() >= 1).await;
    // Give any stray second alert a chance to land before asserting
    // "exactly one".
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(h.channel.low_stock_count(), 1);
    assert_eq!(h.channel.delivered_count(), 0);
}

#[tokio::test]
async fn replaying_an_idempotency_key_returns_the_same_order_once() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 5000, 0, 10).await;

    let mut first = checkout_input(&[(product.id, 2)], dec!(100.00), dec!(0), dec!(0));
    first.idempotency_key = Some("ck_retry_123".to_owned());
    let order = h
        .state
        .checkout()
        .checkout(USER, first)
        .await
        .expect("first checkout");

    let mut second = checkout_input(&[(product.id, 2)], dec!(100.00), dec!(0), dec!(0));
    second.idempotency_key = Some("ck_retry_123".to_owned());
    let replayed = h
        .state
        .checkout()
        .checkout(USER, second)
        .await
        .expect("replay");

    assert_eq!(order.id, replayed.id, "same order served on replay");
    assert_eq!(
        h.orders.list_all().await.expect("list").len(),
        1,
        "no duplicate order"
    );

    let after = h.catalog.get(product.id).await.expect("get").expect("product");
    assert_eq!(after.stock, 8, "stock decremented exactly once");
}

#[tokio::test]
async fn provider_connection_failure_aborts_checkout() {
    let h = harness();
    let product = seed_product(&h.catalog, "tee", 5000, 0, 10).await;
    h.gateway
        .push_error(PaymentError::Connection("timed out".to_owned()));

    let input = checkout_input(&[(product.id, 1)], dec!(50.00), dec!(0), dec!(0));
    let err = h
        .state
        .checkout()
        .checkout(USER, input)
        .await
        .expect_err("connection error");

    assert!(matches!(err, AppError::Payment(PaymentError::Connection(_))));
    assert!(h.orders.list_all().await.expect("list").is_empty());
}
