//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                 - Liveness check
//! GET    /health/ready           - Readiness check (DB ping)
//!
//! # Catalog
//! GET    /products               - Product listing
//! GET    /products/{id}          - Product detail
//!
//! # Cart (bearer token)
//! POST   /cart                   - Add item (merge on variant key)
//! GET    /cart                   - Current cart
//! DELETE /cart/{line_id}         - Remove one line
//!
//! # Orders (bearer token)
//! POST   /orders                 - Checkout (validate, charge, persist)
//! GET    /orders/myorders        - Caller's orders
//! GET    /orders/{id}            - One order (owner or admin)
//! PUT    /orders/{id}/pay        - Mark paid (owner or admin)
//! GET    /orders                 - All orders (admin)
//! PUT    /orders/{id}/deliver    - Mark delivered (admin)
//! DELETE /orders/{id}            - Hard-delete (admin)
//!
//! # Payments (bearer token)
//! POST   /payments               - Record a payment for an order
//! POST   /create-payment-intent  - Provider intent for client-side flows
//! ```

pub mod cart;
pub mod orders;
pub mod payments;
pub mod products;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

/// Assemble the API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::list))
        .route("/products/{id}", get(products::get_one))
        .route("/cart", post(cart::add).get(cart::show))
        .route("/cart/{line_id}", delete(cart::remove))
        .route("/orders", post(orders::create).get(orders::list_all))
        .route("/orders/myorders", get(orders::mine))
        .route("/orders/{id}", get(orders::get_one).delete(orders::remove))
        .route("/orders/{id}/pay", put(orders::pay))
        .route("/orders/{id}/deliver", put(orders::deliver))
        .route("/payments", post(payments::record))
        .route("/create-payment-intent", post(payments::create_intent))
}
