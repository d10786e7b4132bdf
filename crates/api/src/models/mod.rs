//! Domain models for the transaction pipeline.
//!
//! These are plain data types plus the pure rules that govern them
//! (price snapshots, merge quantities, order totals). Persistence
//! lives in [`crate::store`]; orchestration in [`crate::services`].

pub mod cart;
pub mod order;
pub mod payment;
pub mod product;

pub use cart::{AddLine, Cart, CartError, CartLine, CartLineView, CartView};
pub use order::{
    Order, OrderDraft, OrderItem, OrderItemDraft, PlacedOrder, ShippingAddress, StockLevel,
};
pub use payment::{Payment, PaymentDraft};
pub use product::{NewProduct, Product};
