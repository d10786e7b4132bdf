//! Pipeline services.
//!
//! - [`cart`] - cart engine (add-or-merge, display, removal)
//! - [`checkout`] - checkout orchestrator (validate, charge, persist)
//! - [`orders`] - order ledger (lifecycle flags, post-commit alerts)
//! - [`payment`] - payment gateway adapter and error taxonomy
//! - [`notify`] - fire-and-forget notification dispatch

pub mod cart;
pub mod checkout;
pub mod notify;
pub mod orders;
pub mod payment;

pub use cart::CartEngine;
pub use checkout::CheckoutOrchestrator;
pub use notify::NotificationDispatcher;
pub use orders::OrderLedger;
