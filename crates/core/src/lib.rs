//! Pomelo Core - Shared domain types.
//!
//! This crate provides the common types used across all Pomelo Market
//! components:
//! - `api` - The storefront API server
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no
//! HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, email, and product variant axes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
