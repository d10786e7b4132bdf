//! Core types for Pomelo Market.
//!
//! Type-safe wrappers for the domain concepts shared between the API
//! server and the CLI tools.

pub mod email;
pub mod id;
pub mod money;
pub mod variant;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{CurrencyCode, Money, MoneyError};
pub use variant::{Color, Size, VariantKey, VariantParseError};
