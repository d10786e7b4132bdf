//! Monetary amounts backed by decimal arithmetic.
//!
//! All prices and totals in the pipeline are [`Money`] values: a
//! non-negative `Decimal` amount paired with an ISO 4217 currency
//! code. Floating point never touches a price.

use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors from monetary arithmetic and construction.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// A monetary amount must not be negative.
    #[error("amount must not be negative: {0}")]
    Negative(Decimal),
    /// Two amounts in different currencies cannot be combined.
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch {
        left: CurrencyCode,
        right: CurrencyCode,
    },
    /// A discount percentage outside 0..=100.
    #[error("discount must be between 0 and 100: {0}")]
    InvalidDiscount(i16),
}

/// A monetary amount in a single currency.
///
/// Amounts are stored in the currency's standard unit (dollars, not
/// cents) and rounded to two decimal places by the operations that can
/// introduce extra precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: CurrencyCode,
}

impl Money {
    /// Create a new amount, rejecting negatives.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] for amounts below zero.
    pub fn new(amount: Decimal, currency: CurrencyCode) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(amount));
        }
        Ok(Self { amount, currency })
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency: CurrencyCode) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// US dollar amount, rejecting negatives.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] for amounts below zero.
    pub fn usd(amount: Decimal) -> Result<Self, MoneyError> {
        Self::new(amount, CurrencyCode::Usd)
    }

    /// Apply a percentage discount (0-100), rounding to two decimal
    /// places.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::InvalidDiscount`] if `percent` is outside
    /// 0..=100.
    pub fn discounted(self, percent: i16) -> Result<Self, MoneyError> {
        if !(0..=100).contains(&percent) {
            return Err(MoneyError::InvalidDiscount(percent));
        }
        let factor = Decimal::from(100 - percent) / Decimal::ONE_HUNDRED;
        Ok(Self {
            amount: (self.amount * factor).round_dp(2),
            currency: self.currency,
        })
    }

    /// Multiply by a quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self {
            amount: (self.amount * Decimal::from(quantity)).round_dp(2),
            currency: self.currency,
        }
    }

    /// Add another amount in the same currency.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] if the currencies
    /// differ.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            });
        }
        Ok(Self {
            amount: self.amount + other.amount,
            currency: self.currency,
        })
    }

    /// The amount in minor units (cents), as payment providers expect.
    ///
    /// Returns `None` if the amount does not fit in an `i64`.
    #[must_use]
    pub fn minor_units(self) -> Option<i64> {
        (self.amount * Decimal::ONE_HUNDRED).round().to_i64()
    }

    /// Whether this amount is zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency)
    }
}

/// ISO 4217 currency codes accepted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    #[default]
    Usd,
    Eur,
    Gbp,
    Cad,
    Aud,
}

impl CurrencyCode {
    /// The lowercase code payment providers expect (`usd`, `eur`, ...).
    #[must_use]
    pub const fn as_provider_code(self) -> &'static str {
        match self {
            Self::Usd => "usd",
            Self::Eur => "eur",
            Self::Gbp => "gbp",
            Self::Cad => "cad",
            Self::Aud => "aud",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Cad => "CAD",
            Self::Aud => "AUD",
        };
        f.write_str(code)
    }
}
