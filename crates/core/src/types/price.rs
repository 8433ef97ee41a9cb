//! Prices held as integer cents.
//!
//! Arithmetic stays in integer cents; `rust_decimal` is only used to render
//! the major-unit amount for display.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Error for a negative amount of cents.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("price cannot be negative (got {0} cents)")]
pub struct NegativePrice(pub i64);

/// A non-negative amount of money in the smallest currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(into = "i64", try_from = "i64")]
pub struct Price(i64);

impl Price {
    /// Zero cents.
    pub const ZERO: Self = Self(0);

    /// Create a price from cents. Returns `None` for negative amounts.
    #[must_use]
    pub const fn from_cents(cents: i64) -> Option<Self> {
        if cents < 0 { None } else { Some(Self(cents)) }
    }

    /// Amount in cents.
    #[must_use]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Multiply by a quantity, returning `None` on overflow.
    #[must_use]
    pub fn checked_mul(self, quantity: i32) -> Option<Self> {
        self.0.checked_mul(i64::from(quantity)).map(Self)
    }

    /// Add another price, returning `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Amount in major units (e.g. dollars) with two decimal places.
    #[must_use]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }
}

impl TryFrom<i64> for Price {
    type Error = NegativePrice;

    fn try_from(cents: i64) -> Result<Self, Self::Error> {
        Self::from_cents(cents).ok_or(NegativePrice(cents))
    }
}

impl From<Price> for i64 {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.to_decimal())
    }
}
