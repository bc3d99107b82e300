//! Monetary and quantity scale rules.
//!
//! All monetary arithmetic is fixed-point (`rust_decimal`). Intermediate
//! per-line figures are rounded to [`MONEY_SCALE`] before summation because
//! the printed fiscal document shows rounded lines and the totals must equal
//! the sum of the printed lines.

use core::str::FromStr;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::FiscalError;

/// Decimal places carried by persisted/displayed monetary amounts.
pub const MONEY_SCALE: u32 = 2;

/// Maximum decimal places accepted on a line quantity.
pub const QUANTITY_SCALE: u32 = 3;

/// Round a monetary amount to [`MONEY_SCALE`], half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Whether a quantity fits the permitted scale (ignoring trailing zeros).
pub fn fits_quantity_scale(value: Decimal) -> bool {
    value.normalize().scale() <= QUANTITY_SCALE
}

/// ISO-4217 currency code (three uppercase letters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Dominican peso, the base currency.
    pub fn dop() -> Self {
        Self("DOP".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::dop()
    }
}

impl core::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = FiscalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 3 && s.chars().all(|c| c.is_ascii_uppercase()) {
            Ok(Self(s.to_string()))
        } else {
            Err(FiscalError::validation(format!(
                "currency code must be three uppercase letters, got '{s}'"
            )))
        }
    }
}
