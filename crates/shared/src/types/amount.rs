//! Fixed-point Funds amount.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Funds balances, deltas and DEPOSIT/WITHDRAW amounts are integer micro-units
//! (10^-6 of one Funds unit) end to end. Conversion to a decimal only happens
//! for display.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of decimal places carried by a Funds amount.
const FUNDS_DECIMALS: u32 = 6;

/// A Funds amount expressed in micro-units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FundsAmount(i64);

impl FundsAmount {
    /// Creates an amount from raw micro-units.
    #[must_use]
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Returns the raw micro-units.
    #[must_use]
    pub const fn micros(self) -> i64 {
        self.0
    }

    /// Returns the amount as a decimal with six fractional digits.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, FUNDS_DECIMALS)
    }
}

impl std::fmt::Display for FundsAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_to_decimal() {
        assert_eq!(FundsAmount::from_micros(40).to_decimal(), dec!(0.000040));
        assert_eq!(FundsAmount::from_micros(12_500_000).to_decimal(), dec!(12.5));
        assert_eq!(FundsAmount::from_micros(-1).to_decimal(), dec!(-0.000001));
    }

    #[test]
    fn test_display() {
        assert_eq!(FundsAmount::from_micros(1_500_000).to_string(), "1.500000");
    }
}
