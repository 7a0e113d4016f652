//! Funds conversion rate.

use serde::{Deserialize, Serialize};
use tally_shared::LedgerConfig;

use crate::ledger::LedgerError;

/// Percentage applied to a base magnitude to derive the Funds delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ConversionRate(u32);

impl TryFrom<u32> for ConversionRate {
    type Error = LedgerError;

    fn try_from(percent: u32) -> Result<Self, Self::Error> {
        Self::from_percent(percent)
    }
}

impl From<ConversionRate> for u32 {
    fn from(rate: ConversionRate) -> Self {
        rate.0
    }
}

impl ConversionRate {
    /// Creates a rate from a percentage.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a zero percentage.
    pub fn from_percent(percent: u32) -> Result<Self, LedgerError> {
        if percent == 0 {
            return Err(LedgerError::Validation(
                "conversion rate must be positive".to_string(),
            ));
        }
        Ok(Self(percent))
    }

    /// The percentage.
    #[must_use]
    pub const fn percent(self) -> u32 {
        self.0
    }

    /// Scales a signed base delta: `base * percent / 100`, truncated toward zero.
    ///
    /// # Errors
    ///
    /// Returns `Validation` on overflow.
    pub fn scale(self, base: i64) -> Result<i64, LedgerError> {
        base.checked_mul(i64::from(self.0))
            .map(|scaled| scaled / 100)
            .ok_or_else(|| {
                LedgerError::Validation(format!(
                    "amount {base} overflows at conversion rate {}%",
                    self.0
                ))
            })
    }
}

/// Source of the Funds conversion rate.
pub trait ConversionRateProvider: Send + Sync {
    /// The rate currently in force.
    fn funds_rate(&self) -> Result<ConversionRate, LedgerError>;
}

impl ConversionRateProvider for ConversionRate {
    fn funds_rate(&self) -> Result<ConversionRate, LedgerError> {
        Ok(*self)
    }
}

impl ConversionRateProvider for LedgerConfig {
    fn funds_rate(&self) -> Result<ConversionRate, LedgerError> {
        ConversionRate::from_percent(self.funds_rate_percent)
    }
}
