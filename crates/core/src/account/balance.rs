//! Balance mutation rules.
//!
//! The database applies these rules in a single conditional `UPDATE`; this module
//! states them once in plain Rust so they can be reasoned about and tested without
//! storage. `Account::apply_delta` is the in-memory mirror of that statement.

use serde::{Deserialize, Serialize};

use super::types::{Account, AccountCounters, AccountKind};
use crate::ledger::LedgerError;

/// Options for a single balance mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOptions {
    /// Reject the mutation when the resulting balance would be negative.
    pub require_non_negative_result: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            require_non_negative_result: true,
        }
    }
}

/// Counter increments that accompany one balance delta.
///
/// Every field is non-negative; counters never decrease.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterBump {
    /// Added to `acquired_count` (Credit/Points).
    pub acquired: i64,
    /// Added to `consumed_count` (Credit/Points).
    pub consumed: i64,
    /// Added to `total_deposit` (Funds).
    pub deposit: i64,
    /// Added to `total_deposit_count` (Funds).
    pub deposit_count: i64,
    /// Added to `total_withdraw` (Funds).
    pub withdraw: i64,
    /// Added to `total_withdraw_count` (Funds).
    pub withdraw_count: i64,
}

impl CounterBump {
    /// Computes the counter increments for `delta` on an account of `kind`.
    ///
    /// Usage counters accumulate the delta magnitude; transfer totals accumulate the
    /// magnitude and bump their count by one.
    #[must_use]
    pub const fn for_delta(kind: AccountKind, delta: i64) -> Self {
        let magnitude = delta.saturating_abs();
        let mut bump = Self {
            acquired: 0,
            consumed: 0,
            deposit: 0,
            deposit_count: 0,
            withdraw: 0,
            withdraw_count: 0,
        };
        match (kind, delta.signum()) {
            (AccountKind::Funds, 1) => {
                bump.deposit = magnitude;
                bump.deposit_count = 1;
            }
            (AccountKind::Funds, -1) => {
                bump.withdraw = magnitude;
                bump.withdraw_count = 1;
            }
            (AccountKind::Credit | AccountKind::Points, 1) => bump.acquired = magnitude,
            (AccountKind::Credit | AccountKind::Points, -1) => bump.consumed = magnitude,
            _ => {}
        }
        bump
    }
}

/// Checks whether `delta` may be applied to `balance` and returns the new balance.
///
/// # Errors
///
/// `InsufficientBalance` with `required = |delta|` and `available = balance` when
/// the result would be negative and `opts` forbids it; `Validation` on overflow.
pub fn check_debit(
    kind: AccountKind,
    balance: i64,
    delta: i64,
    opts: ApplyOptions,
) -> Result<i64, LedgerError> {
    let next = balance
        .checked_add(delta)
        .ok_or_else(|| LedgerError::Validation(format!("{kind} balance overflow")))?;
    if next < 0 && opts.require_non_negative_result {
        return Err(LedgerError::InsufficientBalance {
            kind,
            required: delta.saturating_abs(),
            available: balance,
        });
    }
    Ok(next)
}

impl Account {
    /// Applies `delta` in memory with the same rules the store enforces.
    ///
    /// Leaves the account untouched on error.
    pub fn apply_delta(&mut self, delta: i64, opts: ApplyOptions) -> Result<(), LedgerError> {
        let next = check_debit(self.kind, self.balance, delta, opts)?;
        let bump = CounterBump::for_delta(self.kind, delta);
        self.balance = next;
        match &mut self.counters {
            AccountCounters::Usage {
                acquired_count,
                consumed_count,
            } => {
                *acquired_count = acquired_count.saturating_add(bump.acquired);
                *consumed_count = consumed_count.saturating_add(bump.consumed);
            }
            AccountCounters::Transfers {
                total_deposit,
                total_deposit_count,
                total_withdraw,
                total_withdraw_count,
            } => {
                *total_deposit = total_deposit.saturating_add(bump.deposit);
                *total_deposit_count = total_deposit_count.saturating_add(bump.deposit_count);
                *total_withdraw = total_withdraw.saturating_add(bump.withdraw);
                *total_withdraw_count = total_withdraw_count.saturating_add(bump.withdraw_count);
            }
        }
        Ok(())
    }
}
