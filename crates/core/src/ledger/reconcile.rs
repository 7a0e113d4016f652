//! Ledger/balance correspondence checks.
//!
//! Each account's stored balance equals the `balance_after` of its newest entry,
//! and consecutive entries chain: `before(n) == after(n - 1)`.

use serde::Serialize;
use tally_shared::types::{LedgerEntryId, UserId};

use super::entry::LedgerEntry;
use crate::account::{Account, AccountKind};

/// Outcome of checking one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountReconciliation {
    /// The owning user.
    pub owner_id: UserId,
    /// The account kind.
    pub kind: AccountKind,
    /// Balance stored on the account.
    pub stored_balance: i64,
    /// `balance_after` of the newest entry, `None` without entries.
    pub ledger_balance: Option<i64>,
    /// Problems found, empty when consistent.
    pub discrepancies: Vec<Discrepancy>,
}

impl AccountReconciliation {
    /// Whether no discrepancy was found.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

/// A single reconciliation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discrepancy {
    /// Stored balance differs from the newest entry.
    BalanceMismatch {
        /// Stored balance.
        stored: i64,
        /// Newest entry's balance after.
        ledger: i64,
    },
    /// Non-zero balance without any entry.
    MissingEntries {
        /// Stored balance.
        stored: i64,
    },
    /// Entry does not continue from its predecessor.
    BrokenChain {
        /// The offending entry.
        entry_id: LedgerEntryId,
        /// Predecessor's balance after.
        expected_before: i64,
        /// This entry's implied balance before.
        actual_before: i64,
    },
}

/// Checks `account` against its entries, given oldest first.
#[must_use]
pub fn reconcile(account: &Account, entries: &[LedgerEntry]) -> AccountReconciliation {
    let mut discrepancies = Vec::new();

    let mut expected_before = 0;
    for entry in entries {
        let actual_before = entry.balance_before();
        if actual_before != expected_before {
            discrepancies.push(Discrepancy::BrokenChain {
                entry_id: entry.id,
                expected_before,
                actual_before,
            });
        }
        expected_before = entry.balance_after;
    }

    let ledger_balance = entries.last().map(|e| e.balance_after);
    match ledger_balance {
        Some(ledger) if ledger != account.balance => {
            discrepancies.push(Discrepancy::BalanceMismatch {
                stored: account.balance,
                ledger,
            });
        }
        None if account.balance != 0 => {
            discrepancies.push(Discrepancy::MissingEntries {
                stored: account.balance,
            });
        }
        _ => {}
    }

    AccountReconciliation {
        owner_id: account.owner_id,
        kind: account.kind,
        stored_balance: account.balance,
        ledger_balance,
        discrepancies,
    }
}
