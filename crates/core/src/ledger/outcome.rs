//! Result of a committed operation.

use serde::Serialize;
use tally_shared::types::UserId;

use super::entry::LedgerEntry;
use crate::account::{Account, AccountKind};
use crate::catalog::OperationType;

/// A free action consumed instead of a balance debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FreeActionUse {
    /// Free actions left in the window after this one.
    pub remaining: u32,
}

/// Everything an operation committed.
#[derive(Debug, Clone, Serialize)]
pub struct CommitResult {
    /// The operation.
    pub operation: OperationType,
    /// The owning user.
    pub owner_id: UserId,
    /// Accounts after mutation, in mutation order.
    pub accounts: Vec<Account>,
    /// Entries appended, one per mutated account.
    pub entries: Vec<LedgerEntry>,
    /// Set when the operation was settled with a free action.
    pub free_action: Option<FreeActionUse>,
}

impl CommitResult {
    /// The resulting account of `kind`, if it was mutated.
    #[must_use]
    pub fn account(&self, kind: AccountKind) -> Option<&Account> {
        self.accounts.iter().find(|a| a.kind == kind)
    }

    /// The entry written for `kind`, if any.
    #[must_use]
    pub fn entry(&self, kind: AccountKind) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.account_kind == kind)
    }

    /// Whether a free action paid for this operation.
    #[must_use]
    pub const fn was_free(&self) -> bool {
        self.free_action.is_some()
    }
}
