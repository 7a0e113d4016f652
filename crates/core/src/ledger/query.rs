//! Ledger history query parameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::UserId;

use super::entry::Flow;
use super::error::LedgerError;
use crate::account::AccountKind;
use crate::catalog::OperationType;

/// Filter over ledger entries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerFilter {
    /// Owner.
    pub owner_id: Option<UserId>,
    /// Operation type.
    pub operation: Option<OperationType>,
    /// Account kind.
    pub account_kind: Option<AccountKind>,
    /// Flow.
    pub flow: Option<Flow>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub created_to: Option<DateTime<Utc>>,
}

impl LedgerFilter {
    /// Entries of one owner.
    #[must_use]
    pub fn for_owner(owner_id: UserId) -> Self {
        Self {
            owner_id: Some(owner_id),
            ..Self::default()
        }
    }

    /// Restricts to one operation.
    #[must_use]
    pub fn operation(mut self, operation: OperationType) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Restricts to one account kind.
    #[must_use]
    pub fn account_kind(mut self, kind: AccountKind) -> Self {
        self.account_kind = Some(kind);
        self
    }

    /// Restricts to one flow.
    #[must_use]
    pub fn flow(mut self, flow: Flow) -> Self {
        self.flow = Some(flow);
        self
    }

    /// Checks that the time range is not inverted.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if let (Some(from), Some(to)) = (self.created_from, self.created_to)
            && from > to
        {
            return Err(LedgerError::Validation(format!(
                "created_from {from} is after created_to {to}"
            )));
        }
        Ok(())
    }
}

/// Sortable ledger entry fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Creation time.
    #[default]
    CreatedAt,
    /// Delta magnitude.
    Delta,
    /// Balance after.
    BalanceAfter,
    /// Operation type.
    OperationType,
    /// Account kind.
    AccountKind,
    /// Flow.
    Flow,
}

impl std::str::FromStr for SortField {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "created_at" | "createdat" => Ok(Self::CreatedAt),
            "delta" => Ok(Self::Delta),
            "balance_after" | "balanceafter" => Ok(Self::BalanceAfter),
            "operation_type" | "operation" => Ok(Self::OperationType),
            "account_kind" | "account_type" => Ok(Self::AccountKind),
            "flow" => Ok(Self::Flow),
            other => Err(LedgerError::Validation(format!(
                "cannot sort by '{other}'"
            ))),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

impl std::str::FromStr for SortDirection {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            other => Err(LedgerError::Validation(format!(
                "unknown sort direction '{other}'"
            ))),
        }
    }
}

/// Sort order; the entry id breaks ties in the same direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSort {
    /// Field.
    pub field: SortField,
    /// Direction.
    pub direction: SortDirection,
}

impl LedgerSort {
    /// Ascending by `field`.
    #[must_use]
    pub const fn asc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    /// Descending by `field`.
    #[must_use]
    pub const fn desc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }
}
