//! Account domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{FundsAmount, UserId};

use crate::ledger::LedgerError;

/// The currency an account is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Platform credit, spent on AI usage and earned by binding accounts.
    Credit,
    /// Real-money-backed balance, stored in micro-units.
    Funds,
    /// Engagement points, earned and spent on content actions.
    Points,
}

impl AccountKind {
    /// All account kinds in a stable order.
    pub const ALL: [Self; 3] = [Self::Credit, Self::Funds, Self::Points];

    /// Returns the lowercase storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Funds => "funds",
            Self::Points => "points",
        }
    }

    /// Whether a missing account reads as a zero-balance virtual account and is
    /// created on first credit.
    ///
    /// Funds accounts must be opened explicitly (a payout address is required),
    /// Credit and Points accounts come into existence on first use.
    #[must_use]
    pub const fn is_lazily_created(self) -> bool {
        !matches!(self, Self::Funds)
    }

    /// Whether the balance is a fixed-point micro-unit amount.
    #[must_use]
    pub const fn is_fixed_point(self) -> bool {
        matches!(self, Self::Funds)
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "credit" => Ok(Self::Credit),
            "funds" => Ok(Self::Funds),
            "points" => Ok(Self::Points),
            other => Err(LedgerError::Validation(format!(
                "unknown account type '{other}'"
            ))),
        }
    }
}

/// Monotonic counters carried by an account.
///
/// Counters only ever grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum AccountCounters {
    /// Credit and Points: cumulative units acquired and consumed.
    Usage {
        /// Units credited to the account over its lifetime.
        acquired_count: i64,
        /// Units debited from the account over its lifetime.
        consumed_count: i64,
    },
    /// Funds: cumulative deposit and withdraw totals with their counts.
    Transfers {
        /// Sum of all deposits in micro-units.
        total_deposit: i64,
        /// Number of deposits.
        total_deposit_count: i64,
        /// Sum of all withdrawals in micro-units.
        total_withdraw: i64,
        /// Number of withdrawals.
        total_withdraw_count: i64,
    },
}

impl AccountCounters {
    /// Zeroed counters of the shape used by `kind`.
    #[must_use]
    pub const fn zero(kind: AccountKind) -> Self {
        match kind {
            AccountKind::Funds => Self::Transfers {
                total_deposit: 0,
                total_deposit_count: 0,
                total_withdraw: 0,
                total_withdraw_count: 0,
            },
            AccountKind::Credit | AccountKind::Points => Self::Usage {
                acquired_count: 0,
                consumed_count: 0,
            },
        }
    }
}

/// A per-user, per-currency balance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The owning user.
    pub owner_id: UserId,
    /// The currency of this account.
    pub kind: AccountKind,
    /// Current balance; never negative.
    pub balance: i64,
    /// Lifetime counters.
    pub counters: AccountCounters,
    /// Last-used payout destination (Funds only).
    pub withdraw_address: Option<String>,
    /// Free-post window timestamps (Credit only).
    pub free_posts: Vec<DateTime<Utc>>,
    /// False for the zero-balance placeholder returned for a missing lazy account.
    pub persisted: bool,
    /// When the row was created.
    pub created_at: Option<DateTime<Utc>>,
    /// When the row was last mutated.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Account {
    /// A zero-balance account that does not exist in storage yet.
    #[must_use]
    pub fn virtual_zero(owner_id: UserId, kind: AccountKind) -> Self {
        Self {
            owner_id,
            kind,
            balance: 0,
            counters: AccountCounters::zero(kind),
            withdraw_address: None,
            free_posts: Vec::new(),
            persisted: false,
            created_at: None,
            updated_at: None,
        }
    }

    /// The Funds balance as a fixed-point amount, `None` for other kinds.
    #[must_use]
    pub fn funds_balance(&self) -> Option<FundsAmount> {
        self.kind
            .is_fixed_point()
            .then_some(FundsAmount::from_micros(self.balance))
    }

    /// The balance as a human-facing decimal (Funds scaled down by 10^6).
    #[must_use]
    pub fn display_balance(&self) -> Decimal {
        self.funds_balance()
            .map_or_else(|| Decimal::from(self.balance), FundsAmount::to_decimal)
    }
}

/// All three balances of one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountBalances {
    /// The owning user.
    pub owner_id: UserId,
    /// Credit account (virtual zero when never used).
    pub credit: Account,
    /// Points account (virtual zero when never used).
    pub points: Account,
    /// Funds account, `None` until opened.
    pub funds: Option<Account>,
}
