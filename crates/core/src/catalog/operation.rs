//! Operation types.

use serde::{Deserialize, Serialize};

use crate::ledger::LedgerError;

/// A business operation that mutates balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    /// Publish a post.
    Post,
    /// Reply to a post.
    Reply,
    /// Anonymous post attributed to a contributor.
    ContributePost,
    /// Anonymous reply attributed to a contributor.
    ContributeReply,
    /// Bind a social account.
    BindSocial,
    /// Consume AI features.
    AiUsage,
    /// Buy a resource.
    Buy,
    /// Sell a resource.
    Sell,
    /// Deposit real money.
    Deposit,
    /// Withdraw real money.
    Withdraw,
}

impl OperationType {
    /// Every operation in catalog order.
    pub const ALL: [Self; 10] = [
        Self::Post,
        Self::Reply,
        Self::ContributePost,
        Self::ContributeReply,
        Self::BindSocial,
        Self::AiUsage,
        Self::Buy,
        Self::Sell,
        Self::Deposit,
        Self::Withdraw,
    ];

    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Reply => "REPLY",
            Self::ContributePost => "CONTRIBUTE_POST",
            Self::ContributeReply => "CONTRIBUTE_REPLY",
            Self::BindSocial => "BIND_SOCIAL",
            Self::AiUsage => "AI_USAGE",
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Deposit => "DEPOSIT",
            Self::Withdraw => "WITHDRAW",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationType {
    type Err = LedgerError;

    /// Parses a name case-insensitively; `-` is accepted for `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| LedgerError::UnknownOperation(s.trim().to_string()))
    }
}
