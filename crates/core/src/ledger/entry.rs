//! Ledger entry domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::{LedgerEntryId, UserId};

use super::error::LedgerError;
use crate::account::AccountKind;
use crate::catalog::OperationType;

/// Direction of a balance mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Flow {
    /// Balance increased.
    Income,
    /// Balance decreased.
    Outcome,
}

impl Flow {
    /// Flow of a signed delta, `None` for zero.
    #[must_use]
    pub const fn of(delta: i64) -> Option<Self> {
        match delta.signum() {
            1 => Some(Self::Income),
            -1 => Some(Self::Outcome),
            _ => None,
        }
    }

    /// Returns the storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Outcome => "outcome",
        }
    }
}

impl std::str::FromStr for Flow {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "outcome" => Ok(Self::Outcome),
            other => Err(LedgerError::Validation(format!("unknown flow '{other}'"))),
        }
    }
}

/// Kind of entity a ledger entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedEntityType {
    /// A published post.
    Post,
    /// A reply to a post.
    Reply,
    /// A tradeable resource.
    Resource,
    /// An AI usage record.
    AiUsage,
    /// Another user.
    User,
}

impl RelatedEntityType {
    /// Returns the storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Reply => "reply",
            Self::Resource => "resource",
            Self::AiUsage => "ai_usage",
            Self::User => "user",
        }
    }
}

impl std::str::FromStr for RelatedEntityType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "post" => Ok(Self::Post),
            "reply" => Ok(Self::Reply),
            "resource" => Ok(Self::Resource),
            "ai_usage" => Ok(Self::AiUsage),
            "user" => Ok(Self::User),
            other => Err(LedgerError::Validation(format!(
                "unknown related entity type '{other}'"
            ))),
        }
    }
}

/// Typed pointer from a ledger entry to another entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelatedEntity {
    /// What kind of entity.
    pub entity_type: RelatedEntityType,
    /// Its identifier in the owning system.
    pub entity_id: String,
}

impl RelatedEntity {
    /// Creates a related-entity pointer.
    #[must_use]
    pub fn new(entity_type: RelatedEntityType, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
        }
    }
}

/// A ledger entry before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    /// The owning user.
    pub owner_id: UserId,
    /// Account kind mutated.
    pub account_kind: AccountKind,
    /// Operation that caused the mutation.
    pub operation: OperationType,
    /// Direction of the mutation.
    pub flow: Flow,
    /// Magnitude of the mutation, always positive.
    pub delta: i64,
    /// Balance after the mutation.
    pub balance_after: i64,
    /// Free-form reason.
    pub reason: Option<String>,
    /// Traded resource identifier (BUY/SELL).
    pub resource_traded: Option<String>,
    /// External transaction reference (chain hash).
    pub external_reference: Option<String>,
    /// Related entities.
    pub related_entities: Vec<RelatedEntity>,
}

impl NewLedgerEntry {
    /// Builds an entry for a signed delta that produced `balance_after`.
    ///
    /// # Errors
    ///
    /// Returns `Internal` for a zero delta or a negative resulting balance; both
    /// indicate a mutation that should never have been committed.
    pub fn for_mutation(
        owner_id: UserId,
        account_kind: AccountKind,
        operation: OperationType,
        signed_delta: i64,
        balance_after: i64,
    ) -> Result<Self, LedgerError> {
        let flow = Flow::of(signed_delta).ok_or_else(|| {
            LedgerError::Internal(format!("zero delta for {operation} on {account_kind}"))
        })?;
        if balance_after < 0 {
            return Err(LedgerError::Internal(format!(
                "negative balance {balance_after} recorded for {account_kind}"
            )));
        }
        Ok(Self {
            owner_id,
            account_kind,
            operation,
            flow,
            delta: signed_delta.saturating_abs(),
            balance_after,
            reason: None,
            resource_traded: None,
            external_reference: None,
            related_entities: Vec::new(),
        })
    }

    /// Signed delta (positive for income).
    #[must_use]
    pub const fn signed_delta(&self) -> i64 {
        match self.flow {
            Flow::Income => self.delta,
            Flow::Outcome => -self.delta,
        }
    }
}

/// An immutable, persisted ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry identifier.
    pub id: LedgerEntryId,
    /// The owning user.
    pub owner_id: UserId,
    /// Account kind mutated.
    pub account_kind: AccountKind,
    /// Operation that caused the mutation.
    pub operation: OperationType,
    /// Direction of the mutation.
    pub flow: Flow,
    /// Magnitude of the mutation.
    pub delta: i64,
    /// Balance after the mutation.
    pub balance_after: i64,
    /// Free-form reason.
    pub reason: Option<String>,
    /// Traded resource identifier.
    pub resource_traded: Option<String>,
    /// External transaction reference.
    pub external_reference: Option<String>,
    /// Related entities.
    pub related_entities: Vec<RelatedEntity>,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Signed delta (positive for income).
    #[must_use]
    pub const fn signed_delta(&self) -> i64 {
        match self.flow {
            Flow::Income => self.delta,
            Flow::Outcome => -self.delta,
        }
    }

    /// Balance before the mutation.
    #[must_use]
    pub const fn balance_before(&self) -> i64 {
        self.balance_after - self.signed_delta()
    }
}
