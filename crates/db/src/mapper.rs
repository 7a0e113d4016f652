//! Conversions between domain types and `SeaORM` models.
//!
//! Domain types in `tally-core` carry no persistence annotations; every crossing
//! of the storage boundary goes through this module.

use chrono::Utc;
use sea_orm::{ActiveValue::NotSet, Set};
use tally_core::account::{Account, AccountCounters, AccountKind};
use tally_core::catalog::OperationType;
use tally_core::credential::{Provider, ProviderDetails, SocialCredential};
use tally_core::ledger::{Flow, LedgerEntry, LedgerError, RelatedEntity, RelatedEntityType};
use tally_shared::types::{CredentialId, LedgerEntryId, UserId};
use uuid::Uuid;

use crate::entities::{
    accounts, ledger_entries, ledger_entry_relations, sea_orm_active_enums as db, social_credentials,
};

// ============================================================================
// Enums
// ============================================================================

impl From<AccountKind> for db::AccountKind {
    fn from(kind: AccountKind) -> Self {
        match kind {
            AccountKind::Credit => Self::Credit,
            AccountKind::Funds => Self::Funds,
            AccountKind::Points => Self::Points,
        }
    }
}

impl From<db::AccountKind> for AccountKind {
    fn from(kind: db::AccountKind) -> Self {
        match kind {
            db::AccountKind::Credit => Self::Credit,
            db::AccountKind::Funds => Self::Funds,
            db::AccountKind::Points => Self::Points,
        }
    }
}

impl From<Flow> for db::LedgerFlow {
    fn from(flow: Flow) -> Self {
        match flow {
            Flow::Income => Self::Income,
            Flow::Outcome => Self::Outcome,
        }
    }
}

impl From<db::LedgerFlow> for Flow {
    fn from(flow: db::LedgerFlow) -> Self {
        match flow {
            db::LedgerFlow::Income => Self::Income,
            db::LedgerFlow::Outcome => Self::Outcome,
        }
    }
}

impl From<OperationType> for db::OperationType {
    fn from(op: OperationType) -> Self {
        match op {
            OperationType::Post => Self::Post,
            OperationType::Reply => Self::Reply,
            OperationType::ContributePost => Self::ContributePost,
            OperationType::ContributeReply => Self::ContributeReply,
            OperationType::BindSocial => Self::BindSocial,
            OperationType::AiUsage => Self::AiUsage,
            OperationType::Buy => Self::Buy,
            OperationType::Sell => Self::Sell,
            OperationType::Deposit => Self::Deposit,
            OperationType::Withdraw => Self::Withdraw,
        }
    }
}

impl From<db::OperationType> for OperationType {
    fn from(op: db::OperationType) -> Self {
        match op {
            db::OperationType::Post => Self::Post,
            db::OperationType::Reply => Self::Reply,
            db::OperationType::ContributePost => Self::ContributePost,
            db::OperationType::ContributeReply => Self::ContributeReply,
            db::OperationType::BindSocial => Self::BindSocial,
            db::OperationType::AiUsage => Self::AiUsage,
            db::OperationType::Buy => Self::Buy,
            db::OperationType::Sell => Self::Sell,
            db::OperationType::Deposit => Self::Deposit,
            db::OperationType::Withdraw => Self::Withdraw,
        }
    }
}

impl From<Provider> for db::SocialProvider {
    fn from(provider: Provider) -> Self {
        match provider {
            Provider::Twitter => Self::Twitter,
            Provider::Discord => Self::Discord,
            Provider::Telegram => Self::Telegram,
            Provider::Github => Self::Github,
        }
    }
}

impl From<db::SocialProvider> for Provider {
    fn from(provider: db::SocialProvider) -> Self {
        match provider {
            db::SocialProvider::Twitter => Self::Twitter,
            db::SocialProvider::Discord => Self::Discord,
            db::SocialProvider::Telegram => Self::Telegram,
            db::SocialProvider::Github => Self::Github,
        }
    }
}

impl From<RelatedEntityType> for db::RelatedEntityType {
    fn from(entity_type: RelatedEntityType) -> Self {
        match entity_type {
            RelatedEntityType::Post => Self::Post,
            RelatedEntityType::Reply => Self::Reply,
            RelatedEntityType::Resource => Self::Resource,
            RelatedEntityType::AiUsage => Self::AiUsage,
            RelatedEntityType::User => Self::User,
        }
    }
}

impl From<db::RelatedEntityType> for RelatedEntityType {
    fn from(entity_type: db::RelatedEntityType) -> Self {
        match entity_type {
            db::RelatedEntityType::Post => Self::Post,
            db::RelatedEntityType::Reply => Self::Reply,
            db::RelatedEntityType::Resource => Self::Resource,
            db::RelatedEntityType::AiUsage => Self::AiUsage,
            db::RelatedEntityType::User => Self::User,
        }
    }
}

// ============================================================================
// Models
// ============================================================================

/// Maps an account row into the domain account.
#[must_use]
pub fn account_from_model(model: accounts::Model) -> Account {
    let kind = AccountKind::from(model.kind);
    let counters = match kind {
        AccountKind::Funds => AccountCounters::Transfers {
            total_deposit: model.total_deposit,
            total_deposit_count: model.total_deposit_count,
            total_withdraw: model.total_withdraw,
            total_withdraw_count: model.total_withdraw_count,
        },
        AccountKind::Credit | AccountKind::Points => AccountCounters::Usage {
            acquired_count: model.acquired_count,
            consumed_count: model.consumed_count,
        },
    };

    let mut free_posts: Vec<_> = model
        .free_posts
        .into_iter()
        .map(|t| t.with_timezone(&Utc))
        .collect();
    free_posts.sort_unstable();

    Account {
        owner_id: UserId::from_uuid(model.owner_id),
        kind,
        balance: model.balance,
        counters,
        withdraw_address: model.withdraw_address,
        free_posts,
        persisted: true,
        created_at: Some(model.created_at.with_timezone(&Utc)),
        updated_at: Some(model.updated_at.with_timezone(&Utc)),
    }
}

/// A zero-balance row for a new account.
///
/// `free_posts` stays unset so the column default `'{}'` applies; the driver
/// cannot bind an empty timestamp array.
#[must_use]
pub fn new_account_model(
    owner_id: UserId,
    kind: AccountKind,
    withdraw_address: Option<String>,
) -> accounts::ActiveModel {
    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    accounts::ActiveModel {
        id: Set(Uuid::now_v7()),
        owner_id: Set(owner_id.into_inner()),
        kind: Set(kind.into()),
        balance: Set(0),
        acquired_count: Set(0),
        consumed_count: Set(0),
        total_deposit: Set(0),
        total_deposit_count: Set(0),
        total_withdraw: Set(0),
        total_withdraw_count: Set(0),
        withdraw_address: Set(withdraw_address),
        free_posts: NotSet,
        created_at: Set(now),
        updated_at: Set(now),
    }
}

/// Maps a relation row into the domain pointer.
#[must_use]
pub fn related_from_model(model: ledger_entry_relations::Model) -> RelatedEntity {
    RelatedEntity {
        entity_type: model.entity_type.into(),
        entity_id: model.entity_id,
    }
}

/// Maps an entry row and its relation rows into the domain entry.
#[must_use]
pub fn entry_from_model(
    model: ledger_entries::Model,
    relations: Vec<ledger_entry_relations::Model>,
) -> LedgerEntry {
    LedgerEntry {
        id: LedgerEntryId::from_uuid(model.id),
        owner_id: UserId::from_uuid(model.owner_id),
        account_kind: model.account_kind.into(),
        operation: model.operation_type.into(),
        flow: model.flow.into(),
        delta: model.delta,
        balance_after: model.balance_after,
        reason: model.reason,
        resource_traded: model.resource_traded,
        external_reference: model.external_reference,
        related_entities: relations.into_iter().map(related_from_model).collect(),
        created_at: model.created_at.with_timezone(&Utc),
    }
}

/// Maps a credential row into the domain credential.
///
/// # Errors
///
/// Returns `Internal` when the stored details do not parse or disagree with the
/// provider column.
pub fn credential_from_model(model: social_credentials::Model) -> Result<SocialCredential, LedgerError> {
    let details: ProviderDetails = serde_json::from_value(model.details).map_err(|e| {
        LedgerError::Internal(format!("malformed credential details for {}: {e}", model.id))
    })?;
    let provider = Provider::from(model.provider);
    if details.provider() != provider {
        return Err(LedgerError::Internal(format!(
            "credential {} stores {} details under provider {provider}",
            model.id,
            details.provider()
        )));
    }
    Ok(SocialCredential {
        id: CredentialId::from_uuid(model.id),
        owner_id: UserId::from_uuid(model.owner_id),
        details,
        last_used_at: model.last_used_at.map(|t| t.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

/// Serializes credential details for the JSONB column.
///
/// # Errors
///
/// Returns `Internal` if serialization fails.
pub fn details_to_json(details: &ProviderDetails) -> Result<serde_json::Value, LedgerError> {
    serde_json::to_value(details)
        .map_err(|e| LedgerError::Internal(format!("cannot serialize credential details: {e}")))
}
