//! Social credential repository.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, Set,
};
use tally_core::credential::{Provider, ProviderDetails, SocialCredential};
use tally_core::ledger::LedgerError;
use tally_shared::types::UserId;
use uuid::Uuid;

use crate::entities::{sea_orm_active_enums as db, social_credentials};
use crate::error::db_err;
use crate::mapper::{credential_from_model, details_to_json};

/// Cross-entity side effect run by contributor-attributed operations.
#[async_trait]
pub trait CredentialToucher: Send + Sync {
    /// Sets `last_used_at` on the owner's credential for `provider`.
    ///
    /// # Errors
    ///
    /// `CredentialNotFound` when no such credential exists.
    async fn touch_last_used(
        &self,
        txn: &DatabaseTransaction,
        owner_id: UserId,
        provider: Provider,
    ) -> Result<(), LedgerError>;
}

/// Repository for social credentials.
#[derive(Debug, Clone)]
pub struct SocialCredentialRepository {
    db: DatabaseConnection,
}

impl SocialCredentialRepository {
    /// Creates a new credential repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Binds (or rebinds) a credential for the details' provider.
    ///
    /// # Errors
    ///
    /// `Validation` for malformed details.
    pub async fn register(
        &self,
        owner_id: UserId,
        details: &ProviderDetails,
    ) -> Result<SocialCredential, LedgerError> {
        details.validate()?;
        let now = Utc::now().into();
        let model = social_credentials::ActiveModel {
            id: Set(Uuid::now_v7()),
            owner_id: Set(owner_id.into_inner()),
            provider: Set(details.provider().into()),
            details: Set(details_to_json(details)?),
            last_used_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        social_credentials::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    social_credentials::Column::OwnerId,
                    social_credentials::Column::Provider,
                ])
                .update_columns([
                    social_credentials::Column::Details,
                    social_credentials::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;

        self.find(owner_id, details.provider())
            .await?
            .ok_or_else(|| LedgerError::Internal(format!("credential for {owner_id} vanished after insert")))
    }

    /// Looks up the owner's credential for `provider`.
    pub async fn find(
        &self,
        owner_id: UserId,
        provider: Provider,
    ) -> Result<Option<SocialCredential>, LedgerError> {
        let model = social_credentials::Entity::find()
            .filter(social_credentials::Column::OwnerId.eq(owner_id.into_inner()))
            .filter(social_credentials::Column::Provider.eq(db::SocialProvider::from(provider)))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(credential_from_model).transpose()
    }

    async fn touch<C: ConnectionTrait>(
        conn: &C,
        owner_id: UserId,
        provider: Provider,
    ) -> Result<(), LedgerError> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
        let result = social_credentials::Entity::update_many()
            .col_expr(social_credentials::Column::LastUsedAt, Expr::value(now))
            .col_expr(social_credentials::Column::UpdatedAt, Expr::value(now))
            .filter(social_credentials::Column::OwnerId.eq(owner_id.into_inner()))
            .filter(social_credentials::Column::Provider.eq(db::SocialProvider::from(provider)))
            .exec(conn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(LedgerError::CredentialNotFound { owner_id, provider });
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialToucher for SocialCredentialRepository {
    async fn touch_last_used(
        &self,
        txn: &DatabaseTransaction,
        owner_id: UserId,
        provider: Provider,
    ) -> Result<(), LedgerError> {
        Self::touch(txn, owner_id, provider).await
    }
}
