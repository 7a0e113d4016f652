//! Transaction coordinator: one business operation, one database session.
//!
//! Within a session the coordinator claims the external reference, settles a
//! free action or applies every balance delta, appends one ledger entry per
//! mutated account and runs the operation's side effect. Either all of it
//! commits or the session is rolled back.

use std::sync::Arc;

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tally_core::account::{AccountKind, ApplyOptions};
use tally_core::catalog::{ConversionRateProvider, OperationCatalog, OperationType};
use tally_core::ledger::{
    AllowancePolicy, CommitResult, ExecutionPlan, FreeActionUse, LedgerError, OperationContext,
    PlannedSideEffect,
};
use tally_core::rate_window::RateWindowPolicy;
use tally_shared::LedgerConfig;
use tally_shared::types::UserId;
use tracing::{debug, error, info, warn};

use super::account::AccountStore;
use super::credential::{CredentialToucher, SocialCredentialRepository};
use super::dedup::DedupGuard;
use super::ledger::LedgerWriter;
use super::rate_window::RateWindowStore;
use crate::error::db_err;

/// Runs operations against the stores inside one atomic session each.
#[derive(Clone)]
pub struct TransactionCoordinator {
    db: DatabaseConnection,
    catalog: Arc<OperationCatalog>,
    rates: Arc<dyn ConversionRateProvider>,
    credentials: Arc<dyn CredentialToucher>,
    ledger: LedgerWriter,
    free_posts: RateWindowStore,
}

impl std::fmt::Debug for TransactionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionCoordinator")
            .field("catalog", &self.catalog)
            .field("free_posts", &self.free_posts.policy())
            .finish_non_exhaustive()
    }
}

impl TransactionCoordinator {
    /// Creates a coordinator with the default credential repository.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        catalog: OperationCatalog,
        rates: Arc<dyn ConversionRateProvider>,
        free_post_policy: RateWindowPolicy,
    ) -> Self {
        Self {
            credentials: Arc::new(SocialCredentialRepository::new(db.clone())),
            ledger: LedgerWriter::new(db.clone()),
            free_posts: RateWindowStore::new(db.clone(), free_post_policy),
            catalog: Arc::new(catalog),
            rates,
            db,
        }
    }

    /// Creates a coordinator from ledger configuration.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the configured delta overrides or the
    /// free-post window are invalid.
    pub fn from_config(db: DatabaseConnection, config: &LedgerConfig) -> Result<Self, LedgerError> {
        let catalog = OperationCatalog::from_config(config)?;
        let free_post_policy = RateWindowPolicy::try_from(config.free_posts)?;
        Ok(Self::new(
            db,
            catalog,
            Arc::new(config.clone()),
            free_post_policy,
        ))
    }

    /// Replaces the credential side-effect implementation.
    #[must_use]
    pub fn with_credential_toucher(mut self, credentials: Arc<dyn CredentialToucher>) -> Self {
        self.credentials = credentials;
        self
    }

    /// The operation catalog in use.
    #[must_use]
    pub fn catalog(&self) -> &OperationCatalog {
        &self.catalog
    }

    /// The ledger writer sharing this coordinator's connection.
    #[must_use]
    pub const fn ledger(&self) -> &LedgerWriter {
        &self.ledger
    }

    /// The free-post window store.
    #[must_use]
    pub const fn free_posts(&self) -> &RateWindowStore {
        &self.free_posts
    }

    /// The store for `kind`.
    #[must_use]
    pub fn store(&self, kind: AccountKind) -> AccountStore {
        AccountStore::new(self.db.clone(), kind)
    }

    /// Executes one operation for `owner_id`.
    ///
    /// # Errors
    ///
    /// Any typed ledger error; nothing is committed when an error is returned.
    pub async fn execute(
        &self,
        owner_id: UserId,
        operation: OperationType,
        ctx: OperationContext,
    ) -> Result<CommitResult, LedgerError> {
        let result = self.run(owner_id, operation, &ctx).await;

        match &result {
            Ok(commit) => info!(
                %owner_id,
                %operation,
                entries = commit.entries.len(),
                free = commit.was_free(),
                "operation committed"
            ),
            Err(err) if err.is_unexpected() => error!(
                %owner_id,
                %operation,
                error = %err,
                "operation failed"
            ),
            Err(err) => debug!(
                %owner_id,
                %operation,
                code = err.error_code(),
                error = %err,
                "operation rejected"
            ),
        }

        result
    }

    async fn run(
        &self,
        owner_id: UserId,
        operation: OperationType,
        ctx: &OperationContext,
    ) -> Result<CommitResult, LedgerError> {
        let spec = self.catalog.resolve(operation)?;
        let plan = ExecutionPlan::build(owner_id, spec, ctx, self.rates.as_ref())?;

        let txn = self.db.begin().await.map_err(db_err)?;
        match self.apply(&txn, &plan).await {
            Ok(commit) => {
                txn.commit().await.map_err(db_err)?;
                Ok(commit)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(%owner_id, %operation, error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn apply(
        &self,
        txn: &DatabaseTransaction,
        plan: &ExecutionPlan,
    ) -> Result<CommitResult, LedgerError> {
        let owner_id = plan.owner_id;

        if let Some(reference) = &plan.external_reference {
            DedupGuard::claim(txn, reference, owner_id, plan.operation).await?;
        }

        let mut free_action = None;
        if plan.wants_free_action() {
            match self.free_posts.consume(txn, owner_id).await {
                Ok(remaining) => free_action = Some(FreeActionUse { remaining }),
                Err(LedgerError::RateLimitExceeded { .. })
                    if plan.allowance == AllowancePolicy::PreferFree => {}
                Err(err) => return Err(err),
            }
        }

        let mut accounts = Vec::new();
        let mut entries = Vec::new();
        if free_action.is_none() {
            for mutation in &plan.mutations {
                let store = self.store(mutation.kind);
                let mut account = store
                    .apply_delta(txn, owner_id, mutation.delta, ApplyOptions::default())
                    .await?;
                if mutation.kind == AccountKind::Funds
                    && let Some(address) = &plan.withdraw_address
                {
                    account = store.set_withdraw_address(txn, owner_id, address).await?;
                }
                accounts.push((*mutation, account));
            }

            for (mutation, account) in &accounts {
                let entry = plan.entry_for(*mutation, account.balance)?;
                entries.push(self.ledger.append(txn, entry).await?);
            }
        }

        if let Some(PlannedSideEffect::TouchCredential(provider)) = plan.side_effect {
            self.credentials
                .touch_last_used(txn, owner_id, provider)
                .await?;
        }

        Ok(CommitResult {
            operation: plan.operation,
            owner_id,
            accounts: accounts.into_iter().map(|(_, account)| account).collect(),
            entries,
            free_action,
        })
    }
}
