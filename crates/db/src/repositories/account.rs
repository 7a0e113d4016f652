//! Account stores: one per account kind.
//!
//! Every balance change is a single conditional `UPDATE ... RETURNING`; the
//! balance is never read, computed in memory and written back.

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use tally_core::account::{Account, AccountBalances, AccountKind, ApplyOptions, CounterBump};
use tally_core::ledger::{LedgerError, check_field_len};
use tally_shared::types::UserId;

use crate::entities::{accounts, sea_orm_active_enums as db};
use crate::error::{db_err, is_check_violation, is_unique_violation};
use crate::mapper::{account_from_model, new_account_model};

/// Store for the accounts of one kind.
#[derive(Debug, Clone)]
pub struct AccountStore {
    db: DatabaseConnection,
    kind: AccountKind,
}

impl AccountStore {
    /// Creates a store for `kind`.
    #[must_use]
    pub const fn new(db: DatabaseConnection, kind: AccountKind) -> Self {
        Self { db, kind }
    }

    /// Credit store.
    #[must_use]
    pub const fn credit(db: DatabaseConnection) -> Self {
        Self::new(db, AccountKind::Credit)
    }

    /// Funds store.
    #[must_use]
    pub const fn funds(db: DatabaseConnection) -> Self {
        Self::new(db, AccountKind::Funds)
    }

    /// Points store.
    #[must_use]
    pub const fn points(db: DatabaseConnection) -> Self {
        Self::new(db, AccountKind::Points)
    }

    /// The kind this store manages.
    #[must_use]
    pub const fn kind(&self) -> AccountKind {
        self.kind
    }

    fn not_found(&self, owner_id: UserId) -> LedgerError {
        LedgerError::AccountNotFound {
            owner_id,
            kind: self.kind,
        }
    }

    /// Reads the account row, if any.
    pub async fn find<C: ConnectionTrait>(
        &self,
        conn: &C,
        owner_id: UserId,
    ) -> Result<Option<Account>, LedgerError> {
        let model = accounts::Entity::find()
            .filter(accounts::Column::OwnerId.eq(owner_id.into_inner()))
            .filter(accounts::Column::Kind.eq(db::AccountKind::from(self.kind)))
            .one(conn)
            .await
            .map_err(db_err)?;
        Ok(model.map(account_from_model))
    }

    /// Returns the account, or a virtual zero-balance account for lazily created
    /// kinds.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` for a missing Funds account.
    pub async fn get_or_zero(&self, owner_id: UserId) -> Result<Account, LedgerError> {
        match self.find(&self.db, owner_id).await? {
            Some(account) => Ok(account),
            None if self.kind.is_lazily_created() => Ok(Account::virtual_zero(owner_id, self.kind)),
            None => Err(self.not_found(owner_id)),
        }
    }

    /// Inserts a zero-balance row unless one exists.
    pub(crate) async fn ensure_exists<C: ConnectionTrait>(
        &self,
        conn: &C,
        owner_id: UserId,
    ) -> Result<(), LedgerError> {
        let model = new_account_model(owner_id, self.kind, None);

        accounts::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([accounts::Column::OwnerId, accounts::Column::Kind])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Applies a signed delta in one conditional statement and returns the
    /// resulting account.
    ///
    /// Credits to a missing Credit/Points account create it first. Counters are
    /// bumped in the same statement.
    ///
    /// # Errors
    ///
    /// - `Validation` for a zero delta
    /// - `InsufficientBalance` when a debit exceeds the balance (nothing applied)
    /// - `AccountNotFound` for a missing Funds account
    pub async fn apply_delta<C: ConnectionTrait>(
        &self,
        conn: &C,
        owner_id: UserId,
        delta: i64,
        opts: ApplyOptions,
    ) -> Result<Account, LedgerError> {
        if delta == 0 {
            return Err(LedgerError::Validation("delta must be non-zero".to_string()));
        }
        if delta > 0 && self.kind.is_lazily_created() {
            self.ensure_exists(conn, owner_id).await?;
        }

        let bump = CounterBump::for_delta(self.kind, delta);
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();

        let mut update = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::Balance,
                Expr::col(accounts::Column::Balance).add(delta),
            )
            .col_expr(accounts::Column::UpdatedAt, Expr::value(now));

        let counters = [
            (accounts::Column::AcquiredCount, bump.acquired),
            (accounts::Column::ConsumedCount, bump.consumed),
            (accounts::Column::TotalDeposit, bump.deposit),
            (accounts::Column::TotalDepositCount, bump.deposit_count),
            (accounts::Column::TotalWithdraw, bump.withdraw),
            (accounts::Column::TotalWithdrawCount, bump.withdraw_count),
        ];
        for (column, amount) in counters {
            if amount > 0 {
                update = update.col_expr(column, Expr::col(column).add(amount));
            }
        }

        update = update
            .filter(accounts::Column::OwnerId.eq(owner_id.into_inner()))
            .filter(accounts::Column::Kind.eq(db::AccountKind::from(self.kind)));
        if delta < 0 && opts.require_non_negative_result {
            update = update.filter(accounts::Column::Balance.gte(-delta));
        }

        let rows = match update.exec_with_returning(conn).await {
            Ok(rows) => rows,
            // Only reachable with `require_non_negative_result == false`; the
            // session is aborted, so no follow-up read is possible.
            Err(err) if is_check_violation(&err) => {
                return Err(LedgerError::Validation(format!(
                    "{} balance of {owner_id} cannot be stored below zero",
                    self.kind
                )));
            }
            Err(err) => return Err(db_err(err)),
        };

        match rows.into_iter().next() {
            Some(model) => Ok(account_from_model(model)),
            None => Err(self.rejection(conn, owner_id, delta).await),
        }
    }

    /// Explains why a conditional update matched no row.
    async fn rejection<C: ConnectionTrait>(
        &self,
        conn: &C,
        owner_id: UserId,
        delta: i64,
    ) -> LedgerError {
        let required = delta.saturating_abs();
        match self.find(conn, owner_id).await {
            Err(err) => err,
            Ok(Some(account)) if delta < 0 => LedgerError::InsufficientBalance {
                kind: self.kind,
                required,
                available: account.balance,
            },
            Ok(None) if delta < 0 && self.kind.is_lazily_created() => {
                LedgerError::InsufficientBalance {
                    kind: self.kind,
                    required,
                    available: 0,
                }
            }
            Ok(None) => self.not_found(owner_id),
            Ok(Some(_)) => LedgerError::Internal(format!(
                "{} credit of {delta} matched no row for {owner_id}",
                self.kind
            )),
        }
    }

    /// Opens a Funds account with a payout destination.
    ///
    /// # Errors
    ///
    /// - `Validation` for other kinds or a blank address
    /// - `AccountAlreadyExists` on a second call for the same owner
    pub async fn create(&self, owner_id: UserId, withdraw_address: &str) -> Result<Account, LedgerError> {
        if self.kind.is_lazily_created() {
            return Err(LedgerError::Validation(format!(
                "{} accounts are created on first credit",
                self.kind
            )));
        }
        let address = withdraw_address.trim();
        if address.is_empty() {
            return Err(LedgerError::Validation(
                "withdraw address is required".to_string(),
            ));
        }
        check_field_len("withdraw address", address)?;

        let model = new_account_model(owner_id, self.kind, Some(address.to_string()));

        match model.insert(&self.db).await {
            Ok(model) => Ok(account_from_model(model)),
            Err(err) if is_unique_violation(&err) => Err(LedgerError::AccountAlreadyExists {
                owner_id,
                kind: self.kind,
            }),
            Err(err) => Err(db_err(err)),
        }
    }

    /// Records the last-used payout destination.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` when the account does not exist.
    pub async fn set_withdraw_address<C: ConnectionTrait>(
        &self,
        conn: &C,
        owner_id: UserId,
        address: &str,
    ) -> Result<Account, LedgerError> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
        let rows = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::WithdrawAddress,
                Expr::value(address.to_string()),
            )
            .col_expr(accounts::Column::UpdatedAt, Expr::value(now))
            .filter(accounts::Column::OwnerId.eq(owner_id.into_inner()))
            .filter(accounts::Column::Kind.eq(db::AccountKind::from(self.kind)))
            .exec_with_returning(conn)
            .await
            .map_err(db_err)?;

        rows.into_iter()
            .next()
            .map(account_from_model)
            .ok_or_else(|| self.not_found(owner_id))
    }

    /// All three accounts of a user.
    pub async fn balances(
        db: &DatabaseConnection,
        owner_id: UserId,
    ) -> Result<AccountBalances, LedgerError> {
        let rows = accounts::Entity::find()
            .filter(accounts::Column::OwnerId.eq(owner_id.into_inner()))
            .all(db)
            .await
            .map_err(db_err)?;

        let mut balances = AccountBalances {
            owner_id,
            credit: Account::virtual_zero(owner_id, AccountKind::Credit),
            points: Account::virtual_zero(owner_id, AccountKind::Points),
            funds: None,
        };
        for account in rows.into_iter().map(account_from_model) {
            match account.kind {
                AccountKind::Credit => balances.credit = account,
                AccountKind::Points => balances.points = account,
                AccountKind::Funds => balances.funds = Some(account),
            }
        }
        Ok(balances)
    }
}
