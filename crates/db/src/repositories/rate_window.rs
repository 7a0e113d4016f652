//! Persistent free-post window on the Credit account row.

use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, FromQueryResult, Statement,
    prelude::DateTimeWithTimeZone,
};
use tally_core::ledger::LedgerError;
use tally_core::rate_window::{RateWindowPolicy, RateWindowState};
use tally_shared::types::UserId;

use super::account::AccountStore;
use crate::error::db_err;

/// Prune, capacity check and append in one statement.
///
/// `$1` owner, `$2` capacity, `$3` cutoff, `$4` now. Matches no row when the
/// window is full.
const CONSUME_SQL: &str = r"
UPDATE accounts
SET free_posts = array_append(
        ARRAY(SELECT t FROM unnest(free_posts) AS t WHERE t >= $3 ORDER BY t),
        $4::timestamptz
    ),
    updated_at = $4
WHERE owner_id = $1
  AND kind = 'credit'
  AND (SELECT count(*) FROM unnest(free_posts) AS t WHERE t >= $3) < $2
RETURNING cardinality(free_posts) AS used
";

#[derive(Debug, FromQueryResult)]
struct WindowUsage {
    used: i32,
}

/// Sliding-window counter for free posts.
#[derive(Debug, Clone)]
pub struct RateWindowStore {
    db: DatabaseConnection,
    policy: RateWindowPolicy,
    credit: AccountStore,
}

impl RateWindowStore {
    /// Creates a store enforcing `policy`.
    #[must_use]
    pub fn new(db: DatabaseConnection, policy: RateWindowPolicy) -> Self {
        let credit = AccountStore::credit(db.clone());
        Self { db, policy, credit }
    }

    /// The enforced policy.
    #[must_use]
    pub const fn policy(&self) -> RateWindowPolicy {
        self.policy
    }

    /// Consumes one free post now and returns how many remain.
    ///
    /// # Errors
    ///
    /// `RateLimitExceeded` when the window is full.
    pub async fn consume<C: ConnectionTrait>(&self, conn: &C, owner_id: UserId) -> Result<u32, LedgerError> {
        self.consume_at(conn, owner_id, Utc::now()).await
    }

    /// Consumes one free post at `now`.
    pub async fn consume_at<C: ConnectionTrait>(
        &self,
        conn: &C,
        owner_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<u32, LedgerError> {
        self.credit.ensure_exists(conn, owner_id).await?;

        let cutoff: DateTimeWithTimeZone = self.policy.cutoff(now).into();
        let at: DateTimeWithTimeZone = now.into();
        let statement = Statement::from_sql_and_values(
            DbBackend::Postgres,
            CONSUME_SQL,
            [
                owner_id.into_inner().into(),
                i64::from(self.policy.capacity).into(),
                cutoff.into(),
                at.into(),
            ],
        );

        let usage = WindowUsage::find_by_statement(statement)
            .one(conn)
            .await
            .map_err(db_err)?;

        match usage {
            Some(usage) => {
                let used = u32::try_from(usage.used).unwrap_or(u32::MAX);
                Ok(self.policy.capacity.saturating_sub(used))
            }
            None => {
                let state = self.state_in(conn, owner_id).await?;
                Err(LedgerError::RateLimitExceeded {
                    capacity: self.policy.capacity,
                    retry_at: state.retry_at(now, &self.policy),
                })
            }
        }
    }

    /// Free posts left at `now`.
    pub async fn remaining(&self, owner_id: UserId, now: DateTime<Utc>) -> Result<u32, LedgerError> {
        let state = self.state_in(&self.db, owner_id).await?;
        Ok(state.remaining(now, &self.policy))
    }

    async fn state_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        owner_id: UserId,
    ) -> Result<RateWindowState, LedgerError> {
        let account = self.credit.find(conn, owner_id).await?;
        Ok(RateWindowState::new(
            account.map(|a| a.free_posts).unwrap_or_default(),
        ))
    }
}
