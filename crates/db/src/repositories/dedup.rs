//! Replay protection for externally referenced operations.
//!
//! The primary key on `external_references.reference` is the authoritative
//! guard; the lookup before the insert only produces the same error earlier.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};
use tally_core::catalog::OperationType;
use tally_core::ledger::LedgerError;
use tally_shared::types::UserId;

use crate::entities::external_references;
use crate::error::{db_err, is_unique_violation};

/// Claims external references exactly once, inside the caller's session.
#[derive(Debug, Clone, Copy, Default)]
pub struct DedupGuard;

impl DedupGuard {
    /// Records `reference` inside the caller's session.
    ///
    /// A concurrent claim of the same reference blocks on the key until the
    /// other session ends, then fails here if that session committed.
    ///
    /// # Errors
    ///
    /// `DuplicateReference` when the reference was already claimed.
    pub async fn claim<C: ConnectionTrait>(
        conn: &C,
        reference: &str,
        owner_id: UserId,
        operation: OperationType,
    ) -> Result<(), LedgerError> {
        let existing = external_references::Entity::find_by_id(reference.to_string())
            .one(conn)
            .await
            .map_err(db_err)?;
        if existing.is_some() {
            return Err(LedgerError::DuplicateReference(reference.to_string()));
        }

        let model = external_references::ActiveModel {
            reference: Set(reference.to_string()),
            owner_id: Set(owner_id.into_inner()),
            operation_type: Set(operation.into()),
            created_at: Set(Utc::now().into()),
        };
        match model.insert(conn).await {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(LedgerError::DuplicateReference(reference.to_string()))
            }
            Err(err) => Err(db_err(err)),
        }
    }
}
