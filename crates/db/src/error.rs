//! Mapping of storage errors into ledger errors.

use sea_orm::{DbErr, RuntimeErr, SqlErr};
use tally_core::ledger::LedgerError;

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";
const CHECK_VIOLATION: &str = "23514";

/// SQLSTATE code of a database error, if the driver reported one.
pub fn sqlstate(err: &DbErr) -> Option<String> {
    let runtime = match err {
        DbErr::Conn(e) | DbErr::Exec(e) | DbErr::Query(e) => e,
        _ => return None,
    };
    match runtime {
        RuntimeErr::SqlxError(sqlx::Error::Database(db)) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

/// Whether `err` is a unique constraint violation.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Whether `err` is a CHECK constraint violation.
pub fn is_check_violation(err: &DbErr) -> bool {
    sqlstate(err).as_deref() == Some(CHECK_VIOLATION)
}

/// Converts a storage error into a ledger error.
///
/// Serialization failures and deadlocks become `ConcurrencyConflict`; everything
/// unrecognised is `Database`.
pub fn db_err(err: DbErr) -> LedgerError {
    match sqlstate(&err).as_deref() {
        Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED) => LedgerError::ConcurrencyConflict,
        Some(NUMERIC_VALUE_OUT_OF_RANGE) => {
            LedgerError::Validation("value out of range for a balance".to_string())
        }
        _ => LedgerError::Database(err.to_string()),
    }
}
