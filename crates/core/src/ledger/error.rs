//! Ledger error types.
//!
//! Every error aborts the surrounding session. Business rejections are typed;
//! storage and invariant failures fall into the unexpected class (`Database`,
//! `Internal`).

use chrono::{DateTime, Utc};
use tally_shared::AppError;
use tally_shared::types::UserId;
use thiserror::Error;

use crate::account::AccountKind;
use crate::credential::Provider;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Malformed request, rejected before storage access.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation name is not in the catalog.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    // ========== Lookup Errors ==========
    /// Account does not exist and is not lazily created.
    #[error("{kind} account not found for user {owner_id}")]
    AccountNotFound {
        /// The owning user.
        owner_id: UserId,
        /// The account kind.
        kind: AccountKind,
    },

    /// Account was already created for this user.
    #[error("{kind} account already exists for user {owner_id}")]
    AccountAlreadyExists {
        /// The owning user.
        owner_id: UserId,
        /// The account kind.
        kind: AccountKind,
    },

    /// Social credential to touch does not exist.
    #[error("{provider} credential not found for user {owner_id}")]
    CredentialNotFound {
        /// The owning user.
        owner_id: UserId,
        /// The credential provider.
        provider: Provider,
    },

    // ========== Business Rule Errors ==========
    /// Debit would drive the balance below zero.
    #[error("Insufficient {kind} balance: required {required}, available {available}")]
    InsufficientBalance {
        /// The account kind.
        kind: AccountKind,
        /// Magnitude of the rejected debit.
        required: i64,
        /// Balance at the time of the rejection.
        available: i64,
    },

    /// External reference was already processed.
    #[error("Duplicate external reference: {0}")]
    DuplicateReference(String),

    /// Free-action window is full.
    #[error("Free action limit of {capacity} reached")]
    RateLimitExceeded {
        /// Window capacity.
        capacity: u32,
        /// When the oldest entry leaves the window.
        retry_at: Option<DateTime<Utc>>,
    },

    // ========== Concurrency Errors ==========
    /// Serialization failure or deadlock; the caller may retry.
    #[error("Concurrent modification detected, please retry")]
    ConcurrencyConflict,

    // ========== Unexpected Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UnknownOperation(_) => "UNKNOWN_OPERATION",
            Self::AccountNotFound { .. } => "ACCOUNT_NOT_FOUND",
            Self::AccountAlreadyExists { .. } => "ACCOUNT_ALREADY_EXISTS",
            Self::CredentialNotFound { .. } => "CREDENTIAL_NOT_FOUND",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::DuplicateReference(_) => "DUPLICATE_REFERENCE",
            Self::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            Self::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::Validation(_) | Self::UnknownOperation(_) => 400,

            // 404 Not Found
            Self::AccountNotFound { .. } | Self::CredentialNotFound { .. } => 404,

            // 409 Conflict
            Self::AccountAlreadyExists { .. }
            | Self::DuplicateReference(_)
            | Self::ConcurrencyConflict => 409,

            // 422 Unprocessable Entity - business rules
            Self::InsufficientBalance { .. } => 422,

            // 429 Too Many Requests
            Self::RateLimitExceeded { .. } => 429,

            // 500 Internal Server Error
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict)
    }

    /// Returns true for failures that are not business rejections.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Internal(_))
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::Validation(_) | LedgerError::UnknownOperation(_) => {
                Self::Validation(message)
            }
            LedgerError::AccountNotFound { .. } | LedgerError::CredentialNotFound { .. } => {
                Self::NotFound(message)
            }
            LedgerError::AccountAlreadyExists { .. }
            | LedgerError::DuplicateReference(_)
            | LedgerError::ConcurrencyConflict => Self::Conflict(message),
            LedgerError::InsufficientBalance { .. } => Self::BusinessRule(message),
            LedgerError::RateLimitExceeded { .. } => Self::TooManyRequests(message),
            LedgerError::Database(detail) => Self::Database(detail),
            LedgerError::Internal(detail) => Self::Internal(detail),
        }
    }
}
