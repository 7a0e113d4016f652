//! Balance mutations and their immutable audit trail.
//!
//! This module implements:
//! - Ledger entries (flow, magnitude, balance after, related entities)
//! - Operation context and execution planning
//! - History query parameters
//! - Commit results and ledger/balance reconciliation
//! - Error types for ledger operations

pub mod context;
pub mod entry;
pub mod error;
pub mod outcome;
pub mod plan;
pub mod query;
pub mod reconcile;

#[cfg(test)]
mod scenario_tests;

pub use context::{AllowancePolicy, OperationContext};
pub use entry::{Flow, LedgerEntry, NewLedgerEntry, RelatedEntity, RelatedEntityType};
pub use error::LedgerError;
pub use outcome::{CommitResult, FreeActionUse};
pub use plan::{ExecutionPlan, MAX_FIELD_LEN, PlannedMutation, PlannedSideEffect, check_field_len};
pub use query::{LedgerFilter, LedgerSort, SortDirection, SortField};
pub use reconcile::{AccountReconciliation, Discrepancy, reconcile};
