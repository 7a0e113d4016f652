//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod account;
pub mod credential;
pub mod dedup;
pub mod ledger;
pub mod rate_window;
pub mod transaction;

pub use account::AccountStore;
pub use credential::{CredentialToucher, SocialCredentialRepository};
pub use dedup::DedupGuard;
pub use ledger::LedgerWriter;
pub use rate_window::RateWindowStore;
pub use transaction::TransactionCoordinator;
