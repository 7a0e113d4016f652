//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions and explicit domain mappers
//! - Per-kind account stores, the ledger writer, dedup guard and free-post window
//! - The transaction coordinator that runs one operation in one session
//! - Database migrations

pub mod entities;
pub mod error;
pub mod mapper;
pub mod migration;
pub mod repositories;

pub use repositories::{
    AccountStore, CredentialToucher, DedupGuard, LedgerWriter, RateWindowStore,
    SocialCredentialRepository, TransactionCoordinator,
};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tally_shared::config::DatabaseConfig;

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection using the configured pool sizes.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
