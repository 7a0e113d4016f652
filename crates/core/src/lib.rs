//! Core ledger logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, balance rules, and the operation table live here.
//!
//! # Modules
//!
//! - `account` - Per-user Credit/Funds/Points accounts and balance rules
//! - `catalog` - The operation table and Funds conversion rate
//! - `credential` - Social credential provider details
//! - `ledger` - Ledger entries, errors, execution planning and queries
//! - `rate_window` - Sliding-window free action allowance

pub mod account;
pub mod catalog;
pub mod credential;
pub mod ledger;
pub mod rate_window;
