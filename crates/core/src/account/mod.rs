//! Per-user accounts in the three platform currencies.
//!
//! This module implements:
//! - Account kinds (Credit, Funds, Points) and their creation policy
//! - The plain account model with usage/transfer counters
//! - Balance rules: non-negativity and counter maintenance

pub mod balance;
pub mod types;

pub use balance::{ApplyOptions, CounterBump, check_debit};
pub use types::{Account, AccountBalances, AccountCounters, AccountKind};
