//! End-to-end scenarios over the pure domain: plan, apply, record.
//!
//! These mirror what the coordinator does inside a session, with in-memory
//! accounts standing in for the store.

use std::collections::HashMap;

use chrono::Utc;
use proptest::prelude::*;
use tally_shared::types::{LedgerEntryId, UserId};

use super::context::OperationContext;
use super::entry::{Flow, LedgerEntry};
use super::error::LedgerError;
use super::plan::ExecutionPlan;
use super::reconcile::reconcile;
use crate::account::{Account, AccountKind, ApplyOptions};
use crate::catalog::{ConversionRate, OperationCatalog, OperationType};
use crate::credential::Provider;

/// In-memory stand-in for one user's accounts and ledger.
struct Book {
    owner: UserId,
    catalog: OperationCatalog,
    rate: ConversionRate,
    accounts: HashMap<AccountKind, Account>,
    entries: Vec<LedgerEntry>,
}

impl Book {
    fn new() -> Self {
        Self {
            owner: UserId::new(),
            catalog: OperationCatalog::builtin(),
            rate: ConversionRate::from_percent(40).unwrap(),
            accounts: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn with_funds(mut self) -> Self {
        let funds = Account::virtual_zero(self.owner, AccountKind::Funds);
        self.accounts.insert(AccountKind::Funds, funds);
        self
    }

    fn balance(&self, kind: AccountKind) -> i64 {
        self.accounts.get(&kind).map_or(0, |a| a.balance)
    }

    /// All-or-nothing: work on copies, swap in on success.
    fn execute(&mut self, op: OperationType, ctx: &OperationContext) -> Result<(), LedgerError> {
        let spec = self.catalog.resolve(op)?;
        let plan = ExecutionPlan::build(self.owner, spec, ctx, &self.rate)?;

        let mut accounts = self.accounts.clone();
        let mut entries = Vec::new();
        for mutation in &plan.mutations {
            let account = match accounts.get_mut(&mutation.kind) {
                Some(account) => account,
                None if mutation.kind.is_lazily_created() => accounts
                    .entry(mutation.kind)
                    .or_insert_with(|| Account::virtual_zero(self.owner, mutation.kind)),
                None => {
                    return Err(LedgerError::AccountNotFound {
                        owner_id: self.owner,
                        kind: mutation.kind,
                    });
                }
            };
            account.apply_delta(mutation.delta, ApplyOptions::default())?;
            let new_entry = plan.entry_for(*mutation, account.balance)?;
            entries.push(LedgerEntry {
                id: LedgerEntryId::new(),
                owner_id: new_entry.owner_id,
                account_kind: new_entry.account_kind,
                operation: new_entry.operation,
                flow: new_entry.flow,
                delta: new_entry.delta,
                balance_after: new_entry.balance_after,
                reason: new_entry.reason,
                resource_traded: new_entry.resource_traded,
                external_reference: new_entry.external_reference,
                related_entities: new_entry.related_entities,
                created_at: Utc::now(),
            });
        }

        self.accounts = accounts;
        self.entries.extend(entries);
        Ok(())
    }

    fn entries_for(&self, kind: AccountKind) -> Vec<LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| e.account_kind == kind)
            .cloned()
            .collect()
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_points_contribute_post_then_buy_rejected() {
    let mut book = Book::new();
    let contributor = OperationContext::new().with_provider(Provider::Twitter);

    book.execute(OperationType::ContributePost, &contributor).unwrap();
    assert_eq!(book.balance(AccountKind::Points), 20);
    let entries = book.entries_for(AccountKind::Points);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].flow, Flow::Income);
    assert_eq!(entries[0].balance_after, 20);

    book.execute(OperationType::Post, &OperationContext::new()).unwrap();
    assert_eq!(book.balance(AccountKind::Points), 12);

    let err = book
        .execute(OperationType::Buy, &OperationContext::new())
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientBalance {
            kind: AccountKind::Points,
            required: 100,
            available: 12
        }
    ));
    assert_eq!(book.balance(AccountKind::Points), 12);
    assert_eq!(book.entries_for(AccountKind::Points).len(), 2);
}

#[test]
fn test_deposit_scales_funds_at_forty_percent() {
    let mut book = Book::new().with_funds();
    let ctx = OperationContext::new().with_amount(100).with_reference("0xfeed");

    book.execute(OperationType::Deposit, &ctx).unwrap();

    assert_eq!(book.balance(AccountKind::Funds), 40);
    assert_eq!(book.balance(AccountKind::Credit), 100);
    let funds = book.entries_for(AccountKind::Funds);
    assert_eq!(funds.len(), 1);
    assert_eq!(funds[0].delta, 40);
    assert_eq!(funds[0].flow, Flow::Income);
    assert_eq!(funds[0].external_reference.as_deref(), Some("0xfeed"));
}

#[test]
fn test_deposit_without_funds_account_changes_nothing() {
    let mut book = Book::new();
    let ctx = OperationContext::new().with_amount(100).with_reference("0xfeed");

    let err = book.execute(OperationType::Deposit, &ctx).unwrap_err();

    assert!(matches!(
        err,
        LedgerError::AccountNotFound {
            kind: AccountKind::Funds,
            ..
        }
    ));
    assert_eq!(book.balance(AccountKind::Credit), 0);
    assert!(book.entries.is_empty());
}

// ============================================================================
// Properties
// ============================================================================

fn operation_strategy() -> impl Strategy<Value = OperationType> {
    prop_oneof![
        Just(OperationType::Post),
        Just(OperationType::Reply),
        Just(OperationType::ContributePost),
        Just(OperationType::ContributeReply),
        Just(OperationType::BindSocial),
        Just(OperationType::AiUsage),
        Just(OperationType::Buy),
        Just(OperationType::Sell),
    ]
}

proptest! {
    /// **Property: Ledger/balance correspondence**
    ///
    /// After any sequence of fixed-delta operations, every account reconciles with
    /// its entries and no balance is negative.
    #[test]
    fn prop_ledger_matches_balances(ops in prop::collection::vec(operation_strategy(), 1..40)) {
        let mut book = Book::new();
        let ctx = OperationContext::new().with_provider(Provider::Discord);
        for op in ops {
            let before = book.entries.len();
            match book.execute(op, &ctx) {
                Ok(()) => prop_assert_eq!(book.entries.len(), before + 1),
                Err(LedgerError::InsufficientBalance { .. }) => {
                    prop_assert_eq!(book.entries.len(), before);
                }
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }
        }
        for account in book.accounts.values() {
            prop_assert!(account.balance >= 0);
            let report = reconcile(account, &book.entries_for(account.kind));
            prop_assert!(report.is_consistent(), "{report:?}");
        }
    }
}
