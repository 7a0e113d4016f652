//! Concurrency tests: conditional updates, reference claims and the free-post
//! window must hold under contention.
//!
//! Run with: `cargo test -p tally-db --test concurrent_test -- --nocapture`

#![allow(clippy::uninlined_format_args)]

mod common;

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Barrier;

use tally_core::account::AccountKind;
use tally_core::catalog::OperationType;
use tally_core::ledger::{AllowancePolicy, LedgerError, OperationContext};
use tally_db::{AccountStore, TransactionCoordinator};
use tally_shared::types::UserId;

/// Fires `count` copies of one operation at the same instant.
async fn race(
    coordinator: &TransactionCoordinator,
    owner: UserId,
    operation: OperationType,
    ctx: OperationContext,
    count: usize,
) -> Vec<Result<tally_core::ledger::CommitResult, LedgerError>> {
    let barrier = Arc::new(Barrier::new(count));
    let mut handles = Vec::with_capacity(count);

    for _ in 0..count {
        let coordinator = coordinator.clone();
        let barrier = Arc::clone(&barrier);
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            coordinator.execute(owner, operation, ctx).await
        }));
    }

    join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect()
}

/// 160 points, 50 concurrent replies at 4 each: exactly 40 fit.
#[tokio::test]
async fn test_concurrent_debits_never_overdraw() {
    let Some(db) = common::connect().await else {
        return;
    };
    let coordinator = common::coordinator(&db);
    let owner = UserId::new();

    for _ in 0..2 {
        coordinator
            .execute(owner, OperationType::Sell, OperationContext::new())
            .await
            .unwrap();
    }

    let results = race(
        &coordinator,
        owner,
        OperationType::Reply,
        OperationContext::new(),
        50,
    )
    .await;

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let insufficient = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::InsufficientBalance { .. })))
        .count();
    println!("succeeded: {}, insufficient: {}", succeeded, insufficient);

    assert_eq!(succeeded, 40);
    assert_eq!(insufficient, 10);

    let points = AccountStore::points(db.clone()).get_or_zero(owner).await.unwrap();
    assert_eq!(points.balance, 0);

    let history = coordinator
        .ledger()
        .history_of(owner, AccountKind::Points)
        .await
        .unwrap();
    assert_eq!(history.len(), 42);
    assert!(history.iter().all(|entry| entry.balance_after >= 0));

    let mut after: Vec<i64> = history
        .iter()
        .filter(|e| e.operation == OperationType::Reply)
        .map(|e| e.balance_after)
        .collect();
    after.sort_unstable();
    after.dedup();
    assert_eq!(after.len(), 40, "every reply must see a distinct balance");
}

#[tokio::test]
async fn test_concurrent_replays_commit_once() {
    let Some(db) = common::connect().await else {
        return;
    };
    let coordinator = common::coordinator(&db);
    let owner = UserId::new();
    common::open_funds(&db, owner).await;
    let hash = common::tx_hash();

    let results = race(
        &coordinator,
        owner,
        OperationType::Deposit,
        OperationContext::new().with_amount(100).with_reference(&hash),
        10,
    )
    .await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|err| matches!(err, LedgerError::DuplicateReference(_)))
    );

    let balances = AccountStore::balances(&db, owner).await.unwrap();
    assert_eq!(balances.credit.balance, 100);
    assert_eq!(balances.funds.unwrap().balance, 40);
    assert_eq!(coordinator.ledger().find_by_reference(&hash).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrent_free_posts_respect_capacity() {
    let Some(db) = common::connect().await else {
        return;
    };
    let coordinator = common::coordinator(&db);
    let owner = UserId::new();

    let results = race(
        &coordinator,
        owner,
        OperationType::Post,
        OperationContext::new().with_allowance(AllowancePolicy::FreeOnly),
        10,
    )
    .await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 3);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|err| matches!(err, LedgerError::RateLimitExceeded { capacity: 3, .. }))
    );

    let credit = AccountStore::credit(db.clone()).get_or_zero(owner).await.unwrap();
    assert_eq!(credit.free_posts.len(), 3);
    assert_eq!(credit.balance, 0);
}
