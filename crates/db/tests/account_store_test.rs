//! Account store: lazy creation, explicit Funds, direct delta application.

mod common;

use tally_core::account::{AccountCounters, AccountKind, ApplyOptions};
use tally_core::credential::{Provider, ProviderDetails};
use tally_core::ledger::LedgerError;
use tally_db::{AccountStore, SocialCredentialRepository};
use tally_shared::types::UserId;

#[tokio::test]
async fn test_lazy_kinds_read_as_zero() {
    let Some(db) = common::connect().await else {
        return;
    };
    let owner = UserId::new();

    for kind in [AccountKind::Credit, AccountKind::Points] {
        let account = AccountStore::new(db.clone(), kind).get_or_zero(owner).await.unwrap();
        assert_eq!(account.balance, 0);
        assert!(!account.persisted);
        assert_eq!(account.counters, AccountCounters::zero(kind));
    }

    let err = AccountStore::funds(db.clone()).get_or_zero(owner).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::AccountNotFound {
            kind: AccountKind::Funds,
            ..
        }
    ));
}

#[tokio::test]
async fn test_apply_delta_creates_on_credit_only() {
    let Some(db) = common::connect().await else {
        return;
    };
    let owner = UserId::new();
    let store = AccountStore::credit(db.clone());

    let err = store
        .apply_delta(&db, owner, -10, ApplyOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientBalance {
            required: 10,
            available: 0,
            ..
        }
    ));
    assert!(store.find(&db, owner).await.unwrap().is_none());

    let account = store
        .apply_delta(&db, owner, 30, ApplyOptions::default())
        .await
        .unwrap();
    assert_eq!(account.balance, 30);
    assert!(account.persisted);

    let account = store
        .apply_delta(&db, owner, -30, ApplyOptions::default())
        .await
        .unwrap();
    assert_eq!(account.balance, 0);
    assert_eq!(
        account.counters,
        AccountCounters::Usage {
            acquired_count: 30,
            consumed_count: 30
        }
    );

    assert!(matches!(
        store.apply_delta(&db, owner, 0, ApplyOptions::default()).await,
        Err(LedgerError::Validation(_))
    ));
}

#[tokio::test]
async fn test_unguarded_debit_still_bounded_by_storage() {
    let Some(db) = common::connect().await else {
        return;
    };
    let owner = UserId::new();
    let store = AccountStore::points(db.clone());
    store
        .apply_delta(&db, owner, 5, ApplyOptions::default())
        .await
        .unwrap();

    let err = store
        .apply_delta(
            &db,
            owner,
            -6,
            ApplyOptions {
                require_non_negative_result: false,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    assert_eq!(store.get_or_zero(owner).await.unwrap().balance, 5);
}

#[tokio::test]
async fn test_funds_creation_and_address() {
    let Some(db) = common::connect().await else {
        return;
    };
    let owner = UserId::new();
    let store = AccountStore::funds(db.clone());

    assert!(matches!(
        store.create(owner, "   ").await,
        Err(LedgerError::Validation(_))
    ));
    assert!(matches!(
        AccountStore::points(db.clone()).create(owner, "0xabc").await,
        Err(LedgerError::Validation(_))
    ));

    assert!(matches!(
        store.create(owner, &"a".repeat(256)).await,
        Err(LedgerError::Validation(_))
    ));

    let account = store.create(owner, "0xabc").await.unwrap();
    assert_eq!(account.balance, 0);
    assert_eq!(account.withdraw_address.as_deref(), Some("0xabc"));

    let updated = store.set_withdraw_address(&db, owner, "0xdef").await.unwrap();
    assert_eq!(updated.withdraw_address.as_deref(), Some("0xdef"));

    let err = store
        .set_withdraw_address(&db, UserId::new(), "0x123")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AccountNotFound { .. }));

    let balances = AccountStore::balances(&db, owner).await.unwrap();
    assert_eq!(balances.funds.unwrap().withdraw_address.as_deref(), Some("0xdef"));
    assert!(!balances.credit.persisted);
}

#[tokio::test]
async fn test_credential_rebind_replaces_details() {
    let Some(db) = common::connect().await else {
        return;
    };
    let owner = UserId::new();
    let repo = SocialCredentialRepository::new(db.clone());

    let first = repo
        .register(
            owner,
            &ProviderDetails::Github {
                login: "octo".into(),
                user_id: 1,
            },
        )
        .await
        .unwrap();
    let second = repo
        .register(
            owner,
            &ProviderDetails::Github {
                login: "octo-renamed".into(),
                user_id: 1,
            },
        )
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.provider(), Provider::Github);
    assert!(matches!(
        second.details,
        ProviderDetails::Github { ref login, .. } if login == "octo-renamed"
    ));
    assert!(repo.find(owner, Provider::Telegram).await.unwrap().is_none());
}
