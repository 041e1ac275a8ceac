//! PostgreSQL store integration tests.
//!
//! These run only when `WALLET_TEST_DATABASE_URL` points at a scratch
//! database; otherwise each test returns early. The bundled migration is
//! applied before every test. Every test uses fresh random wallet ids, so runs
//! don't interfere with each other.

#![cfg(feature = "postgres")]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use uuid::Uuid;
use wallet_ledger::core::{Backoff, OperationCoordinator, RetryConfig};
use wallet_ledger::{
    ApplyError, BalanceStore, Operation, PostgresBalanceStore, PostgresConfig, StoreError,
};

async fn store() -> Option<PostgresBalanceStore> {
    let url = match std::env::var("WALLET_TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("WALLET_TEST_DATABASE_URL not set, skipping");
            return None;
        }
    };

    let mut config = PostgresConfig::new(url);
    config.pool_size = 16;
    let store = PostgresBalanceStore::connect(&config).await.unwrap();
    store.run_migrations().await.unwrap();
    Some(store)
}

#[tokio::test]
async fn deposit_creates_and_withdraw_debits() {
    let Some(store) = store().await else { return };
    let id = Uuid::new_v4();

    let created = store
        .mutate_balance(&Operation::deposit(id, Decimal::new(10050, 2)))
        .await
        .unwrap();
    assert_eq!(created.version, 1);

    let debited = store
        .mutate_balance(&Operation::withdraw(id, Decimal::new(5025, 2)))
        .await
        .unwrap();
    assert_eq!(debited.balance, Decimal::new(5025, 2));
    assert_eq!(debited.version, 2);

    assert_eq!(store.read_wallet(id).await.unwrap(), debited);
    assert_eq!(
        store.read_balance(id).await.unwrap(),
        Decimal::new(5025, 2)
    );
}

#[tokio::test]
async fn business_outcomes_leave_rows_untouched() {
    let Some(store) = store().await else { return };
    let missing = Uuid::new_v4();

    assert_eq!(
        store
            .mutate_balance(&Operation::withdraw(missing, Decimal::ONE))
            .await
            .unwrap_err(),
        StoreError::not_found(missing)
    );
    assert_eq!(
        store.read_wallet(missing).await.unwrap_err(),
        StoreError::not_found(missing)
    );

    let id = Uuid::new_v4();
    store
        .mutate_balance(&Operation::deposit(id, Decimal::from(3)))
        .await
        .unwrap();
    let refused = store
        .mutate_balance(&Operation::withdraw(id, Decimal::from(4)))
        .await
        .unwrap_err();
    assert!(matches!(refused, StoreError::InsufficientFunds { .. }));

    let wallet = store.read_wallet(id).await.unwrap();
    assert_eq!(wallet.balance, Decimal::from(3));
    assert_eq!(wallet.version, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_deposits_all_commit() {
    let Some(store) = store().await else { return };
    let coordinator = OperationCoordinator::new(
        Arc::new(store),
        RetryConfig::new(
            20,
            Backoff::Quadratic {
                unit: Duration::from_millis(5),
            },
            Some(Duration::from_secs(10)),
        ),
    );
    let id = Uuid::new_v4();

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .apply(&Operation::deposit(id, Decimal::ONE))
                    .await
            })
        })
        .collect();

    for handle in handles {
        let outcome: Result<_, ApplyError> = handle.await.unwrap();
        outcome.unwrap();
    }

    let wallet = coordinator.wallet(id).await.unwrap();
    assert_eq!(wallet.balance, Decimal::from(100));
    assert_eq!(wallet.version, 100);
}
