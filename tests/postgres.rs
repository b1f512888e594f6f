//! Runs against a live database:
//! `DATABASE_URL=postgres://... cargo test --features postgres -- --ignored`
#![cfg(feature = "postgres")]

use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use token_ledger::{
    ErrorKind, Ledger,
    address::Address,
    config::LedgerConfig,
    store::{LedgerStore, postgres_store::PgLedgerStore},
};

const A: &str = "0xa000000000000000000000000000000000000000";
const B: &str = "0xb000000000000000000000000000000000000000";
const C: &str = "0xc000000000000000000000000000000000000000";

async fn setup(accounts: &[(&str, Decimal)]) -> Ledger<PgLedgerStore> {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let config = LedgerConfig::test();
    let store = PgLedgerStore::connect(&url, &config).await.unwrap();

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} (\
             address TEXT PRIMARY KEY, \
             token_balance NUMERIC(28, 18) NOT NULL CHECK (token_balance >= 0))",
        config.table()
    ))
    .execute(store.pool())
    .await
    .unwrap();
    sqlx::query(&format!("DELETE FROM {}", config.table()))
        .execute(store.pool())
        .await
        .unwrap();
    for (address, balance) in accounts {
        sqlx::query(&format!(
            "INSERT INTO {} (address, token_balance) VALUES ($1, $2)",
            config.table()
        ))
        .bind(*address)
        .bind(*balance)
        .execute(store.pool())
        .await
        .unwrap();
    }
    Ledger::new(store)
}

async fn balance_of(ledger: &Ledger<PgLedgerStore>, address: &str) -> Decimal {
    ledger
        .store()
        .balance(&Address::parse(address).unwrap())
        .await
        .unwrap()
}

// Tests share one table, so run them with `--test-threads=1`.

#[tokio::test]
#[ignore]
async fn transfer_round_trip_and_new_wallet() {
    let ledger = setup(&[(A, dec!(1000)), (B, dec!(1000))]).await;

    assert_eq!(
        ledger.transfer(A, B, "100").await.unwrap(),
        "900.000000000000000000"
    );
    ledger.transfer(B, C, "0.000000000000000001").await.unwrap();

    assert_eq!(balance_of(&ledger, A).await, dec!(900));
    assert_eq!(balance_of(&ledger, B).await, dec!(1099.999999999999999999));
    assert_eq!(
        ledger.wallet(C).await.unwrap().balance,
        "0.000000000000000001"
    );
}

#[tokio::test]
#[ignore]
async fn rejected_transfers_roll_back() {
    let ledger = setup(&[(A, dec!(1000)), (B, dec!(9999999999))]).await;

    let err = ledger.transfer(C, A, "1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccountNotFound);
    let err = ledger.transfer(A, C, "1100").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
    let err = ledger.transfer(A, B, "1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StoreError);

    assert_eq!(balance_of(&ledger, A).await, dec!(1000));
    assert!(ledger.wallet(C).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn concurrent_transfers_in_both_directions() {
    let ledger = Arc::new(setup(&[(A, dec!(1000)), (B, dec!(1000))]).await);

    let tasks = (0..50).map(|i| {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            if i % 2 == 0 {
                ledger.transfer(A, B, "5").await
            } else {
                ledger.transfer(B, A, "10").await
            }
        })
    });
    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    assert_eq!(balance_of(&ledger, A).await, dec!(1125));
    assert_eq!(balance_of(&ledger, B).await, dec!(875));
}
