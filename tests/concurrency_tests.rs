mod common;

use common::{balance_of, seeded_store, single_contract_store, HARRY, LINUS};
use marketplace_ledger::error::AppError;
use marketplace_ledger::repositories::LedgerStore;
use marketplace_ledger::services::{PaymentRequest, SettlementEngine};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_payments_of_same_job_settle_once() {
    let store = seeded_store().await;
    let engine = Arc::new(SettlementEngine::new(store.clone()));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .pay_for_job(
                    2,
                    PaymentRequest {
                        price: dec!(201),
                        payer_id: HARRY,
                    },
                )
                .await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(job) => {
                assert!(job.paid);
                succeeded += 1;
            }
            Err(AppError::InvalidJob { job_id, .. }) => assert_eq!(job_id, 2),
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(balance_of(&store, HARRY).await, dec!(949));
    assert_eq!(balance_of(&store, LINUS).await, dec!(1415));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_payments_never_overdraw_client() {
    let store = single_contract_store(dec!(300), &[dec!(100); 5]).await;
    let engine = Arc::new(SettlementEngine::new(store.clone()));

    let mut handles = Vec::new();
    for job_id in 1..=5 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .pay_for_job(
                    job_id,
                    PaymentRequest {
                        price: dec!(100),
                        payer_id: 1,
                    },
                )
                .await
        }));
    }

    let mut succeeded = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(AppError::InsufficientBalance { .. }) => insufficient += 1,
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!(succeeded, 3);
    assert_eq!(insufficient, 2);
    assert_eq!(balance_of(&store, 1).await, Decimal::ZERO);
    assert_eq!(balance_of(&store, 2).await, dec!(300));

    let mut paid = 0;
    for job_id in 1..=5 {
        if store.find_job(job_id).await.unwrap().unwrap().paid {
            paid += 1;
        }
    }
    assert_eq!(paid, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deposits_and_payments_keep_totals_consistent() {
    let store = single_contract_store(dec!(100), &[dec!(100), dec!(100)]).await;
    let engine = Arc::new(SettlementEngine::new(store.clone()));

    // Outstanding is 200, so each deposit of 250 fits the cap on its own.
    let mut deposits = Vec::new();
    for _ in 0..4 {
        let engine = engine.clone();
        deposits.push(tokio::spawn(async move { engine.deposit(1, dec!(250)).await }));
    }
    let mut payments = Vec::new();
    for job_id in 1..=2 {
        let engine = engine.clone();
        payments.push(tokio::spawn(async move {
            engine
                .pay_for_job(
                    job_id,
                    PaymentRequest {
                        price: dec!(100),
                        payer_id: 1,
                    },
                )
                .await
        }));
    }

    let mut deposited = Decimal::ZERO;
    for handle in deposits {
        match handle.await.unwrap() {
            Ok(_) => deposited += dec!(250),
            Err(AppError::OverDeposit { .. }) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    let mut paid = Decimal::ZERO;
    for handle in payments {
        match handle.await.unwrap() {
            Ok(job) => paid += job.price,
            Err(AppError::InsufficientBalance { .. }) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    let client = balance_of(&store, 1).await;
    let contractor = balance_of(&store, 2).await;
    assert!(client >= Decimal::ZERO);
    assert_eq!(contractor, paid);
    assert_eq!(client + contractor, dec!(100) + deposited);
}
