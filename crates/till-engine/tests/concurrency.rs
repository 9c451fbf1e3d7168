//! Races on a file-backed database with a real connection pool.

mod common;

use common::*;
use till_core::{Money, PaymentMethod, Quantity};
use till_engine::ErrorCode;

#[tokio::test]
async fn test_concurrent_cancellations_reverse_once() {
    let (engine, path) = file_engine().await;
    let item = product(&engine, TENANT_A, "ITEM").await;
    engine
        .adjust_stock(TENANT_A, &item.id, WAREHOUSE, Quantity::units(10))
        .await
        .unwrap();
    let register = engine
        .open_register(TENANT_A, WAREHOUSE, CASHIER, Money::from_cents(100000))
        .await
        .unwrap();
    let sold = engine
        .record_sale(TENANT_A, cash_sale(&register.id, &item.id, 29900))
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        engine.cancel_sale(TENANT_A, &sold.id),
        engine.cancel_sale(TENANT_A, &sold.id),
    );

    let results = [first, second];
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1, "{results:?}");
    for result in &results {
        if let Err(err) = result {
            assert!(
                matches!(err.code, ErrorCode::AlreadyCancelled | ErrorCode::StorageConflict),
                "unexpected error: {err}"
            );
        }
    }

    let reversals = engine
        .list_cash_transactions(TENANT_A, &register.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|tx| tx.reference.as_deref() == Some(format!("CANCEL-{}", sold.id).as_str()))
        .count();
    assert_eq!(reversals, 1);
    assert_eq!(
        engine.get_stock(TENANT_A, &item.id, WAREHOUSE).await.unwrap(),
        Quantity::units(10)
    );
    assert_eq!(
        engine
            .compute_expected_balance(TENANT_A, &register.id)
            .await
            .unwrap(),
        Money::from_cents(100000)
    );

    engine.db().close().await;
    remove_db_files(&path);
}

#[tokio::test]
async fn test_concurrent_sales_do_not_lose_stock_updates() {
    let (engine, path) = file_engine().await;
    let item = product(&engine, TENANT_A, "ITEM").await;
    engine
        .adjust_stock(TENANT_A, &item.id, WAREHOUSE, Quantity::units(20))
        .await
        .unwrap();

    let sell = || {
        engine.record_sale(
            TENANT_A,
            sale(None, &item.id, qty("0.5"), 1000, &[(PaymentMethod::Card, 500)]),
        )
    };
    let results = [
        tokio::join!(sell(), sell(), sell(), sell()),
        tokio::join!(sell(), sell(), sell(), sell()),
    ];

    let mut committed = 0;
    for (a, b, c, d) in results {
        for result in [a, b, c, d] {
            match result {
                Ok(_) => committed += 1,
                Err(err) => assert_eq!(err.code, ErrorCode::StorageConflict, "{err}"),
            }
        }
    }

    let expected = Quantity::units(20) - Quantity::from_micros(500_000 * committed);
    assert_eq!(
        engine.get_stock(TENANT_A, &item.id, WAREHOUSE).await.unwrap(),
        expected
    );

    engine.db().close().await;
    remove_db_files(&path);
}
