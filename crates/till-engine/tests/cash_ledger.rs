//! Register balances through the single ledger fold.

mod common;

use common::*;
use till_core::{CashTransactionType, Money, PaymentMethod, Quantity};
use till_engine::ErrorCode;

#[tokio::test]
async fn test_cancelled_cash_sale_is_offset_by_its_reversal() {
    let engine = engine().await;
    let item = product(&engine, TENANT_A, "ITEM").await;
    let register = engine
        .open_register(TENANT_A, WAREHOUSE, CASHIER, Money::from_cents(100000))
        .await
        .unwrap();

    engine
        .record_sale(TENANT_A, cash_sale(&register.id, &item.id, 35000))
        .await
        .unwrap();
    let cancelled = engine
        .record_sale(TENANT_A, cash_sale(&register.id, &item.id, 29900))
        .await
        .unwrap();
    engine.cancel_sale(TENANT_A, &cancelled.id).await.unwrap();

    let summary = engine
        .cash_register_summary(TENANT_A, &register.id)
        .await
        .unwrap();
    assert_eq!(summary.opening_amount, Money::from_cents(100000));
    assert_eq!(summary.total_cash_sales, Money::from_cents(64900));
    assert_eq!(summary.total_cancellations, Money::from_cents(29900));
    assert_eq!(summary.expected_balance, Money::from_cents(135000));
    assert_eq!(
        engine
            .compute_expected_balance(TENANT_A, &register.id)
            .await
            .unwrap(),
        Money::from_cents(135000)
    );

    // legacy per-sale rows are in the ledger but not in the balance
    let legacy = engine
        .list_cash_transactions(TENANT_A, &register.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|tx| tx.kind == CashTransactionType::Sale)
        .count();
    assert_eq!(legacy, 2);
}

#[tokio::test]
async fn test_cancelled_sale_without_reversal_is_excluded() {
    let engine = engine().await;
    let item = product(&engine, TENANT_A, "ITEM").await;
    let register = engine
        .open_register(TENANT_A, WAREHOUSE, CASHIER, Money::from_cents(100000))
        .await
        .unwrap();
    engine
        .record_sale(TENANT_A, cash_sale(&register.id, &item.id, 35000))
        .await
        .unwrap();
    let orphan = engine
        .record_sale(TENANT_A, cash_sale(&register.id, &item.id, 29900))
        .await
        .unwrap();

    // tombstoned outside the engine, no ledger reversal written
    sqlx::query("UPDATE sales SET status = 'cancelled' WHERE id = ?")
        .bind(&orphan.id)
        .execute(engine.db().pool())
        .await
        .unwrap();

    let summary = engine
        .cash_register_summary(TENANT_A, &register.id)
        .await
        .unwrap();
    assert_eq!(summary.total_cash_sales, Money::from_cents(35000));
    assert_eq!(summary.expected_balance, Money::from_cents(135000));
}

#[tokio::test]
async fn test_only_the_cash_leg_of_a_split_sale_counts() {
    let engine = engine().await;
    let item = product(&engine, TENANT_A, "ITEM").await;
    let register = engine
        .open_register(TENANT_A, WAREHOUSE, CASHIER, Money::from_cents(10000))
        .await
        .unwrap();

    let split = engine
        .record_sale(
            TENANT_A,
            sale(
                Some(&register.id),
                &item.id,
                Quantity::units(1),
                50000,
                &[(PaymentMethod::Cash, 20000), (PaymentMethod::Card, 30000)],
            ),
        )
        .await
        .unwrap();
    assert_eq!(split.payment_method, PaymentMethod::Mixed);
    assert_eq!(
        engine
            .list_sale_payments(TENANT_A, &split.id)
            .await
            .unwrap()
            .len(),
        2
    );

    let summary = engine
        .cash_register_summary(TENANT_A, &register.id)
        .await
        .unwrap();
    assert_eq!(summary.total_cash_sales, Money::from_cents(20000));
    assert_eq!(summary.expected_balance, Money::from_cents(30000));

    let outcome = engine.cancel_sale(TENANT_A, &split.id).await.unwrap();
    assert_eq!(outcome.reversals.len(), 1);
    assert_eq!(outcome.reversals[0].amount, Money::from_cents(-20000));

    assert_eq!(
        engine
            .compute_expected_balance(TENANT_A, &register.id)
            .await
            .unwrap(),
        Money::from_cents(10000)
    );
}

#[tokio::test]
async fn test_card_only_sale_on_a_register_writes_no_ledger_rows() {
    let engine = engine().await;
    let item = product(&engine, TENANT_A, "ITEM").await;
    let register = engine
        .open_register(TENANT_A, WAREHOUSE, CASHIER, Money::zero())
        .await
        .unwrap();

    let sold = engine
        .record_sale(
            TENANT_A,
            sale(
                Some(&register.id),
                &item.id,
                Quantity::units(1),
                4500,
                &[(PaymentMethod::Card, 4500)],
            ),
        )
        .await
        .unwrap();
    let outcome = engine.cancel_sale(TENANT_A, &sold.id).await.unwrap();
    assert!(outcome.reversals.is_empty());

    assert!(engine
        .list_cash_transactions(TENANT_A, &register.id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        engine
            .compute_expected_balance(TENANT_A, &register.id)
            .await
            .unwrap(),
        Money::zero()
    );
}

#[tokio::test]
async fn test_register_lifecycle() {
    let engine = engine().await;
    let item = product(&engine, TENANT_A, "ITEM").await;
    let register = engine
        .open_register(TENANT_A, WAREHOUSE, CASHIER, Money::from_cents(100000))
        .await
        .unwrap();

    let sold = engine
        .record_sale(TENANT_A, cash_sale(&register.id, &item.id, 35000))
        .await
        .unwrap();
    engine
        .record_cash_movement(
            TENANT_A,
            &register.id,
            CashTransactionType::Withdrawal,
            Money::from_cents(50000),
            Some("bank drop".to_string()),
        )
        .await
        .unwrap();

    let report = engine
        .close_register(TENANT_A, &register.id, Money::from_cents(84000))
        .await
        .unwrap();
    assert_eq!(report.expected_amount, Money::from_cents(85000));
    assert_eq!(report.variance, Money::from_cents(-1000));

    // cancelling after close still reverses the cash on that register
    let outcome = engine.cancel_sale(TENANT_A, &sold.id).await.unwrap();
    assert_eq!(outcome.reversals.len(), 1);
    assert_eq!(
        engine
            .compute_expected_balance(TENANT_A, &register.id)
            .await
            .unwrap(),
        Money::from_cents(50000)
    );

    // the stored closing figures do not move
    let stored = engine.get_register(TENANT_A, &register.id).await.unwrap();
    assert_eq!(stored.expected_amount, Some(Money::from_cents(85000)));
    assert_eq!(stored.counted_amount, Some(Money::from_cents(84000)));

    // but new sales cannot use it
    let err = engine
        .record_sale(TENANT_A, cash_sale(&register.id, &item.id, 100))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RegisterClosed);
}

#[tokio::test]
async fn test_summary_of_foreign_register_is_not_found() {
    let engine = engine().await;
    let register = engine
        .open_register(TENANT_A, WAREHOUSE, CASHIER, Money::zero())
        .await
        .unwrap();

    let err = engine
        .cash_register_summary(TENANT_B, &register.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}
