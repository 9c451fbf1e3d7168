//! Cancellation workflow: conservation, decomposition, idempotency,
//! tenant isolation, and all-or-nothing application.

mod common;

use common::*;
use till_core::{PaymentMethod, Quantity, SaleStatus};
use till_engine::ErrorCode;

#[tokio::test]
async fn test_fractional_sales_are_conserved_after_cancellation() {
    let engine = engine().await;
    let cheese = product(&engine, TENANT_A, "CHEESE").await;
    engine
        .adjust_stock(TENANT_A, &cheese.id, WAREHOUSE, Quantity::units(10))
        .await
        .unwrap();

    for (quantity, cents) in [("0.5", 500), ("0.125", 125), ("0.5", 500)] {
        let sold = engine
            .record_sale(
                TENANT_A,
                sale(None, &cheese.id, qty(quantity), 1000, &[(PaymentMethod::Card, cents)]),
            )
            .await
            .unwrap();
        assert_ne!(
            engine.get_stock(TENANT_A, &cheese.id, WAREHOUSE).await.unwrap(),
            Quantity::units(10)
        );

        engine.cancel_sale(TENANT_A, &sold.id).await.unwrap();
        assert_eq!(
            engine.get_stock(TENANT_A, &cheese.id, WAREHOUSE).await.unwrap(),
            Quantity::units(10),
            "stock drifted after selling and cancelling {quantity}"
        );
    }
}

#[tokio::test]
async fn test_interleaved_fractional_sales_sum_back_exactly() {
    let engine = engine().await;
    let cheese = product(&engine, TENANT_A, "CHEESE").await;
    engine
        .adjust_stock(TENANT_A, &cheese.id, WAREHOUSE, qty("3.3"))
        .await
        .unwrap();

    let mut sales = Vec::new();
    for _ in 0..8 {
        let sold = engine
            .record_sale(
                TENANT_A,
                sale(None, &cheese.id, qty("0.125"), 1000, &[(PaymentMethod::Card, 125)]),
            )
            .await
            .unwrap();
        sales.push(sold.id);
    }
    assert_eq!(
        engine.get_stock(TENANT_A, &cheese.id, WAREHOUSE).await.unwrap(),
        qty("2.3")
    );

    for id in sales.iter().rev() {
        engine.cancel_sale(TENANT_A, id).await.unwrap();
    }
    assert_eq!(
        engine.get_stock(TENANT_A, &cheese.id, WAREHOUSE).await.unwrap(),
        qty("3.3")
    );
}

#[tokio::test]
async fn test_composite_sale_moves_components_only() {
    let engine = engine().await;
    let (kit, a, b) = kit(&engine, TENANT_A).await;
    engine
        .adjust_stock(TENANT_A, &a.id, WAREHOUSE, Quantity::units(10))
        .await
        .unwrap();
    engine
        .adjust_stock(TENANT_A, &b.id, WAREHOUSE, Quantity::units(5))
        .await
        .unwrap();

    let sold = engine
        .record_sale(
            TENANT_A,
            sale(None, &kit.id, Quantity::units(1), 1500, &[(PaymentMethod::Card, 1500)]),
        )
        .await
        .unwrap();
    assert_eq!(
        engine.get_stock(TENANT_A, &a.id, WAREHOUSE).await.unwrap(),
        Quantity::units(8)
    );
    assert_eq!(
        engine.get_stock(TENANT_A, &b.id, WAREHOUSE).await.unwrap(),
        qty("4.5")
    );

    let outcome = engine.cancel_sale(TENANT_A, &sold.id).await.unwrap();
    assert_eq!(outcome.status, SaleStatus::Cancelled);
    assert_eq!(outcome.restored.len(), 2);
    let restored_a = outcome.restored.iter().find(|m| m.product_id == a.id).unwrap();
    let restored_b = outcome.restored.iter().find(|m| m.product_id == b.id).unwrap();
    assert_eq!(restored_a.quantity, Quantity::units(2));
    assert_eq!(restored_b.quantity, qty("0.5"));

    assert_eq!(
        engine.get_stock(TENANT_A, &a.id, WAREHOUSE).await.unwrap(),
        Quantity::units(10)
    );
    assert_eq!(
        engine.get_stock(TENANT_A, &b.id, WAREHOUSE).await.unwrap(),
        Quantity::units(5)
    );

    // the composite's own figures are never touched
    assert_eq!(
        engine.get_stock(TENANT_A, &kit.id, WAREHOUSE).await.unwrap(),
        Quantity::zero()
    );
    assert_eq!(
        engine.get_product(TENANT_A, &kit.id).await.unwrap().stock,
        Quantity::zero()
    );
}

#[tokio::test]
async fn test_second_cancellation_is_rejected_without_side_effects() {
    let engine = engine().await;
    let item = product(&engine, TENANT_A, "ITEM").await;
    let register = engine
        .open_register(TENANT_A, WAREHOUSE, CASHIER, till_core::Money::from_cents(100000))
        .await
        .unwrap();
    let sold = engine
        .record_sale(TENANT_A, cash_sale(&register.id, &item.id, 29900))
        .await
        .unwrap();

    let first = engine.cancel_sale(TENANT_A, &sold.id).await.unwrap();
    assert_eq!(first.reversals.len(), 1);
    let stock_after_first = engine.get_stock(TENANT_A, &item.id, WAREHOUSE).await.unwrap();

    let err = engine.cancel_sale(TENANT_A, &sold.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::AlreadyCancelled);
    assert!(!err.is_retryable());

    let reversals: Vec<_> = engine
        .list_cash_transactions(TENANT_A, &register.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|tx| tx.reference.as_deref() == Some(&format!("CANCEL-{}", sold.id)[..]))
        .collect();
    assert_eq!(reversals.len(), 1);
    assert_eq!(
        engine.get_stock(TENANT_A, &item.id, WAREHOUSE).await.unwrap(),
        stock_after_first
    );
}

#[tokio::test]
async fn test_cross_tenant_cancellation_changes_nothing() {
    let engine = engine().await;
    let item = product(&engine, TENANT_A, "ITEM").await;
    let register = engine
        .open_register(TENANT_A, WAREHOUSE, CASHIER, till_core::Money::from_cents(100000))
        .await
        .unwrap();
    let sold = engine
        .record_sale(TENANT_A, cash_sale(&register.id, &item.id, 35000))
        .await
        .unwrap();
    let stock_before = engine.get_stock(TENANT_A, &item.id, WAREHOUSE).await.unwrap();

    let err = engine.cancel_sale(TENANT_B, &sold.id).await.unwrap_err();
    assert!(matches!(err.code, ErrorCode::NotFound | ErrorCode::TenantMismatch));

    let err = engine.cancel_sale("not-a-tenant", &sold.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::TenantMismatch);

    assert_eq!(
        engine.get_sale(TENANT_A, &sold.id).await.unwrap().status,
        SaleStatus::Completed
    );
    assert_eq!(
        engine.get_stock(TENANT_A, &item.id, WAREHOUSE).await.unwrap(),
        stock_before
    );
    assert_eq!(
        engine
            .cash_register_summary(TENANT_A, &register.id)
            .await
            .unwrap()
            .total_cancellations,
        till_core::Money::zero()
    );

    // tenant B cannot read it either
    let err = engine.get_sale(TENANT_B, &sold.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn test_unknown_sale_is_not_found() {
    let engine = engine().await;
    let err = engine.cancel_sale(TENANT_A, "no-such-sale").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn test_fault_during_cancellation_rolls_everything_back() {
    let engine = engine().await;
    let (kit, a, b) = kit(&engine, TENANT_A).await;
    let register = engine
        .open_register(TENANT_A, WAREHOUSE, CASHIER, till_core::Money::from_cents(100000))
        .await
        .unwrap();
    let sold = engine
        .record_sale(TENANT_A, cash_sale(&register.id, &kit.id, 1500))
        .await
        .unwrap();
    let a_before = engine.get_stock(TENANT_A, &a.id, WAREHOUSE).await.unwrap();
    let b_before = engine.get_stock(TENANT_A, &b.id, WAREHOUSE).await.unwrap();

    // Stock restoration runs first; the ledger write then fails.
    sqlx::query(
        r#"
        CREATE TRIGGER inject_cancellation_fault
        BEFORE INSERT ON cash_transactions
        WHEN NEW.type = 'sale_cancellation'
        BEGIN
            SELECT RAISE(ABORT, 'injected fault');
        END
        "#,
    )
    .execute(engine.db().pool())
    .await
    .unwrap();

    let err = engine.cancel_sale(TENANT_A, &sold.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::DatabaseError);

    assert_eq!(
        engine.get_sale(TENANT_A, &sold.id).await.unwrap().status,
        SaleStatus::Completed
    );
    assert_eq!(engine.get_stock(TENANT_A, &a.id, WAREHOUSE).await.unwrap(), a_before);
    assert_eq!(engine.get_stock(TENANT_A, &b.id, WAREHOUSE).await.unwrap(), b_before);

    let restored: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM stock_movements WHERE reference = ?",
    )
    .bind(format!("CANCEL-{}", sold.id))
    .fetch_one(engine.db().pool())
    .await
    .unwrap();
    assert_eq!(restored, 0);

    // once the fault is gone the same call succeeds
    sqlx::query("DROP TRIGGER inject_cancellation_fault")
        .execute(engine.db().pool())
        .await
        .unwrap();
    let outcome = engine.cancel_sale(TENANT_A, &sold.id).await.unwrap();
    assert_eq!(outcome.reversals.len(), 1);
}

#[tokio::test]
async fn test_unresolvable_component_aborts_cancellation() {
    let engine = engine().await;
    let (kit, a, b) = kit(&engine, TENANT_A).await;
    let sold = engine
        .record_sale(
            TENANT_A,
            sale(None, &kit.id, Quantity::units(2), 1500, &[(PaymentMethod::Card, 3000)]),
        )
        .await
        .unwrap();
    let a_before = engine.get_stock(TENANT_A, &a.id, WAREHOUSE).await.unwrap();

    // B turns into a composite behind the catalog's back
    sqlx::query("UPDATE products SET is_composite = 1 WHERE id = ?")
        .bind(&b.id)
        .execute(engine.db().pool())
        .await
        .unwrap();

    let err = engine.cancel_sale(TENANT_A, &sold.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::UnresolvedComponent);
    assert_eq!(
        engine.get_sale(TENANT_A, &sold.id).await.unwrap().status,
        SaleStatus::Completed
    );
    assert_eq!(engine.get_stock(TENANT_A, &a.id, WAREHOUSE).await.unwrap(), a_before);
}

#[tokio::test]
async fn test_recipe_change_after_sale_does_not_change_restoration() {
    let engine = engine().await;
    let (kit, a, b) = kit(&engine, TENANT_A).await;
    let c = product(&engine, TENANT_A, "C").await;
    let sold = engine
        .record_sale(
            TENANT_A,
            sale(None, &kit.id, Quantity::units(1), 1500, &[(PaymentMethod::Card, 1500)]),
        )
        .await
        .unwrap();

    // the recipe grows after the sale took its components
    engine
        .add_component(TENANT_A, &kit.id, &c.id, Quantity::units(3), till_core::Money::zero())
        .await
        .unwrap();

    let outcome = engine.cancel_sale(TENANT_A, &sold.id).await.unwrap();
    assert_eq!(outcome.restored.len(), 2);
    assert!(outcome.restored.iter().all(|m| m.product_id != c.id));

    assert_eq!(
        engine.get_stock(TENANT_A, &a.id, WAREHOUSE).await.unwrap(),
        Quantity::zero()
    );
    assert_eq!(
        engine.get_stock(TENANT_A, &b.id, WAREHOUSE).await.unwrap(),
        Quantity::zero()
    );
    assert_eq!(
        engine.get_stock(TENANT_A, &c.id, WAREHOUSE).await.unwrap(),
        Quantity::zero()
    );
}

#[tokio::test]
async fn test_sale_without_journal_is_restored_from_its_lines() {
    let engine = engine().await;
    let (kit, a, b) = kit(&engine, TENANT_A).await;
    let sold = engine
        .record_sale(
            TENANT_A,
            sale(None, &kit.id, Quantity::units(2), 1500, &[(PaymentMethod::Card, 3000)]),
        )
        .await
        .unwrap();

    // a sale imported from elsewhere carries no journal rows
    for statement in [
        "DROP TRIGGER stock_movements_no_delete",
        "DELETE FROM stock_movements",
        "UPDATE warehouse_stock SET stock = 0",
    ] {
        sqlx::query(statement)
            .execute(engine.db().pool())
            .await
            .unwrap();
    }

    engine.cancel_sale(TENANT_A, &sold.id).await.unwrap();
    assert_eq!(
        engine.get_stock(TENANT_A, &a.id, WAREHOUSE).await.unwrap(),
        Quantity::units(4)
    );
    assert_eq!(
        engine.get_stock(TENANT_A, &b.id, WAREHOUSE).await.unwrap(),
        Quantity::units(1)
    );
}
