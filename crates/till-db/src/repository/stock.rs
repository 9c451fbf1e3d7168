//! Per (tenant, product, warehouse) stock and its append-only journal.
//!
//! `adjust` is an upsert with `stock = stock + excluded.stock` plus one
//! journal row. Sales and cancellations both go through it with opposite
//! signs.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DbResult;
use till_core::{Quantity, StockJournalEntry, StockMovementReason, TenantScope, WarehouseStock};

/// Repository for warehouse stock.
pub struct StockRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> StockRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        StockRepository { conn }
    }

    /// Applies a signed delta and journals it. Returns the new stock.
    ///
    /// Creates the row (stock = delta) when absent. Never rejects a delta
    /// that drives stock negative.
    pub async fn adjust(
        &mut self,
        scope: &TenantScope,
        product_id: &str,
        warehouse_id: &str,
        delta: Quantity,
        reason: StockMovementReason,
        reference: Option<&str>,
    ) -> DbResult<Quantity> {
        let now = Utc::now();

        let stock: Quantity = sqlx::query_scalar(
            r#"
            INSERT INTO warehouse_stock (tenant_id, product_id, warehouse_id, stock, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (tenant_id, product_id, warehouse_id)
            DO UPDATE SET stock = stock + excluded.stock, updated_at = excluded.updated_at
            RETURNING stock
            "#,
        )
        .bind(scope.tenant_id())
        .bind(product_id)
        .bind(warehouse_id)
        .bind(delta)
        .bind(now)
        .fetch_one(&mut *self.conn)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, tenant_id, product_id, warehouse_id, delta, reason, reference, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(scope.tenant_id())
        .bind(product_id)
        .bind(warehouse_id)
        .bind(delta)
        .bind(reason)
        .bind(reference)
        .bind(now)
        .execute(&mut *self.conn)
        .await?;

        debug!(product_id, warehouse_id, %delta, %stock, ?reason, "Stock adjusted");
        if stock.is_negative() {
            warn!(
                tenant_id = %scope,
                product_id,
                warehouse_id,
                %stock,
                "Stock is negative (oversold)"
            );
        }

        Ok(stock)
    }

    /// Reads one stock row.
    pub async fn get(
        &mut self,
        scope: &TenantScope,
        product_id: &str,
        warehouse_id: &str,
    ) -> DbResult<Option<WarehouseStock>> {
        let row = sqlx::query_as::<_, WarehouseStock>(
            r#"
            SELECT tenant_id, product_id, warehouse_id, stock, updated_at
            FROM warehouse_stock
            WHERE tenant_id = ? AND product_id = ? AND warehouse_id = ?
            "#,
        )
        .bind(scope.tenant_id())
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(row)
    }

    /// Current stock, zero when no row exists yet.
    pub async fn quantity(
        &mut self,
        scope: &TenantScope,
        product_id: &str,
        warehouse_id: &str,
    ) -> DbResult<Quantity> {
        Ok(self
            .get(scope, product_id, warehouse_id)
            .await?
            .map(|row| row.stock)
            .unwrap_or_default())
    }

    /// Sum of a product's stock across all warehouses of the tenant.
    pub async fn total_for_product(
        &mut self,
        scope: &TenantScope,
        product_id: &str,
    ) -> DbResult<Quantity> {
        let total: Quantity = sqlx::query_scalar(
            "SELECT COALESCE(SUM(stock), 0) FROM warehouse_stock WHERE tenant_id = ? AND product_id = ?",
        )
        .bind(scope.tenant_id())
        .bind(product_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(total)
    }

    /// Journal rows carrying a reference, e.g. `CANCEL-{saleId}`.
    pub async fn movements_by_reference(
        &mut self,
        scope: &TenantScope,
        reference: &str,
    ) -> DbResult<Vec<StockJournalEntry>> {
        let rows = sqlx::query_as::<_, StockJournalEntry>(
            r#"
            SELECT id, tenant_id, product_id, warehouse_id, delta, reason, reference, created_at
            FROM stock_movements
            WHERE tenant_id = ? AND reference = ?
            ORDER BY created_at, rowid
            "#,
        )
        .bind(scope.tenant_id())
        .bind(reference)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::*;

    #[tokio::test]
    async fn test_adjust_creates_then_increments() {
        let db = database().await;
        let a = scope(TENANT_A);
        let p = product(&a, "ARROZ", false);

        let mut uow = db.begin().await.unwrap();
        uow.catalog().insert_product(&p).await.unwrap();

        let first = uow
            .stock()
            .adjust(&a, &p.id, "W1", Quantity::units(10), StockMovementReason::ManualAdjustment, None)
            .await
            .unwrap();
        assert_eq!(first, Quantity::units(10));

        let half: Quantity = "0.5".parse().unwrap();
        let second = uow
            .stock()
            .adjust(&a, &p.id, "W1", -half, StockMovementReason::Sale, Some("VENTA-S1"))
            .await
            .unwrap();
        assert_eq!(second, Quantity::units(10) - half);

        let journal = uow.stock().movements_by_reference(&a, "VENTA-S1").await.unwrap();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].delta, -half);
        assert_eq!(journal[0].reason, StockMovementReason::Sale);
    }

    #[tokio::test]
    async fn test_negative_stock_is_allowed() {
        let db = database().await;
        let a = scope(TENANT_A);
        let p = product(&a, "PAN", false);

        let mut uow = db.begin().await.unwrap();
        uow.catalog().insert_product(&p).await.unwrap();
        let stock = uow
            .stock()
            .adjust(&a, &p.id, "W1", -Quantity::units(3), StockMovementReason::Sale, None)
            .await
            .unwrap();

        assert_eq!(stock, -Quantity::units(3));
        let row = uow.stock().get(&a, &p.id, "W1").await.unwrap().unwrap();
        assert!(row.is_oversold());
    }

    #[tokio::test]
    async fn test_stock_is_partitioned_by_tenant_and_warehouse() {
        let db = database().await;
        let a = scope(TENANT_A);
        let b = scope(TENANT_B);
        let p = product(&a, "LECHE", false);

        let mut uow = db.begin().await.unwrap();
        uow.catalog().insert_product(&p).await.unwrap();
        uow.stock()
            .adjust(&a, &p.id, "W1", Quantity::units(4), StockMovementReason::ManualAdjustment, None)
            .await
            .unwrap();
        uow.stock()
            .adjust(&a, &p.id, "W2", Quantity::units(6), StockMovementReason::ManualAdjustment, None)
            .await
            .unwrap();

        assert_eq!(uow.stock().quantity(&b, &p.id, "W1").await.unwrap(), Quantity::zero());
        assert_eq!(uow.stock().quantity(&a, &p.id, "W3").await.unwrap(), Quantity::zero());
        assert_eq!(
            uow.stock().total_for_product(&a, &p.id).await.unwrap(),
            Quantity::units(10)
        );
    }

    #[tokio::test]
    async fn test_rolled_back_adjustment_leaves_no_trace() {
        let db = database().await;
        let a = scope(TENANT_A);
        let p = product(&a, "AZUCAR", false);

        let mut uow = db.begin().await.unwrap();
        uow.catalog().insert_product(&p).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = db.begin().await.unwrap();
        uow.stock()
            .adjust(&a, &p.id, "W1", Quantity::units(1), StockMovementReason::ManualAdjustment, Some("X"))
            .await
            .unwrap();
        uow.rollback().await.unwrap();

        let mut uow = db.begin().await.unwrap();
        assert!(uow.stock().get(&a, &p.id, "W1").await.unwrap().is_none());
        assert!(uow.stock().movements_by_reference(&a, "X").await.unwrap().is_empty());
    }
}
