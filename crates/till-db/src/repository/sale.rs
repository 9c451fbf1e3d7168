//! Sales, sale items and sale payments.
//!
//! Rows are never deleted. `mark_cancelled` is a conditional update
//! (`status != 'cancelled'`) that succeeds for exactly one caller.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use till_core::{CashSaleLeg, Money, Sale, SaleItem, SalePayment, SaleStatus, TenantScope};

const SALE_COLUMNS: &str = "id, tenant_id, warehouse_id, cash_register_id, user_id, status, \
                            subtotal, tax, discount, total, payment_method, \
                            created_at, updated_at, cancelled_at";

/// Stored totals of a sale next to the sums of its lines, for the
/// integrity check.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SaleTotals {
    pub sale_id: String,
    pub status: SaleStatus,
    pub subtotal: Money,
    pub total: Money,
    pub items_total: Money,
    pub payments_total: Money,
}

/// Repository for sale database operations.
pub struct SaleRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> SaleRepository<'c> {
    /// Creates a new SaleRepository on a borrowed connection.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        SaleRepository { conn }
    }

    /// Gets a sale by ID within the tenant.
    pub async fn get(&mut self, scope: &TenantScope, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ? AND tenant_id = ?");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .bind(scope.tenant_id())
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(sale)
    }

    /// Inserts the sale header.
    pub async fn insert_sale(&mut self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, status = %sale.status, total = %sale.total, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, tenant_id, warehouse_id, cash_register_id, user_id, status,
                subtotal, tax, discount, total, payment_method,
                created_at, updated_at, cancelled_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.tenant_id)
        .bind(&sale.warehouse_id)
        .bind(&sale.cash_register_id)
        .bind(&sale.user_id)
        .bind(sale.status)
        .bind(sale.subtotal)
        .bind(sale.tax)
        .bind(sale.discount)
        .bind(sale.total)
        .bind(sale.payment_method)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .bind(sale.cancelled_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Adds a line item to a sale.
    pub async fn insert_item(&mut self, item: &SaleItem) -> DbResult<()> {
        debug!(sale_id = %item.sale_id, product_id = %item.product_id, "Adding sale item");

        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, tenant_id, sale_id, product_id, quantity, unit_price, total, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.id)
        .bind(&item.tenant_id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.total)
        .bind(item.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Adds a payment leg to a sale.
    pub async fn insert_payment(&mut self, payment: &SalePayment) -> DbResult<()> {
        debug!(sale_id = %payment.sale_id, method = ?payment.method, amount = %payment.amount, "Adding payment");

        sqlx::query(
            r#"
            INSERT INTO sale_payments (
                id, tenant_id, sale_id, method, amount, currency, exchange_rate, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.tenant_id)
        .bind(&payment.sale_id)
        .bind(payment.method)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.exchange_rate.to_string())
        .bind(payment.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Gets all items of a sale.
    pub async fn items(&mut self, scope: &TenantScope, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, tenant_id, sale_id, product_id, quantity, unit_price, total, created_at
            FROM sale_items
            WHERE sale_id = ? AND tenant_id = ?
            ORDER BY created_at, rowid
            "#,
        )
        .bind(sale_id)
        .bind(scope.tenant_id())
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(items)
    }

    /// Gets all payments of a sale.
    pub async fn payments(
        &mut self,
        scope: &TenantScope,
        sale_id: &str,
    ) -> DbResult<Vec<SalePayment>> {
        let payments = sqlx::query_as::<_, SalePayment>(
            r#"
            SELECT id, tenant_id, sale_id, method, amount, currency, exchange_rate, created_at
            FROM sale_payments
            WHERE sale_id = ? AND tenant_id = ?
            ORDER BY created_at, rowid
            "#,
        )
        .bind(sale_id)
        .bind(scope.tenant_id())
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(payments)
    }

    /// Flips a sale to `cancelled` unless it already is.
    ///
    /// The status check and the transition are one statement, so of two
    /// concurrent callers exactly one sees `true`.
    pub async fn mark_cancelled(
        &mut self,
        scope: &TenantScope,
        sale_id: &str,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sales
            SET status = 'cancelled', cancelled_at = ?, updated_at = ?
            WHERE id = ? AND tenant_id = ? AND status != 'cancelled'
            "#,
        )
        .bind(at)
        .bind(at)
        .bind(sale_id)
        .bind(scope.tenant_id())
        .execute(&mut *self.conn)
        .await?;

        let claimed = result.rows_affected() == 1;
        debug!(sale_id, claimed, "Conditional cancel");
        Ok(claimed)
    }

    /// Cash payment legs of every sale attached to a register.
    pub async fn cash_legs(
        &mut self,
        scope: &TenantScope,
        cash_register_id: &str,
    ) -> DbResult<Vec<CashSaleLeg>> {
        let legs = sqlx::query_as::<_, CashSaleLeg>(
            r#"
            SELECT s.id AS sale_id, s.status AS sale_status, p.amount AS amount
            FROM sale_payments p
            JOIN sales s ON s.id = p.sale_id AND s.tenant_id = p.tenant_id
            WHERE s.tenant_id = ? AND s.cash_register_id = ? AND p.method = 'cash'
            ORDER BY s.created_at, p.rowid
            "#,
        )
        .bind(scope.tenant_id())
        .bind(cash_register_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(legs)
    }

    /// Stored totals and line sums of every sale of the tenant.
    pub async fn totals(&mut self, scope: &TenantScope) -> DbResult<Vec<SaleTotals>> {
        let rows = sqlx::query_as::<_, SaleTotals>(
            r#"
            SELECT
                s.id AS sale_id,
                s.status AS status,
                s.subtotal AS subtotal,
                s.total AS total,
                COALESCE((SELECT SUM(i.total) FROM sale_items i
                          WHERE i.sale_id = s.id AND i.tenant_id = s.tenant_id), 0) AS items_total,
                COALESCE((SELECT SUM(p.amount) FROM sale_payments p
                          WHERE p.sale_id = s.id AND p.tenant_id = s.tenant_id), 0) AS payments_total
            FROM sales s
            WHERE s.tenant_id = ?
            ORDER BY s.created_at, s.id
            "#,
        )
        .bind(scope.tenant_id())
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
