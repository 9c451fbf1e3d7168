//! Cash sessions and their append-only transaction ledger.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use till_core::{CashRegister, CashTransaction, Money, TenantScope};

const REGISTER_COLUMNS: &str = "id, tenant_id, warehouse_id, user_id, opening_amount, status, \
                                opened_at, closed_at, counted_amount, expected_amount";

const TRANSACTION_COLUMNS: &str = "id, tenant_id, cash_register_id, type AS kind, amount, \
                                   reference, description, created_at";

/// Repository for cash registers and cash transactions.
pub struct CashRegisterRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> CashRegisterRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        CashRegisterRepository { conn }
    }

    /// Inserts a newly opened register.
    ///
    /// Fails with `UniqueViolation` when the warehouse already has an open
    /// register in this tenant.
    pub async fn insert(&mut self, register: &CashRegister) -> DbResult<()> {
        debug!(id = %register.id, warehouse_id = %register.warehouse_id, "Opening register");

        sqlx::query(
            r#"
            INSERT INTO cash_registers (
                id, tenant_id, warehouse_id, user_id, opening_amount, status, opened_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&register.id)
        .bind(&register.tenant_id)
        .bind(&register.warehouse_id)
        .bind(&register.user_id)
        .bind(register.opening_amount)
        .bind(register.status)
        .bind(register.opened_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Gets a register by ID within the tenant.
    pub async fn get(&mut self, scope: &TenantScope, id: &str) -> DbResult<Option<CashRegister>> {
        let sql = format!(
            "SELECT {REGISTER_COLUMNS} FROM cash_registers WHERE id = ? AND tenant_id = ?"
        );
        let register = sqlx::query_as::<_, CashRegister>(&sql)
            .bind(id)
            .bind(scope.tenant_id())
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(register)
    }

    /// The open register of a warehouse, if any.
    pub async fn find_open(
        &mut self,
        scope: &TenantScope,
        warehouse_id: &str,
    ) -> DbResult<Option<CashRegister>> {
        let sql = format!(
            "SELECT {REGISTER_COLUMNS} FROM cash_registers \
             WHERE tenant_id = ? AND warehouse_id = ? AND status = 'open'"
        );
        let register = sqlx::query_as::<_, CashRegister>(&sql)
            .bind(scope.tenant_id())
            .bind(warehouse_id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(register)
    }

    /// Closes an open register and stores the closing figures.
    ///
    /// Returns false when the register is not open (already closed, or not
    /// in this tenant).
    pub async fn close(
        &mut self,
        scope: &TenantScope,
        id: &str,
        counted: Money,
        expected: Money,
        closed_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE cash_registers
            SET status = 'closed', closed_at = ?, counted_amount = ?,
                expected_amount = ?, variance = ?
            WHERE id = ? AND tenant_id = ? AND status = 'open'
            "#,
        )
        .bind(closed_at)
        .bind(counted)
        .bind(expected)
        .bind(counted - expected)
        .bind(id)
        .bind(scope.tenant_id())
        .execute(&mut *self.conn)
        .await?;

        let closed = result.rows_affected() == 1;
        debug!(id, closed, "Conditional close");
        Ok(closed)
    }

    /// Appends a ledger row. Rows are never updated or deleted.
    pub async fn append_transaction(&mut self, tx: &CashTransaction) -> DbResult<()> {
        debug!(
            register_id = %tx.cash_register_id,
            kind = ?tx.kind,
            amount = %tx.amount,
            reference = ?tx.reference,
            "Appending cash transaction"
        );

        sqlx::query(
            r#"
            INSERT INTO cash_transactions (
                id, tenant_id, cash_register_id, type, amount, reference, description, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&tx.id)
        .bind(&tx.tenant_id)
        .bind(&tx.cash_register_id)
        .bind(tx.kind)
        .bind(tx.amount)
        .bind(&tx.reference)
        .bind(&tx.description)
        .bind(tx.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// The register's ledger, oldest first.
    pub async fn transactions(
        &mut self,
        scope: &TenantScope,
        cash_register_id: &str,
    ) -> DbResult<Vec<CashTransaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM cash_transactions \
             WHERE tenant_id = ? AND cash_register_id = ? ORDER BY created_at, rowid"
        );
        let rows = sqlx::query_as::<_, CashTransaction>(&sql)
            .bind(scope.tenant_id())
            .bind(cash_register_id)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::test_support::*;
    use till_core::{CashRegisterStatus, CashTransactionType};
    use uuid::Uuid;

    fn register(scope: &TenantScope, warehouse_id: &str) -> CashRegister {
        CashRegister {
            id: Uuid::new_v4().to_string(),
            tenant_id: scope.tenant_id().to_string(),
            warehouse_id: warehouse_id.to_string(),
            user_id: "U1".to_string(),
            opening_amount: Money::from_cents(100000),
            status: CashRegisterStatus::Open,
            opened_at: Utc::now(),
            closed_at: None,
            counted_amount: None,
            expected_amount: None,
        }
    }

    #[tokio::test]
    async fn test_one_open_register_per_warehouse() {
        let db = database().await;
        let a = scope(TENANT_A);
        let b = scope(TENANT_B);

        let mut uow = db.begin().await.unwrap();
        uow.registers().insert(&register(&a, "W1")).await.unwrap();

        let err = uow.registers().insert(&register(&a, "W1")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        // other warehouse and other tenant are independent
        uow.registers().insert(&register(&a, "W2")).await.unwrap();
        uow.registers().insert(&register(&b, "W1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_close_is_conditional() {
        let db = database().await;
        let a = scope(TENANT_A);
        let r = register(&a, "W1");

        let mut uow = db.begin().await.unwrap();
        uow.registers().insert(&r).await.unwrap();

        let counted = Money::from_cents(134950);
        let expected = Money::from_cents(135000);
        assert!(uow.registers().close(&a, &r.id, counted, expected, Utc::now()).await.unwrap());
        assert!(!uow.registers().close(&a, &r.id, counted, expected, Utc::now()).await.unwrap());

        let closed = uow.registers().get(&a, &r.id).await.unwrap().unwrap();
        assert_eq!(closed.status, CashRegisterStatus::Closed);
        assert_eq!(closed.variance(), Some(Money::from_cents(-50)));
        assert!(uow.registers().find_open(&a, "W1").await.unwrap().is_none());

        // a closed register frees the warehouse
        uow.registers().insert(&register(&a, "W1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_transactions_read_back_with_kind() {
        let db = database().await;
        let a = scope(TENANT_A);
        let r = register(&a, "W1");

        let mut uow = db.begin().await.unwrap();
        uow.registers().insert(&r).await.unwrap();
        uow.registers()
            .append_transaction(&CashTransaction {
                id: Uuid::new_v4().to_string(),
                tenant_id: a.tenant_id().to_string(),
                cash_register_id: r.id.clone(),
                kind: CashTransactionType::Withdrawal,
                amount: Money::from_cents(-20000),
                reference: None,
                description: Some("bank drop".to_string()),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let rows = uow.registers().transactions(&a, &r.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, CashTransactionType::Withdrawal);
        assert_eq!(rows[0].amount, Money::from_cents(-20000));

        let other = scope(TENANT_B);
        assert!(uow.registers().transactions(&other, &r.id).await.unwrap().is_empty());
    }
}
