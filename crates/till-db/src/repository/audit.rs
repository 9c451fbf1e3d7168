//! # Audit Repository
//!
//! Records tenant-scoped mutations after they commit. Observability only:
//! callers log a failed write and carry on.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use till_core::{AuditEntry, TenantScope};

/// Repository for the audit log. Works on the pool, outside any unit of work.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Appends one entry.
    pub async fn record(
        &self,
        scope: &TenantScope,
        operation: &str,
        details: &serde_json::Value,
    ) -> DbResult<()> {
        debug!(tenant_id = %scope, operation, "Writing audit entry");

        sqlx::query(
            "INSERT INTO audit_log (id, tenant_id, operation, details, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(scope.tenant_id())
        .bind(operation)
        .bind(details.to_string())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent entries of the tenant, newest first.
    pub async fn recent(&self, scope: &TenantScope, limit: u32) -> DbResult<Vec<AuditEntry>> {
        let rows = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, tenant_id, operation, details, created_at
            FROM audit_log
            WHERE tenant_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(scope.tenant_id())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::*;

    #[tokio::test]
    async fn test_audit_entries_are_tenant_scoped() {
        let db = database().await;
        let a = scope(TENANT_A);
        let b = scope(TENANT_B);

        db.audit()
            .record(&a, "cancel_sale", &serde_json::json!({ "sale_id": "S1" }))
            .await
            .unwrap();

        let entries = db.audit().recent(&a, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, "cancel_sale");
        assert!(entries[0].details.contains("S1"));

        assert!(db.audit().recent(&b, 10).await.unwrap().is_empty());
    }
}
