//! # till-engine: Reconciliation Engine
//!
//! The inbound surface of the ledger. Every public operation opens exactly
//! one unit of work, threads a [`TenantScope`] through every repository call,
//! and either commits all of its effects or none.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  engine.cancel_sale(tenant, sale_id)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  TenantScope::new(tenant) ──────────── malformed ──► TENANT_MISMATCH   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.begin()  ─────────────────────────────────────── BEGIN              │
//! │       │   claim status (conditional UPDATE)                             │
//! │       │   restore stock per component (atomic upserts)                  │
//! │       │   append CANCEL-{saleId} ledger rows                            │
//! │       ▼                                                                 │
//! │  uow.commit() ────────────────────────────────────── COMMIT             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  audit (after commit, failures logged and ignored)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`catalog`] - Products and composite recipes
//! - [`stock`] - Manual stock adjustments and counts
//! - [`sales`] - Recording sales
//! - [`cancellation`] - The cancellation workflow
//! - [`registers`] - Cash sessions and the balance fold
//! - [`integrity`] - Read-only consistency checks
//! - [`config`] - Environment configuration
//! - [`telemetry`] - Tracing setup
//! - [`error`] - Caller-facing error codes

pub mod cancellation;
pub mod catalog;
pub mod config;
pub mod error;
pub mod integrity;
pub mod registers;
pub mod sales;
pub mod stock;
pub mod telemetry;

pub use config::{ConfigError, EngineConfig};
pub use error::{EngineError, EngineResult, ErrorCode};

use serde_json::Value;
use till_core::TenantScope;
use till_db::Database;
use tracing::warn;

/// The reconciliation engine.
///
/// Holds no state besides the pool and configuration; it is cheap to share
/// behind an `Arc` across request handlers.
pub struct Engine {
    db: Database,
    config: EngineConfig,
}

impl Engine {
    pub fn new(db: Database, config: EngineConfig) -> Self {
        Engine { db, config }
    }

    /// Opens the database described by `config` and runs migrations.
    pub async fn connect(config: EngineConfig) -> EngineResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(Engine::new(db, config))
    }

    /// Underlying database handle.
    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Records a committed mutation in the audit log.
    ///
    /// Never fails the operation that called it.
    async fn audit(&self, scope: &TenantScope, operation: &str, details: Value) {
        if !self.config.audit_enabled {
            return;
        }
        if let Err(e) = self.db.audit().record(scope, operation, &details).await {
            warn!(tenant_id = %scope, operation, error = %e, "Audit log write failed");
        }
    }
}

/// Builds the scope for an inbound tenant id.
pub(crate) fn scope(tenant_id: &str) -> EngineResult<TenantScope> {
    Ok(TenantScope::new(tenant_id)?)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use till_db::DbConfig;

    pub const TENANT_A: &str = "11111111-1111-4111-8111-111111111111";
    pub const TENANT_B: &str = "22222222-2222-4222-8222-222222222222";
    pub const WAREHOUSE: &str = "W1";

    pub async fn engine() -> Engine {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Engine::new(db, EngineConfig::default())
    }
}
