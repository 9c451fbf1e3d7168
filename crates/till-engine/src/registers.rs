//! # Cash Sessions
//!
//! Opening, manual movements, the balance fold, and closing.
//!
//! ## Balance
//! ```text
//! expected = opening
//!          + Σ cash SalePayments of the register's sales
//!            (a cancelled sale counts only when its CANCEL-{id} row exists)
//!          + Σ ledger rows: income, expense, withdrawal, sale_cancellation
//! ```
//! Legacy `sale` rows never enter the balance. Summary, expected balance,
//! and close all go through [`till_core::fold_cash_ledger`].

use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use till_core::tenant::{assert_all, assert_tenant};
use till_core::validation::{validate_cash_amount, validate_id, validate_non_negative};
use till_core::{
    fold_cash_ledger, CashRegister, CashRegisterStatus, CashRegisterSummary, CashTransaction,
    CashTransactionType, ClosingReport, CoreError, Money, TenantScope, ValidationError,
};
use till_db::{DbError, UnitOfWork};

use crate::error::{EngineError, EngineResult};
use crate::{scope, Engine};

impl Engine {
    /// Opens a register. A warehouse has at most one open register per tenant.
    pub async fn open_register(
        &self,
        tenant_id: &str,
        warehouse_id: &str,
        user_id: &str,
        opening_amount: Money,
    ) -> EngineResult<CashRegister> {
        let scope = scope(tenant_id)?;
        validate_id("warehouse_id", warehouse_id)?;
        validate_id("user_id", user_id)?;
        validate_non_negative("opening_amount", opening_amount)?;

        let register = CashRegister {
            id: Uuid::new_v4().to_string(),
            tenant_id: scope.tenant_id().to_string(),
            warehouse_id: warehouse_id.to_string(),
            user_id: user_id.to_string(),
            opening_amount,
            status: CashRegisterStatus::Open,
            opened_at: Utc::now(),
            closed_at: None,
            counted_amount: None,
            expected_amount: None,
        };

        let mut uow = self.db.begin().await?;
        match uow.registers().insert(&register).await {
            Ok(()) => {}
            Err(DbError::UniqueViolation { .. }) => {
                return Err(EngineError::validation(format!(
                    "A cash register is already open for warehouse {warehouse_id}"
                )));
            }
            Err(e) => return Err(e.into()),
        }
        uow.commit().await?;

        info!(tenant_id = %scope, register_id = %register.id, warehouse_id, opening = %opening_amount, "Register opened");
        self.audit(
            &scope,
            "open_register",
            json!({
                "cashRegisterId": register.id,
                "warehouseId": warehouse_id,
                "openingAmount": opening_amount.cents(),
            }),
        )
        .await;

        Ok(register)
    }

    /// Records income, an expense, or a withdrawal. `amount` is the
    /// magnitude; the ledger stores it with the type's sign.
    pub async fn record_cash_movement(
        &self,
        tenant_id: &str,
        cash_register_id: &str,
        kind: CashTransactionType,
        amount: Money,
        description: Option<String>,
    ) -> EngineResult<CashTransaction> {
        let scope = scope(tenant_id)?;
        if !kind.is_manual() {
            return Err(EngineError::validation(format!(
                "{kind:?} rows are written by the sale workflows only"
            )));
        }
        validate_cash_amount(amount)?;

        let mut uow = self.db.begin().await?;
        let register = load_register(&mut uow, &scope, cash_register_id).await?;
        if !register.is_open() {
            return Err(CoreError::RegisterClosed {
                register_id: register.id,
            }
            .into());
        }

        let row = CashTransaction {
            id: Uuid::new_v4().to_string(),
            tenant_id: scope.tenant_id().to_string(),
            cash_register_id: register.id.clone(),
            kind,
            amount: kind.signed(amount),
            reference: None,
            description,
            created_at: Utc::now(),
        };
        uow.registers().append_transaction(&row).await?;
        uow.commit().await?;

        info!(tenant_id = %scope, register_id = %row.cash_register_id, kind = ?kind, amount = %row.amount, "Cash movement recorded");
        self.audit(
            &scope,
            "record_cash_movement",
            json!({
                "cashRegisterId": row.cash_register_id,
                "type": kind,
                "amount": row.amount.cents(),
            }),
        )
        .await;

        Ok(row)
    }

    /// Closes an open register, storing the expected balance, the counted
    /// amount, and their difference. The variance is reported, never
    /// corrected.
    pub async fn close_register(
        &self,
        tenant_id: &str,
        cash_register_id: &str,
        counted_amount: Money,
    ) -> EngineResult<ClosingReport> {
        let scope = scope(tenant_id)?;
        validate_non_negative("counted_amount", counted_amount)?;

        let mut uow = self.db.begin().await?;
        let register = load_register(&mut uow, &scope, cash_register_id).await?;
        if !register.is_open() {
            return Err(CoreError::RegisterClosed {
                register_id: register.id,
            }
            .into());
        }

        let summary = summarize(&mut uow, &scope, &register).await?;
        let variance = counted_amount
            .checked_sub(summary.expected_balance)
            .ok_or_else(|| ValidationError::Overflow {
                field: "variance".to_string(),
            })?;
        let closed_at = Utc::now();
        let closed = uow
            .registers()
            .close(
                &scope,
                &register.id,
                counted_amount,
                summary.expected_balance,
                closed_at,
            )
            .await?;
        if !closed {
            return Err(CoreError::RegisterClosed {
                register_id: register.id,
            }
            .into());
        }
        uow.commit().await?;

        let report = ClosingReport {
            cash_register_id: register.id,
            expected_amount: summary.expected_balance,
            counted_amount,
            variance,
            closed_at,
        };

        info!(
            tenant_id = %scope,
            register_id = %report.cash_register_id,
            expected = %report.expected_amount,
            counted = %report.counted_amount,
            variance = %report.variance,
            "Register closed"
        );
        self.audit(
            &scope,
            "close_register",
            json!({
                "cashRegisterId": report.cash_register_id,
                "expectedAmount": report.expected_amount.cents(),
                "countedAmount": report.counted_amount.cents(),
                "variance": report.variance.cents(),
            }),
        )
        .await;

        Ok(report)
    }

    /// Folds the register's payments and ledger rows, read in one
    /// transaction so both come from the same snapshot.
    pub async fn cash_register_summary(
        &self,
        tenant_id: &str,
        cash_register_id: &str,
    ) -> EngineResult<CashRegisterSummary> {
        let scope = scope(tenant_id)?;
        let mut uow = self.db.begin().await?;
        let register = load_register(&mut uow, &scope, cash_register_id).await?;
        let summary = summarize(&mut uow, &scope, &register).await?;
        uow.commit().await?;
        Ok(summary)
    }

    pub async fn compute_expected_balance(
        &self,
        tenant_id: &str,
        cash_register_id: &str,
    ) -> EngineResult<Money> {
        Ok(self
            .cash_register_summary(tenant_id, cash_register_id)
            .await?
            .expected_balance)
    }

    /// Ledger rows of a register, oldest first.
    pub async fn list_cash_transactions(
        &self,
        tenant_id: &str,
        cash_register_id: &str,
    ) -> EngineResult<Vec<CashTransaction>> {
        let scope = scope(tenant_id)?;
        let mut uow = self.db.begin().await?;
        let register = load_register(&mut uow, &scope, cash_register_id).await?;
        let rows = uow.registers().transactions(&scope, &register.id).await?;
        uow.commit().await?;
        assert_all(&rows, &scope)?;
        Ok(rows)
    }

    pub async fn get_register(
        &self,
        tenant_id: &str,
        cash_register_id: &str,
    ) -> EngineResult<CashRegister> {
        let scope = scope(tenant_id)?;
        let mut uow = self.db.begin().await?;
        let register = load_register(&mut uow, &scope, cash_register_id).await?;
        uow.commit().await?;
        Ok(register)
    }
}

/// Loads a register of the tenant or fails with `NOT_FOUND`.
pub(crate) async fn load_register(
    uow: &mut UnitOfWork,
    scope: &TenantScope,
    cash_register_id: &str,
) -> EngineResult<CashRegister> {
    let register = uow
        .registers()
        .get(scope, cash_register_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Cash register", cash_register_id))?;
    assert_tenant(&register, scope)?;
    Ok(register)
}

async fn summarize(
    uow: &mut UnitOfWork,
    scope: &TenantScope,
    register: &CashRegister,
) -> EngineResult<CashRegisterSummary> {
    let legs = uow.sales().cash_legs(scope, &register.id).await?;
    let transactions = uow.registers().transactions(scope, &register.id).await?;
    assert_all(&transactions, scope)?;
    Ok(fold_cash_ledger(register, &legs, &transactions))
}
