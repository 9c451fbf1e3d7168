//! # Sale Cancellation
//!
//! Reverses a sale's stock and cash effects and tombstones it, in one unit
//! of work:
//!
//! 1. `UPDATE sales SET status='cancelled' WHERE status != 'cancelled'`;
//!    no row claimed means `NOT_FOUND` or `ALREADY_CANCELLED`
//! 2. every `VENTA-{saleId}` journal row is adjusted back, `CANCEL-{saleId}`
//! 3. every cash payment leg gets a negative `sale_cancellation` row
//! 4. commit; any failure above rolls back all of it
//!
//! Stock comes back from the sale's own journal, so recipe edits made after
//! the sale do not change what is restored. Sales without journal rows fall
//! back to resolving their lines against the current catalog.
//!
//! The status claim comes first so that two concurrent cancellations of the
//! same sale serialize on SQLite's write lock: the loser's conditional update
//! matches no row and it reports `ALREADY_CANCELLED`.

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use till_core::tenant::{assert_all, assert_tenant};
use till_core::validation::validate_id;
use till_core::{
    cancel_reference, sale_reference, CancellationOutcome, CashTransaction, CashTransactionType,
    CoreError, Sale, SaleItem, SaleStatus, StockMovement, StockMovementReason, TenantScope,
    ValidationError,
};
use till_db::UnitOfWork;

use crate::catalog::resolve_product;
use crate::error::{EngineError, EngineResult};
use crate::registers::load_register;
use crate::{scope, Engine};

const CANCELLATION_DESCRIPTION: &str = "Sale cancelled";

impl Engine {
    /// Cancels a sale exactly once.
    ///
    /// ## Errors
    /// - `NOT_FOUND` when the sale is absent from the caller's tenant
    /// - `ALREADY_CANCELLED` on the second and later calls
    /// - `UNRESOLVED_COMPONENT` when a composite line cannot be decomposed;
    ///   nothing is restored in that case
    /// - `STORAGE_CONFLICT` when the write lock could not be taken in time
    pub async fn cancel_sale(
        &self,
        tenant_id: &str,
        sale_id: &str,
    ) -> EngineResult<CancellationOutcome> {
        let scope = scope(tenant_id)?;
        validate_id("sale_id", sale_id)?;
        debug!(tenant_id = %scope, sale_id, "cancel_sale");

        let now = Utc::now();
        let mut uow = self.db.begin().await?;

        let claimed = uow.sales().mark_cancelled(&scope, sale_id, now).await?;
        let sale = uow
            .sales()
            .get(&scope, sale_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Sale", sale_id))?;
        if !claimed {
            return Err(CoreError::AlreadyCancelled {
                sale_id: sale.id,
            }
            .into());
        }
        assert_tenant(&sale, &scope)?;

        let reference = cancel_reference(&sale.id);

        let items = uow.sales().items(&scope, &sale.id).await?;
        assert_all(&items, &scope)?;

        let mut restored: Vec<StockMovement> = Vec::new();
        for (warehouse_id, movement) in consumed_stock(&mut uow, &scope, &sale, &items).await? {
            uow.stock()
                .adjust(
                    &scope,
                    &movement.product_id,
                    &warehouse_id,
                    movement.quantity,
                    StockMovementReason::SaleCancellation,
                    Some(reference.as_str()),
                )
                .await?;
            merge_movement(&mut restored, movement)?;
        }

        let mut reversals = Vec::new();
        if let Some(register_id) = &sale.cash_register_id {
            // Reversals land on the register even after it was closed.
            let register = load_register(&mut uow, &scope, register_id).await?;

            let payments = uow.sales().payments(&scope, &sale.id).await?;
            assert_all(&payments, &scope)?;

            for payment in payments.iter().filter(|p| p.method.is_cash()) {
                let row = CashTransaction {
                    id: Uuid::new_v4().to_string(),
                    tenant_id: scope.tenant_id().to_string(),
                    cash_register_id: register.id.clone(),
                    kind: CashTransactionType::SaleCancellation,
                    amount: CashTransactionType::SaleCancellation.signed(payment.amount),
                    reference: Some(reference.clone()),
                    description: Some(CANCELLATION_DESCRIPTION.to_string()),
                    created_at: now,
                };
                uow.registers().append_transaction(&row).await?;
                reversals.push(row);
            }
        }

        uow.commit().await?;

        info!(
            tenant_id = %scope,
            sale_id = %sale.id,
            items = items.len(),
            restored = restored.len(),
            reversals = reversals.len(),
            "Sale cancelled"
        );
        self.audit(
            &scope,
            "cancel_sale",
            json!({
                "saleId": sale.id,
                "warehouseId": sale.warehouse_id,
                "restored": restored.len(),
                "reversals": reversals.len(),
            }),
        )
        .await;

        Ok(CancellationOutcome {
            sale_id: sale.id,
            status: SaleStatus::Cancelled,
            restored,
            reversals,
        })
    }
}

/// What the sale took out of stock, as positive restore movements per
/// warehouse.
///
/// Every restored product must still be a simple product of the tenant;
/// anything else is `UNRESOLVED_COMPONENT` and aborts the cancellation.
async fn consumed_stock(
    uow: &mut UnitOfWork,
    scope: &TenantScope,
    sale: &Sale,
    items: &[SaleItem],
) -> EngineResult<Vec<(String, StockMovement)>> {
    let journal: Vec<_> = uow
        .stock()
        .movements_by_reference(scope, &sale_reference(&sale.id))
        .await?
        .into_iter()
        .filter(|entry| entry.reason == StockMovementReason::Sale)
        .collect();

    if journal.is_empty() {
        debug!(sale_id = %sale.id, "No sale journal, resolving lines");
        let mut consumed = Vec::new();
        for item in items {
            let (_, resolution) = resolve_product(uow, scope, &item.product_id).await?;
            for movement in resolution.movements(&item.product_id, item.quantity)? {
                consumed.push((sale.warehouse_id.clone(), movement));
            }
        }
        return Ok(consumed);
    }

    let mut consumed = Vec::with_capacity(journal.len());
    for entry in journal {
        let product = uow
            .catalog()
            .get_product(scope, &entry.product_id)
            .await?
            .ok_or_else(|| {
                CoreError::unresolved(&sale.id, &entry.product_id, "product no longer exists")
            })?;
        if product.is_composite {
            return Err(CoreError::unresolved(
                &sale.id,
                &product.id,
                "consumed product is now composite",
            )
            .into());
        }
        consumed.push((
            entry.warehouse_id,
            StockMovement {
                product_id: entry.product_id,
                quantity: -entry.delta,
            },
        ));
    }
    Ok(consumed)
}

/// Sums movements of the same product so the outcome lists each product once.
fn merge_movement(
    restored: &mut Vec<StockMovement>,
    movement: StockMovement,
) -> Result<(), ValidationError> {
    match restored
        .iter_mut()
        .find(|m| m.product_id == movement.product_id)
    {
        Some(existing) => {
            existing.quantity = existing
                .quantity
                .checked_add(movement.quantity)
                .ok_or_else(|| ValidationError::Overflow {
                    field: "restored quantity".to_string(),
                })?;
        }
        None => restored.push(movement),
    }
    Ok(())
}
