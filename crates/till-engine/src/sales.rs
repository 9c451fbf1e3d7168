//! # Sale Recording
//!
//! The write path used by the POS flow. A sale, its lines, its payment legs,
//! the stock it consumes, and its legacy ledger row commit together.

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use till_core::validation::{check_payments_cover_total, validate_new_sale, validate_sale_quantity};
use till_core::{
    sale_reference, CashTransaction, CashTransactionType, CoreError, Money, NewSale,
    NewSaleItem, PaymentMethod, Resolution, Sale, SaleItem, SalePayment, SaleStatus,
    StockMovementReason, ValidationError,
};

use crate::catalog::resolve_product;
use crate::error::{EngineError, EngineResult};
use crate::registers::load_register;
use crate::{scope, Engine};

/// One validated line, priced and resolved.
struct PricedLine<'a> {
    item: &'a NewSaleItem,
    resolution: Resolution,
    total: Money,
}

impl Engine {
    /// Records a sale in `completed` or `pending` state.
    ///
    /// ## Steps (one unit of work)
    /// 1. Shape checks, then the register: same tenant, open, same warehouse
    /// 2. Resolve every product and apply its decimal policy
    /// 3. Price the lines; `total = subtotal + tax - discount`
    /// 4. Σ payments must match the total within the configured tolerance
    /// 5. Insert sale, lines, payment legs
    /// 6. Decrement stock, decomposed through the resolver (`VENTA-{id}`)
    /// 7. Append the legacy `sale` ledger row for the cash portion
    pub async fn record_sale(&self, tenant_id: &str, input: NewSale) -> EngineResult<Sale> {
        let scope = scope(tenant_id)?;
        validate_new_sale(&input)?;
        if input.status == SaleStatus::Cancelled {
            return Err(EngineError::validation("A sale cannot be recorded as cancelled"));
        }

        let mut uow = self.db.begin().await?;

        if let Some(register_id) = &input.cash_register_id {
            let register = load_register(&mut uow, &scope, register_id).await?;
            if !register.is_open() {
                return Err(CoreError::RegisterClosed {
                    register_id: register.id,
                }
                .into());
            }
            if register.warehouse_id != input.warehouse_id {
                return Err(EngineError::validation(format!(
                    "Cash register {} belongs to warehouse {}",
                    register.id, register.warehouse_id
                )));
            }
        }

        let mut lines = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let (product, resolution) = resolve_product(&mut uow, &scope, &item.product_id).await?;
            validate_sale_quantity(item.quantity, product.allow_decimals)?;
            let total = item
                .unit_price
                .checked_mul_quantity(item.quantity)
                .ok_or_else(|| overflow("line total"))?;
            lines.push(PricedLine {
                item,
                resolution,
                total,
            });
        }

        let subtotal = Money::checked_sum(lines.iter().map(|line| line.total))
            .ok_or_else(|| overflow("subtotal"))?;
        let total = subtotal
            .checked_add(input.tax)
            .and_then(|gross| gross.checked_sub(input.discount))
            .ok_or_else(|| overflow("total"))?;
        if total.is_negative() {
            return Err(EngineError::validation("Discount exceeds subtotal plus tax"));
        }

        let paid = Money::checked_sum(input.payments.iter().map(|p| p.amount))
            .ok_or_else(|| overflow("payments"))?;
        if !input.payments.is_empty() || input.status == SaleStatus::Completed {
            check_payments_cover_total(total, paid, self.config.money_tolerance())?;
        }

        let now = Utc::now();
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            tenant_id: scope.tenant_id().to_string(),
            warehouse_id: input.warehouse_id.clone(),
            cash_register_id: input.cash_register_id.clone(),
            user_id: input.user_id.clone(),
            status: input.status,
            subtotal,
            tax: input.tax,
            discount: input.discount,
            total,
            payment_method: legacy_payment_method(&input),
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        };
        uow.sales().insert_sale(&sale).await?;

        for line in &lines {
            let row = SaleItem {
                id: Uuid::new_v4().to_string(),
                tenant_id: sale.tenant_id.clone(),
                sale_id: sale.id.clone(),
                product_id: line.item.product_id.clone(),
                quantity: line.item.quantity,
                unit_price: line.item.unit_price,
                total: line.total,
                created_at: now,
            };
            uow.sales().insert_item(&row).await?;
        }

        for payment in &input.payments {
            let row = SalePayment {
                id: Uuid::new_v4().to_string(),
                tenant_id: sale.tenant_id.clone(),
                sale_id: sale.id.clone(),
                method: payment.method,
                amount: payment.amount,
                currency: payment.currency.clone(),
                exchange_rate: payment.exchange_rate,
                created_at: now,
            };
            uow.sales().insert_payment(&row).await?;
        }

        let reference = sale_reference(&sale.id);
        for line in &lines {
            let movements = line
                .resolution
                .movements(&line.item.product_id, line.item.quantity)?;
            for movement in movements {
                uow.stock()
                    .adjust(
                        &scope,
                        &movement.product_id,
                        &sale.warehouse_id,
                        -movement.quantity,
                        StockMovementReason::Sale,
                        Some(reference.as_str()),
                    )
                    .await?;
            }
        }

        // bounded by `paid`
        let cash: Money = input
            .payments
            .iter()
            .filter(|p| p.method.is_cash())
            .map(|p| p.amount)
            .sum();
        if let (Some(register_id), true) = (&sale.cash_register_id, cash.is_positive()) {
            debug!(sale_id = %sale.id, cash = %cash, "Appending legacy sale row");
            let row = CashTransaction {
                id: Uuid::new_v4().to_string(),
                tenant_id: sale.tenant_id.clone(),
                cash_register_id: register_id.clone(),
                kind: CashTransactionType::Sale,
                amount: CashTransactionType::Sale.signed(cash),
                reference: Some(reference.clone()),
                description: None,
                created_at: now,
            };
            uow.registers().append_transaction(&row).await?;
        }

        uow.commit().await?;

        info!(
            tenant_id = %scope,
            sale_id = %sale.id,
            total = %sale.total,
            items = lines.len(),
            payments = input.payments.len(),
            "Sale recorded"
        );
        self.audit(
            &scope,
            "record_sale",
            json!({
                "saleId": sale.id,
                "status": sale.status.as_str(),
                "total": sale.total.cents(),
                "cashRegisterId": sale.cash_register_id,
            }),
        )
        .await;

        Ok(sale)
    }

    pub async fn get_sale(&self, tenant_id: &str, sale_id: &str) -> EngineResult<Sale> {
        let scope = scope(tenant_id)?;
        let mut uow = self.db.begin().await?;
        let sale = uow
            .sales()
            .get(&scope, sale_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Sale", sale_id))?;
        uow.commit().await?;
        till_core::assert_tenant(&sale, &scope)?;
        Ok(sale)
    }

    pub async fn list_sale_items(&self, tenant_id: &str, sale_id: &str) -> EngineResult<Vec<SaleItem>> {
        let scope = scope(tenant_id)?;
        let mut uow = self.db.begin().await?;
        let items = uow.sales().items(&scope, sale_id).await?;
        uow.commit().await?;
        Ok(items)
    }

    pub async fn list_sale_payments(
        &self,
        tenant_id: &str,
        sale_id: &str,
    ) -> EngineResult<Vec<SalePayment>> {
        let scope = scope(tenant_id)?;
        let mut uow = self.db.begin().await?;
        let payments = uow.sales().payments(&scope, sale_id).await?;
        uow.commit().await?;
        Ok(payments)
    }
}

/// The single-method field kept for older readers: the one method used,
/// `mixed` for split tender, `cash` when nothing was paid yet.
fn legacy_payment_method(sale: &NewSale) -> PaymentMethod {
    let mut methods = sale.payments.iter().map(|p| p.method);
    match methods.next() {
        None => PaymentMethod::Cash,
        Some(first) if methods.all(|m| m == first) => first,
        Some(_) => PaymentMethod::Mixed,
    }
}

fn overflow(field: &str) -> ValidationError {
    ValidationError::Overflow {
        field: field.to_string(),
    }
}
