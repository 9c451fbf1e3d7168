//! # Stock Operations
//!
//! Manual adjustments and physical counts. Sales and cancellations move
//! stock through the same `adjust` primitive from their own modules.

use serde_json::json;
use tracing::{info, warn};

use till_core::validation::validate_id;
use till_core::{Quantity, StockMovementReason, ValidationError};

use crate::catalog::load_product;
use crate::error::{EngineError, EngineResult};
use crate::{scope, Engine};

impl Engine {
    /// Applies a signed delta to one (product, warehouse) row and returns the
    /// new quantity. Negative results are allowed.
    pub async fn adjust_stock(
        &self,
        tenant_id: &str,
        product_id: &str,
        warehouse_id: &str,
        delta: Quantity,
    ) -> EngineResult<Quantity> {
        let scope = scope(tenant_id)?;
        validate_id("warehouse_id", warehouse_id)?;
        if delta.is_zero() {
            return Err(ValidationError::NotAllowed {
                field: "delta".to_string(),
                reason: "must not be zero".to_string(),
            }
            .into());
        }

        let mut uow = self.db.begin().await?;
        let product = load_product(&mut uow, &scope, product_id).await?;
        if product.is_composite {
            return Err(composite_stock_error(&product.id));
        }

        let stock = uow
            .stock()
            .adjust(
                &scope,
                &product.id,
                warehouse_id,
                delta,
                StockMovementReason::ManualAdjustment,
                None,
            )
            .await?;
        uow.commit().await?;

        info!(tenant_id = %scope, product_id, warehouse_id, delta = %delta, stock = %stock, "Stock adjusted");
        self.audit(
            &scope,
            "adjust_stock",
            json!({
                "productId": product_id,
                "warehouseId": warehouse_id,
                "delta": delta.to_string(),
                "stock": stock.to_string(),
            }),
        )
        .await;

        Ok(stock)
    }

    /// Records a physical count: sets the quantity absolutely and journals
    /// the difference as an inventory count.
    pub async fn set_stock_count(
        &self,
        tenant_id: &str,
        product_id: &str,
        warehouse_id: &str,
        counted: Quantity,
    ) -> EngineResult<Quantity> {
        let scope = scope(tenant_id)?;
        validate_id("warehouse_id", warehouse_id)?;
        if counted.is_negative() {
            return Err(ValidationError::NotAllowed {
                field: "counted".to_string(),
                reason: "must not be negative".to_string(),
            }
            .into());
        }

        let mut uow = self.db.begin().await?;
        let product = load_product(&mut uow, &scope, product_id).await?;
        if product.is_composite {
            return Err(composite_stock_error(&product.id));
        }

        let current = uow.stock().quantity(&scope, product_id, warehouse_id).await?;
        let delta = counted
            .checked_sub(current)
            .ok_or_else(|| ValidationError::Overflow {
                field: "counted".to_string(),
            })?;
        if !delta.is_zero() {
            uow.stock()
                .adjust(
                    &scope,
                    product_id,
                    warehouse_id,
                    delta,
                    StockMovementReason::InventoryCount,
                    None,
                )
                .await?;
        }
        uow.commit().await?;

        if current.is_negative() {
            warn!(product_id, warehouse_id, previous = %current, "Count corrected oversold stock");
        }
        info!(tenant_id = %scope, product_id, warehouse_id, counted = %counted, delta = %delta, "Stock counted");
        self.audit(
            &scope,
            "set_stock_count",
            json!({
                "productId": product_id,
                "warehouseId": warehouse_id,
                "previous": current.to_string(),
                "counted": counted.to_string(),
            }),
        )
        .await;

        Ok(counted)
    }

    /// Quantity of one (product, warehouse) row; zero if it was never moved.
    pub async fn get_stock(
        &self,
        tenant_id: &str,
        product_id: &str,
        warehouse_id: &str,
    ) -> EngineResult<Quantity> {
        let scope = scope(tenant_id)?;
        let mut uow = self.db.begin().await?;
        let stock = uow.stock().quantity(&scope, product_id, warehouse_id).await?;
        uow.commit().await?;
        Ok(stock)
    }

    /// Rewrites the informational `Product.stock` field as the sum of the
    /// product's warehouse rows. Nothing in the sale or cancellation paths
    /// calls this.
    pub async fn refresh_stock_projection(
        &self,
        tenant_id: &str,
        product_id: &str,
    ) -> EngineResult<Quantity> {
        let scope = scope(tenant_id)?;
        let mut uow = self.db.begin().await?;
        let total = uow.stock().total_for_product(&scope, product_id).await?;
        if !uow
            .catalog()
            .set_stock_projection(&scope, product_id, total)
            .await?
        {
            return Err(EngineError::not_found("Product", product_id));
        }
        uow.commit().await?;

        info!(tenant_id = %scope, product_id, stock = %total, "Stock projection refreshed");
        Ok(total)
    }
}

fn composite_stock_error(product_id: &str) -> EngineError {
    EngineError::validation(format!(
        "Product {product_id} is composite; its stock lives in its components"
    ))
}
