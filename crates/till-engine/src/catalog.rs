//! # Catalog Operations
//!
//! Products and the one-level composite recipes the resolver reads.

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use till_core::tenant::{assert_all, assert_tenant};
use till_core::validation::{
    validate_component_quantity, validate_id, validate_non_negative, validate_product_name,
    validate_sku,
};
use till_core::{
    CoreError, Money, NewProduct, Product, ProductComponent, Quantity, Resolution, StockMovement,
    TenantScope,
};
use till_db::UnitOfWork;

use crate::error::{EngineError, EngineResult};
use crate::{scope, Engine};

const DEFAULT_UNIT_TYPE: &str = "unit";

impl Engine {
    /// Creates a product with zero stock.
    pub async fn create_product(&self, tenant_id: &str, input: NewProduct) -> EngineResult<Product> {
        let scope = scope(tenant_id)?;
        validate_sku(&input.sku)?;
        validate_product_name(&input.name)?;

        let unit_type = match input.unit_type.trim() {
            "" => DEFAULT_UNIT_TYPE.to_string(),
            unit => unit.to_string(),
        };

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            tenant_id: scope.tenant_id().to_string(),
            sku: input.sku.trim().to_string(),
            name: input.name.trim().to_string(),
            is_composite: input.is_composite,
            stock: Quantity::zero(),
            unit_type,
            allow_decimals: input.allow_decimals,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let mut uow = self.db.begin().await?;
        uow.catalog().insert_product(&product).await?;
        uow.commit().await?;

        info!(tenant_id = %scope, product_id = %product.id, sku = %product.sku, "Product created");
        self.audit(
            &scope,
            "create_product",
            json!({ "productId": product.id, "sku": product.sku, "isComposite": product.is_composite }),
        )
        .await;

        Ok(product)
    }

    pub async fn get_product(&self, tenant_id: &str, product_id: &str) -> EngineResult<Product> {
        let scope = scope(tenant_id)?;
        let mut uow = self.db.begin().await?;
        let product = load_product(&mut uow, &scope, product_id).await?;
        uow.commit().await?;
        Ok(product)
    }

    /// Adds one recipe row to a composite product.
    ///
    /// ## Rules
    /// - the parent must be composite
    /// - the component must exist in the same tenant and must not be composite
    /// - a product cannot contain itself
    /// - the per-unit quantity must be positive
    pub async fn add_component(
        &self,
        tenant_id: &str,
        parent_product_id: &str,
        component_product_id: &str,
        quantity: Quantity,
        cost: Money,
    ) -> EngineResult<ProductComponent> {
        let scope = scope(tenant_id)?;
        validate_id("parent_product_id", parent_product_id)?;
        validate_id("component_product_id", component_product_id)?;
        validate_component_quantity(quantity)?;
        validate_non_negative("cost", cost)?;

        if parent_product_id == component_product_id {
            return Err(CoreError::unresolved(
                parent_product_id,
                component_product_id,
                "component is the parent itself",
            )
            .into());
        }

        let mut uow = self.db.begin().await?;

        let parent = load_product(&mut uow, &scope, parent_product_id).await?;
        if !parent.is_composite {
            return Err(EngineError::validation(format!(
                "Product {} is not composite",
                parent.id
            )));
        }

        let component = uow
            .catalog()
            .get_product(&scope, component_product_id)
            .await?
            .ok_or_else(|| {
                CoreError::unresolved(
                    parent_product_id,
                    component_product_id,
                    "component product not found",
                )
            })?;
        assert_tenant(&component, &scope)?;
        if component.is_composite {
            return Err(CoreError::unresolved(
                parent_product_id,
                component_product_id,
                "component is itself composite",
            )
            .into());
        }

        let row = ProductComponent {
            id: Uuid::new_v4().to_string(),
            tenant_id: scope.tenant_id().to_string(),
            parent_product_id: parent.id.clone(),
            component_product_id: component.id.clone(),
            quantity,
            cost,
            created_at: Utc::now(),
        };
        uow.catalog().insert_component(&row).await?;
        uow.commit().await?;

        info!(
            tenant_id = %scope,
            parent = %row.parent_product_id,
            component = %row.component_product_id,
            quantity = %row.quantity,
            "Component added"
        );
        self.audit(
            &scope,
            "add_component",
            json!({
                "parentProductId": row.parent_product_id,
                "componentProductId": row.component_product_id,
                "quantity": row.quantity.to_string(),
            }),
        )
        .await;

        Ok(row)
    }

    /// The component movements for `quantity` units of a product; empty when
    /// the product is simple.
    pub async fn expand(
        &self,
        tenant_id: &str,
        product_id: &str,
        quantity: Quantity,
    ) -> EngineResult<Vec<StockMovement>> {
        let scope = scope(tenant_id)?;
        let mut uow = self.db.begin().await?;
        let (_, resolution) = resolve_product(&mut uow, &scope, product_id).await?;
        uow.commit().await?;
        Ok(resolution.expand(quantity)?)
    }
}

/// Loads a product of the tenant or fails with `NOT_FOUND`.
pub(crate) async fn load_product(
    uow: &mut UnitOfWork,
    scope: &TenantScope,
    product_id: &str,
) -> EngineResult<Product> {
    let product = uow
        .catalog()
        .get_product(scope, product_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Product", product_id))?;
    assert_tenant(&product, scope)?;
    Ok(product)
}

/// Loads a product and resolves its recipe one level deep, inside the
/// caller's unit of work.
pub(crate) async fn resolve_product(
    uow: &mut UnitOfWork,
    scope: &TenantScope,
    product_id: &str,
) -> EngineResult<(Product, Resolution)> {
    let product = load_product(uow, scope, product_id).await?;
    if !product.is_composite {
        return Ok((product, Resolution::Simple));
    }

    let rows = uow.catalog().components_of(scope, &product.id).await?;
    assert_all(&rows, scope)?;

    let ids: Vec<String> = rows
        .iter()
        .map(|row| row.component_product_id.clone())
        .collect();
    let components = uow.catalog().get_products(scope, &ids).await?;
    debug!(product_id = %product.id, components = components.len(), "Resolving composite");

    let resolution = Resolution::resolve(&product, rows, &components)?;
    Ok((product, resolution))
}
