//! # Catalog Repository
//!
//! Products and the one-level recipes of composite products.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use till_core::{Product, ProductComponent, Quantity, TenantScope};

const PRODUCT_COLUMNS: &str = "id, tenant_id, sku, name, is_composite, stock, unit_type, \
                               allow_decimals, is_active, created_at, updated_at";

/// Repository for products and product components.
pub struct CatalogRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> CatalogRepository<'c> {
    /// Creates a new CatalogRepository on a borrowed connection.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        CatalogRepository { conn }
    }

    /// Inserts a product.
    pub async fn insert_product(&mut self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, sku, name, is_composite, stock, unit_type,
                allow_decimals, is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.is_composite)
        .bind(product.stock)
        .bind(&product.unit_type)
        .bind(product.allow_decimals)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Gets a product by ID within the tenant.
    pub async fn get_product(&mut self, scope: &TenantScope, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ? AND tenant_id = ?");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(scope.tenant_id())
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(product)
    }

    /// Loads the products a recipe points at. Ids not found in the tenant
    /// are simply absent from the result.
    pub async fn get_products(
        &mut self,
        scope: &TenantScope,
        ids: &[String],
    ) -> DbResult<Vec<Product>> {
        let mut products = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(product) = self.get_product(scope, id).await? {
                products.push(product);
            }
        }
        Ok(products)
    }

    /// Recipe rows of a composite product.
    pub async fn components_of(
        &mut self,
        scope: &TenantScope,
        parent_product_id: &str,
    ) -> DbResult<Vec<ProductComponent>> {
        let rows = sqlx::query_as::<_, ProductComponent>(
            r#"
            SELECT id, tenant_id, parent_product_id, component_product_id,
                   quantity, cost, created_at
            FROM product_components
            WHERE parent_product_id = ? AND tenant_id = ?
            ORDER BY created_at, id
            "#,
        )
        .bind(parent_product_id)
        .bind(scope.tenant_id())
        .fetch_all(&mut *self.conn)
        .await?;

        debug!(parent_product_id, count = rows.len(), "Loaded components");
        Ok(rows)
    }

    /// Inserts a recipe row. Write-time validation is the caller's job.
    pub async fn insert_component(&mut self, component: &ProductComponent) -> DbResult<()> {
        debug!(
            parent = %component.parent_product_id,
            component = %component.component_product_id,
            "Inserting product component"
        );

        sqlx::query(
            r#"
            INSERT INTO product_components (
                id, tenant_id, parent_product_id, component_product_id,
                quantity, cost, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&component.id)
        .bind(&component.tenant_id)
        .bind(&component.parent_product_id)
        .bind(&component.component_product_id)
        .bind(component.quantity)
        .bind(component.cost)
        .bind(component.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Overwrites the informational `products.stock` projection.
    ///
    /// Returns false when the product is not in the tenant.
    pub async fn set_stock_projection(
        &mut self,
        scope: &TenantScope,
        product_id: &str,
        stock: Quantity,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE products SET stock = ?, updated_at = ? WHERE id = ? AND tenant_id = ?",
        )
        .bind(stock)
        .bind(Utc::now())
        .bind(product_id)
        .bind(scope.tenant_id())
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
