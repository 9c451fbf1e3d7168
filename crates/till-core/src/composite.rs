//! Composite product resolution.
//!
//! ```text
//! simple P                      -> [(P, qty)]
//! composite K = [A x 2, B x 0.5] -> [(A, 2 qty), (B, 0.5 qty)]
//! ```
//!
//! One level deep. A component that is missing, composite itself, or the
//! parent again is `UnresolvedComponent`. Cancellation restores from the
//! sale's stock journal and only resolves here when that journal is gone.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::quantity::Quantity;
use crate::types::{Product, ProductComponent};

/// A `(product, quantity)` pair to push through the stock ledger. The
/// caller applies the sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockMovement {
    pub product_id: String,
    #[ts(type = "string")]
    pub quantity: Quantity,
}

/// How a product maps onto stock rows.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The product itself is the unit of stock.
    Simple,
    /// Stock lives in these components.
    Composite(Vec<ProductComponent>),
}

impl Resolution {
    /// Validates a composite's recipe one level deep.
    ///
    /// `component_products` holds the products the recipe rows point at, as
    /// found in the parent's tenant. Rows whose product is absent from it are
    /// unresolved.
    pub fn resolve(
        parent: &Product,
        rows: Vec<ProductComponent>,
        component_products: &[Product],
    ) -> CoreResult<Self> {
        if !parent.is_composite {
            return Ok(Resolution::Simple);
        }

        for row in &rows {
            let component_id = row.component_product_id.as_str();
            if component_id == parent.id {
                return Err(CoreError::unresolved(
                    &parent.id,
                    component_id,
                    "component is the parent itself",
                ));
            }
            let product = component_products
                .iter()
                .find(|p| p.id == component_id && p.tenant_id == parent.tenant_id)
                .ok_or_else(|| {
                    CoreError::unresolved(&parent.id, component_id, "component product not found")
                })?;
            if product.is_composite {
                return Err(CoreError::unresolved(
                    &parent.id,
                    component_id,
                    "component is itself composite",
                ));
            }
        }

        Ok(Resolution::Composite(rows))
    }

    /// The flat component list for `sold` units of the parent. Empty for a
    /// simple product.
    pub fn expand(&self, sold: Quantity) -> CoreResult<Vec<StockMovement>> {
        match self {
            Resolution::Simple => Ok(Vec::new()),
            Resolution::Composite(rows) => rows
                .iter()
                .map(|row| {
                    let quantity = row.quantity.checked_mul(sold).ok_or_else(|| {
                        ValidationError::Overflow {
                            field: "quantity".to_string(),
                        }
                    })?;
                    Ok(StockMovement {
                        product_id: row.component_product_id.clone(),
                        quantity,
                    })
                })
                .collect(),
        }
    }

    /// What to move for `sold` units of `product_id`: the components, or the
    /// product itself when simple.
    pub fn movements(&self, product_id: &str, sold: Quantity) -> CoreResult<Vec<StockMovement>> {
        match self {
            Resolution::Simple => Ok(vec![StockMovement {
                product_id: product_id.to_string(),
                quantity: sold,
            }]),
            Resolution::Composite(_) => self.expand(sold),
        }
    }
}
