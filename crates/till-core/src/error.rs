//! Domain errors: [`CoreError`] for rule violations and [`ValidationError`]
//! for bad input. till-engine maps both onto `EngineError` next to
//! till-db's `DbError`; nothing is recovered locally.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A record's tenant is absent, malformed, or not the caller's.
    ///
    /// Security relevant: always fatal to the operation, never retried.
    #[error("Tenant mismatch: {reason}")]
    TenantMismatch { reason: String },

    /// Sale, product, or register does not exist for this tenant.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The sale was already cancelled.
    ///
    /// ## When This Occurs
    /// ```text
    /// cancel_sale(S1) ──► Ok (status: cancelled)
    /// cancel_sale(S1) ──► AlreadyCancelled   ← UI retry, duplicate request
    /// ```
    /// Callers treat it as "no further action needed".
    #[error("Sale {sale_id} is already cancelled")]
    AlreadyCancelled { sale_id: String },

    /// A composite product references a component that cannot be resolved:
    /// missing in the tenant, itself composite, or the parent itself.
    #[error("Unresolved component {component_id} of product {product_id}: {reason}")]
    UnresolvedComponent {
        product_id: String,
        component_id: String,
        reason: String,
    },

    /// Operation not allowed in the sale's current status.
    #[error("Sale {sale_id} is {current_status}, cannot perform operation")]
    InvalidSaleStatus {
        sale_id: String,
        current_status: String,
    },

    /// The cash register is closed.
    #[error("Cash register {register_id} is closed")]
    RegisterClosed { register_id: String },

    /// Payments do not add up to the sale total.
    #[error("Payments total {paid} but sale total is {total}")]
    PaymentMismatch { total: String, paid: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a TenantMismatch error.
    pub fn tenant_mismatch(reason: impl Into<String>) -> Self {
        CoreError::TenantMismatch {
            reason: reason.into(),
        }
    }

    /// Creates an UnresolvedComponent error.
    pub fn unresolved(
        product_id: impl Into<String>,
        component_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CoreError::UnresolvedComponent {
            product_id: product_id.into(),
            component_id: component_id.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before any unit of work is opened.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, too many decimal places).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is outside the representable range.
    #[error("{field} is out of range")]
    Overflow { field: String },

    /// Value is not allowed in this context.
    #[error("{field} is not allowed: {reason}")]
    NotAllowed { field: String, reason: String },
}

impl ValidationError {
    pub(crate) fn invalid_format(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::AlreadyCancelled {
            sale_id: "S-1".to_string(),
        };
        assert_eq!(err.to_string(), "Sale S-1 is already cancelled");

        let err = CoreError::not_found("Sale", "S-2");
        assert_eq!(err.to_string(), "Sale not found: S-2");
    }

    #[test]
    fn test_unresolved_component_message() {
        let err = CoreError::unresolved("P-1", "C-9", "component product not found");
        assert_eq!(
            err.to_string(),
            "Unresolved component C-9 of product P-1: component product not found"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sale_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
