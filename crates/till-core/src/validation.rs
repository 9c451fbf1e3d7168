//! Input checks run by engine operations before a unit of work is opened.
//! SQLite constraints and triggers back them up.
//!
//! ```rust
//! use till_core::validation::{validate_sku, validate_cash_amount};
//! use till_core::Money;
//!
//! validate_sku("QUESO-KG").unwrap();
//! validate_cash_amount(Money::from_cents(5000)).unwrap();
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{NewSale, PaymentMethod};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest identifier accepted for ids coming from callers.
pub const MAX_ID_LEN: usize = 64;

/// Most line items a single sale may carry.
pub const MAX_SALE_ITEMS: usize = 500;

/// Largest single amount accepted from a caller: $1,000,000,000,000.00.
pub const MAX_AMOUNT: Money = Money::from_cents(100_000_000_000_000);

// =============================================================================
// String Validators
// =============================================================================

/// Validates an entity identifier supplied by a caller.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if id.len() > MAX_ID_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_ID_LEN,
        });
    }
    Ok(())
}

/// Validates a SKU.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_sku;
///
/// assert!(validate_sku("COMBO-01").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid_format(
            "sku",
            "only letters, digits, '-' and '_' are allowed",
        ));
    }

    Ok(())
}

pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }
    Ok(())
}

/// ISO 4217 style code: three ASCII uppercase letters.
pub fn validate_currency(code: &str) -> ValidationResult<()> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::invalid_format(
            "currency",
            "expected a three-letter ISO code",
        ));
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a sold quantity against the product's decimal policy.
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_sale_quantity;
/// use till_core::Quantity;
///
/// let half: Quantity = "0.5".parse().unwrap();
/// assert!(validate_sale_quantity(half, true).is_ok());
/// assert!(validate_sale_quantity(half, false).is_err());
/// assert!(validate_sale_quantity(Quantity::zero(), true).is_err());
/// ```
pub fn validate_sale_quantity(qty: Quantity, allow_decimals: bool) -> ValidationResult<()> {
    if !qty.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if !allow_decimals && !qty.is_whole() {
        return Err(ValidationError::NotAllowed {
            field: "quantity".to_string(),
            reason: format!("product is sold in whole units, got {qty}"),
        });
    }
    Ok(())
}

/// Per-unit quantity of a recipe row.
pub fn validate_component_quantity(qty: Quantity) -> ValidationResult<()> {
    if !qty.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "component quantity".to_string(),
        });
    }
    Ok(())
}

fn validate_bounded(field: &str, amount: Money) -> ValidationResult<()> {
    if amount > MAX_AMOUNT {
        return Err(ValidationError::NotAllowed {
            field: field.to_string(),
            reason: format!("must not exceed {MAX_AMOUNT}"),
        });
    }
    Ok(())
}

/// Prices, costs, tax and discount may be zero but never negative.
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::NotAllowed {
            field: field.to_string(),
            reason: "must not be negative".to_string(),
        });
    }
    validate_bounded(field, amount)
}

/// Magnitude of a manual cash movement. The ledger applies the sign.
pub fn validate_cash_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    validate_bounded("amount", amount)
}

// =============================================================================
// Sale Validators
// =============================================================================

/// Shape checks on a sale before it reaches storage.
///
/// Product-dependent rules (decimal policy, resolution) and the payment sum
/// are checked later, once totals are known.
pub fn validate_new_sale(sale: &NewSale) -> ValidationResult<()> {
    validate_id("warehouse_id", &sale.warehouse_id)?;
    if let Some(register_id) = &sale.cash_register_id {
        validate_id("cash_register_id", register_id)?;
    }

    if sale.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }
    if sale.items.len() > MAX_SALE_ITEMS {
        return Err(ValidationError::NotAllowed {
            field: "items".to_string(),
            reason: format!("at most {MAX_SALE_ITEMS} lines per sale"),
        });
    }

    for item in &sale.items {
        validate_id("product_id", &item.product_id)?;
        if !item.quantity.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            });
        }
        validate_non_negative("unit_price", item.unit_price)?;
    }

    validate_non_negative("tax", sale.tax)?;
    validate_non_negative("discount", sale.discount)?;

    for payment in &sale.payments {
        if payment.method == PaymentMethod::Mixed {
            return Err(ValidationError::NotAllowed {
                field: "payment method".to_string(),
                reason: "mixed is not a payment leg".to_string(),
            });
        }
        if !payment.amount.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "payment amount".to_string(),
            });
        }
        validate_bounded("payment amount", payment.amount)?;
        validate_currency(&payment.currency)?;
    }

    let has_cash = sale.payments.iter().any(|p| p.method.is_cash());
    if has_cash && sale.cash_register_id.is_none() {
        return Err(ValidationError::Required {
            field: "cash_register_id".to_string(),
        });
    }

    Ok(())
}

/// Σ payments must equal the sale total within `tolerance`.
pub fn check_payments_cover_total(total: Money, paid: Money, tolerance: Money) -> CoreResult<()> {
    if !total.within(paid, tolerance) {
        return Err(CoreError::PaymentMismatch {
            total: total.to_string(),
            paid: paid.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
