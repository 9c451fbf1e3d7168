//! # till-core: Pure Business Logic for the Till ledger
//!
//! This crate holds every rule of the cash-session ledger and the
//! sale-reversal engine that can be expressed without touching storage.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till Architecture                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Web application (external collaborator)              │   │
//! │  │    cancelSale ──► getCashRegisterSummary ──► adjustStock        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 till-engine (Reconciliation)                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌───────────┐ ┌──────────────┐     │   │
//! │  │   │  tenant  │ │  money   │ │ composite │ │    ledger    │     │   │
//! │  │   │  guard   │ │ quantity │ │ resolver  │ │    fold      │     │   │
//! │  │   └──────────┘ └──────────┘ └───────────┘ └──────────────┘     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-db (Database Layer)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, CashRegister, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`quantity`] - Fixed-point stock quantities
//! - [`tenant`] - Tenant Guard: scopes and record assertions
//! - [`composite`] - One-level composite product resolution
//! - [`ledger`] - The single cash-ledger fold
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::money::Money;
//! use till_core::quantity::Quantity;
//!
//! let price = Money::from_cents(1099); // $10.99
//! let half_kilo: Quantity = "0.5".parse().unwrap();
//!
//! assert_eq!(price.checked_mul_quantity(half_kilo).unwrap().cents(), 550);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod composite;
pub mod error;
pub mod ledger;
pub mod money;
pub mod quantity;
pub mod tenant;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use composite::{Resolution, StockMovement};
pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{fold_cash_ledger, CashSaleLeg};
pub use money::Money;
pub use quantity::Quantity;
pub use tenant::{assert_tenant, TenantOwned, TenantScope};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tenant used by the seed data and examples.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Reference prefix for the legacy ledger row written when a sale is recorded.
pub const SALE_REFERENCE_PREFIX: &str = "VENTA-";

/// Reference prefix for the reversal rows written when a sale is cancelled.
pub const CANCEL_REFERENCE_PREFIX: &str = "CANCEL-";

/// Builds the `VENTA-{saleId}` correlation reference.
pub fn sale_reference(sale_id: &str) -> String {
    format!("{SALE_REFERENCE_PREFIX}{sale_id}")
}

/// Builds the `CANCEL-{saleId}` correlation reference.
pub fn cancel_reference(sale_id: &str) -> String {
    format!("{CANCEL_REFERENCE_PREFIX}{sale_id}")
}
