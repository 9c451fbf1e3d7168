//! # Domain Types
//!
//! Core domain types of the ledger and reconciliation engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │  CashRegister   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  is_composite   │1─N│  SaleItem       │   │  opening_amount │       │
//! │  │  components ────┤   │  SalePayment    │N─1│  status         │       │
//! │  │  (one level)    │   │  status         │   │  CashTransaction│       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │ WarehouseStock  │   │ StockJournal    │  append-only                │
//! │  │ (authoritative) │   │ Entry           │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every persisted entity carries `tenant_id` and implements
//! [`TenantOwned`](crate::tenant::TenantOwned).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::composite::StockMovement;
use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;
use crate::tenant::TenantOwned;

// =============================================================================
// Product
// =============================================================================

/// A sellable product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub tenant_id: String,
    pub sku: String,
    pub name: String,
    /// Assembled from component products at sale time.
    pub is_composite: bool,
    /// Denormalized projection of the WarehouseStock rows. Informational
    /// only; the reconciliation engine never writes it.
    pub stock: Quantity,
    /// Unit label ("unit", "kg", "lt", ...).
    pub unit_type: String,
    /// Whether fractional quantities may be sold.
    pub allow_decimals: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of a composite product's recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductComponent {
    pub id: String,
    pub tenant_id: String,
    pub parent_product_id: String,
    pub component_product_id: String,
    /// Consumed per one unit of the parent.
    pub quantity: Quantity,
    pub cost: Money,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Stock
// =============================================================================

/// Authoritative stock of one product in one warehouse.
///
/// May be negative (oversold) until a physical count catches up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct WarehouseStock {
    pub tenant_id: String,
    pub product_id: String,
    pub warehouse_id: String,
    pub stock: Quantity,
    pub updated_at: DateTime<Utc>,
}

impl WarehouseStock {
    /// Negative stock is a reporting signal, not an error.
    pub fn is_oversold(&self) -> bool {
        self.stock.is_negative()
    }
}

/// Why a stock movement happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockMovementReason {
    Sale,
    SaleCancellation,
    ManualAdjustment,
    InventoryCount,
}

/// One row of the append-only stock journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockJournalEntry {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    pub warehouse_id: String,
    pub delta: Quantity,
    pub reason: StockMovementReason,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
///
/// ```text
/// pending ──► completed ──► cancelled
///    │                         ▲
///    └─────────────────────────┘
/// ```
/// `cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Pending,
    Completed,
    Cancelled,
}

impl SaleStatus {
    /// Whether a cancellation may start from this status.
    pub fn can_cancel(&self) -> bool {
        !matches!(self, SaleStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Completed
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash into the register drawer.
    Cash,
    Card,
    Transfer,
    /// Customer credit account.
    Credit,
    /// Legacy `Sale.payment_method` marker for split tender. Never used on
    /// a `SalePayment`.
    Mixed,
}

impl PaymentMethod {
    /// Only cash moves the physical register balance.
    #[inline]
    pub fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// One commercial transaction. Never deleted once it has side effects;
/// cancellation is a tombstone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    pub warehouse_id: String,
    /// Not every sale touches a register.
    pub cash_register_id: Option<String>,
    pub user_id: Option<String>,
    pub status: SaleStatus,
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
    /// Legacy single-method field.
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// A line item in a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub tenant_id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Decimal quantity, e.g. 0.500 kg.
    pub quantity: Quantity,
    pub unit_price: Money,
    pub total: Money,
    pub created_at: DateTime<Utc>,
}

/// One payment-method leg of a sale's total.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SalePayment {
    pub id: String,
    pub tenant_id: String,
    pub sale_id: String,
    pub method: PaymentMethod,
    /// Amount in the tenant's base currency.
    pub amount: Money,
    /// ISO 4217 code the customer paid in.
    pub currency: String,
    #[cfg_attr(feature = "sqlx", sqlx(try_from = "String"))]
    pub exchange_rate: ExchangeRate,
    pub created_at: DateTime<Utc>,
}

/// Conversion rate from the payment currency to the base currency.
/// Informational; amounts are already in the base currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate(Decimal);

impl ExchangeRate {
    pub fn new(rate: Decimal) -> Result<Self, ValidationError> {
        if rate <= Decimal::ZERO {
            return Err(ValidationError::MustBePositive {
                field: "exchange_rate".to_string(),
            });
        }
        Ok(ExchangeRate(rate))
    }

    pub fn one() -> Self {
        ExchangeRate(Decimal::ONE)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl Default for ExchangeRate {
    fn default() -> Self {
        ExchangeRate::one()
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ExchangeRate {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let rate = Decimal::from_str(value.trim()).map_err(|e| ValidationError::InvalidFormat {
            field: "exchange_rate".to_string(),
            reason: e.to_string(),
        })?;
        ExchangeRate::new(rate)
    }
}

// =============================================================================
// Cash Register
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CashRegisterStatus {
    Open,
    Closed,
}

/// One open-to-close cycle of a physical till.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CashRegister {
    pub id: String,
    pub tenant_id: String,
    pub warehouse_id: String,
    pub user_id: String,
    pub opening_amount: Money,
    pub status: CashRegisterStatus,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    /// What the cashier physically counted at close.
    pub counted_amount: Option<Money>,
    /// What the ledger said the drawer should hold at close.
    pub expected_amount: Option<Money>,
}

impl CashRegister {
    pub fn is_open(&self) -> bool {
        self.status == CashRegisterStatus::Open
    }

    /// `counted − expected`, once closed.
    pub fn variance(&self) -> Option<Money> {
        Some(self.counted_amount? - self.expected_amount?)
    }
}

// =============================================================================
// Cash Transaction
// =============================================================================

/// Kind of cash-ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CashTransactionType {
    /// Legacy per-sale row; informational, never part of the balance.
    Sale,
    SaleCancellation,
    Income,
    Expense,
    Withdrawal,
}

impl CashTransactionType {
    /// Applies the sign convention to a magnitude: inflows positive,
    /// outflows and reversals negative.
    pub fn signed(&self, magnitude: Money) -> Money {
        match self {
            CashTransactionType::Sale | CashTransactionType::Income => magnitude.abs(),
            CashTransactionType::SaleCancellation
            | CashTransactionType::Expense
            | CashTransactionType::Withdrawal => -magnitude.abs(),
        }
    }

    /// Types a cashier may record by hand.
    pub fn is_manual(&self) -> bool {
        matches!(
            self,
            CashTransactionType::Income
                | CashTransactionType::Expense
                | CashTransactionType::Withdrawal
        )
    }
}

/// One signed, append-only cash-ledger row.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashTransaction {
    pub id: String,
    pub tenant_id: String,
    pub cash_register_id: String,
    #[serde(rename = "type")]
    pub kind: CashTransactionType,
    pub amount: Money,
    /// Correlation id, e.g. `VENTA-{saleId}` / `CANCEL-{saleId}`.
    pub reference: Option<String>,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Reports
// =============================================================================

/// Result of folding a register's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CashRegisterSummary {
    pub cash_register_id: String,
    pub status: CashRegisterStatus,
    pub opening_amount: Money,
    /// Gross cash SalePayments counted by the fold.
    pub total_cash_sales: Money,
    /// Magnitude of `sale_cancellation` rows.
    pub total_cancellations: Money,
    pub total_income: Money,
    /// Magnitude of `expense` rows.
    pub total_expenses: Money,
    /// Magnitude of `withdrawal` rows.
    pub total_withdrawals: Money,
    pub expected_balance: Money,
}

/// Stored when a register is closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ClosingReport {
    pub cash_register_id: String,
    pub expected_amount: Money,
    pub counted_amount: Money,
    /// `counted − expected`. Reported, never auto-corrected.
    pub variance: Money,
    #[ts(as = "String")]
    pub closed_at: DateTime<Utc>,
}

/// What a completed cancellation did.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CancellationOutcome {
    pub sale_id: String,
    pub status: SaleStatus,
    /// Stock restored, per product, in the sale's warehouse.
    pub restored: Vec<StockMovement>,
    /// Reversal rows appended to the cash ledger.
    pub reversals: Vec<CashTransaction>,
}

/// A sale whose stored totals disagree with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleMismatch {
    pub sale_id: String,
    /// The figure stored on the sale (total or subtotal).
    pub expected: Money,
    /// The sum of its payments or items.
    pub actual: Money,
}

/// Output of the read-only integrity check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct IntegrityReport {
    /// Σ SalePayment.amount ≠ Sale.total.
    pub payment_mismatches: Vec<SaleMismatch>,
    /// Σ SaleItem.total ≠ Sale.subtotal.
    pub subtotal_mismatches: Vec<SaleMismatch>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.payment_mismatches.is_empty() && self.subtotal_mismatches.is_empty()
    }
}

// =============================================================================
// Audit
// =============================================================================

/// One tenant-scoped mutation, recorded after commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditEntry {
    pub id: String,
    pub tenant_id: String,
    pub operation: String,
    /// JSON document.
    pub details: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Write Inputs
// =============================================================================

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub is_composite: bool,
    pub unit_type: String,
    pub allow_decimals: bool,
}

/// Input for recording a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSale {
    pub warehouse_id: String,
    pub cash_register_id: Option<String>,
    pub user_id: Option<String>,
    pub status: SaleStatus,
    pub tax: Money,
    pub discount: Money,
    pub items: Vec<NewSaleItem>,
    pub payments: Vec<NewSalePayment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSaleItem {
    pub product_id: String,
    pub quantity: Quantity,
    pub unit_price: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSalePayment {
    pub method: PaymentMethod,
    pub amount: Money,
    pub currency: String,
    pub exchange_rate: ExchangeRate,
}

impl NewSalePayment {
    /// A payment in the base currency.
    pub fn base(method: PaymentMethod, amount: Money) -> Self {
        NewSalePayment {
            method,
            amount,
            currency: "USD".to_string(),
            exchange_rate: ExchangeRate::one(),
        }
    }
}

// =============================================================================
// Tenant Ownership
// =============================================================================

macro_rules! tenant_owned {
    ($($ty:ty),* $(,)?) => {
        $(
            impl TenantOwned for $ty {
                fn tenant_id(&self) -> &str {
                    &self.tenant_id
                }
            }
        )*
    };
}

tenant_owned!(
    Product,
    ProductComponent,
    WarehouseStock,
    StockJournalEntry,
    Sale,
    SaleItem,
    SalePayment,
    CashRegister,
    CashTransaction,
    AuditEntry,
);

// =============================================================================
// Unit Tests
// =============================================================================
