//! Cash ledger fold: the only place a register's expected balance is
//! computed.
//!
//! ```text
//! expected = opening
//!          + cash payment legs on the register
//!          + income, expense, withdrawal and sale_cancellation rows (signed)
//! ```
//!
//! A cancelled sale's legs count only when its `CANCEL-{id}` row exists.
//! Legacy `sale` rows are skipped since the legs already count them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{
    CashRegister, CashRegisterSummary, CashTransaction, CashTransactionType, SaleStatus,
};

/// A cash SalePayment of a sale attached to the register being folded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CashSaleLeg {
    pub sale_id: String,
    pub sale_status: SaleStatus,
    pub amount: Money,
}

/// Folds a register's payment legs and ledger rows into its summary.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use till_core::*;
///
/// let now = Utc::now();
/// let register = CashRegister {
///     id: "R1".into(),
///     tenant_id: DEFAULT_TENANT_ID.into(),
///     warehouse_id: "W1".into(),
///     user_id: "U1".into(),
///     opening_amount: Money::from_cents(100000),
///     status: CashRegisterStatus::Open,
///     opened_at: now,
///     closed_at: None,
///     counted_amount: None,
///     expected_amount: None,
/// };
/// let legs = vec![CashSaleLeg {
///     sale_id: "S1".into(),
///     sale_status: SaleStatus::Completed,
///     amount: Money::from_cents(35000),
/// }];
///
/// let summary = fold_cash_ledger(&register, &legs, &[]);
/// assert_eq!(summary.expected_balance, Money::from_cents(135000));
/// ```
pub fn fold_cash_ledger(
    register: &CashRegister,
    legs: &[CashSaleLeg],
    transactions: &[CashTransaction],
) -> CashRegisterSummary {
    let reversed: HashSet<&str> = transactions
        .iter()
        .filter(|tx| tx.kind == CashTransactionType::SaleCancellation)
        .filter_map(|tx| tx.reference.as_deref())
        .filter_map(|reference| reference.strip_prefix(crate::CANCEL_REFERENCE_PREFIX))
        .collect();

    let total_cash_sales: Money = legs
        .iter()
        .filter(|leg| {
            leg.sale_status != SaleStatus::Cancelled || reversed.contains(leg.sale_id.as_str())
        })
        .map(|leg| leg.amount)
        .sum();

    let mut total_cancellations = Money::zero();
    let mut total_income = Money::zero();
    let mut total_expenses = Money::zero();
    let mut total_withdrawals = Money::zero();
    let mut ledger_delta = Money::zero();

    for tx in transactions {
        match tx.kind {
            CashTransactionType::Sale => continue,
            CashTransactionType::SaleCancellation => total_cancellations += tx.amount.abs(),
            CashTransactionType::Income => total_income += tx.amount,
            CashTransactionType::Expense => total_expenses += tx.amount.abs(),
            CashTransactionType::Withdrawal => total_withdrawals += tx.amount.abs(),
        }
        ledger_delta += tx.amount;
    }

    CashRegisterSummary {
        cash_register_id: register.id.clone(),
        status: register.status,
        opening_amount: register.opening_amount,
        total_cash_sales,
        total_cancellations,
        total_income,
        total_expenses,
        total_withdrawals,
        expected_balance: register.opening_amount + total_cash_sales + ledger_delta,
    }
}
