//! Tenant-scoped repositories. Each borrows the unit of work's connection
//! and every method takes a `&TenantScope`.
//!
//! - [`CatalogRepository`](catalog::CatalogRepository) - Products and composite recipes
//! - [`StockRepository`](stock::StockRepository) - Warehouse stock and its journal
//! - [`SaleRepository`](sale::SaleRepository) - Sales, items, payments
//! - [`CashRegisterRepository`](cash_register::CashRegisterRepository) - Cash sessions and ledger
//! - [`AuditRepository`](audit::AuditRepository) - Audit log (pool level)

pub mod audit;
pub mod cash_register;
pub mod catalog;
pub mod sale;
pub mod stock;
