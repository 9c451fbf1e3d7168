//! Read-only consistency checks over a tenant's sales.

use tracing::{info, warn};

use till_core::{IntegrityReport, Money, SaleMismatch, SaleStatus};
use till_db::SaleTotals;

use crate::error::EngineResult;
use crate::{scope, Engine};

impl Engine {
    /// Lists sales whose payments do not add up to the total, and sales whose
    /// lines do not add up to the subtotal, beyond the configured tolerance.
    /// Pending sales are not expected to be paid yet and only get the
    /// subtotal check. Never mutates anything.
    pub async fn check_integrity(&self, tenant_id: &str) -> EngineResult<IntegrityReport> {
        let scope = scope(tenant_id)?;
        let mut uow = self.db.begin().await?;
        let totals = uow.sales().totals(&scope).await?;
        uow.commit().await?;

        let report = build_report(&totals, self.config.money_tolerance());
        if report.is_clean() {
            info!(tenant_id = %scope, sales = totals.len(), "Integrity check clean");
        } else {
            warn!(
                tenant_id = %scope,
                payment_mismatches = report.payment_mismatches.len(),
                subtotal_mismatches = report.subtotal_mismatches.len(),
                "Integrity check found mismatches"
            );
        }
        Ok(report)
    }
}

fn build_report(totals: &[SaleTotals], tolerance: Money) -> IntegrityReport {
    let mut report = IntegrityReport::default();
    for row in totals {
        let awaits_payment = row.status == SaleStatus::Pending;
        if !awaits_payment && !row.total.within(row.payments_total, tolerance) {
            report.payment_mismatches.push(SaleMismatch {
                sale_id: row.sale_id.clone(),
                expected: row.total,
                actual: row.payments_total,
            });
        }
        if !row.subtotal.within(row.items_total, tolerance) {
            report.subtotal_mismatches.push(SaleMismatch {
                sale_id: row.sale_id.clone(),
                expected: row.subtotal,
                actual: row.items_total,
            });
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(sale_id: &str, subtotal: i64, total: i64, items: i64, payments: i64) -> SaleTotals {
        SaleTotals {
            sale_id: sale_id.to_string(),
            status: SaleStatus::Completed,
            subtotal: Money::from_cents(subtotal),
            total: Money::from_cents(total),
            items_total: Money::from_cents(items),
            payments_total: Money::from_cents(payments),
        }
    }

    #[test]
    fn test_tolerance_is_inclusive() {
        let rows = vec![
            totals("S1", 1000, 1000, 1000, 1000),
            totals("S2", 1000, 1000, 1001, 999),
            totals("S3", 1000, 1000, 1000, 998),
            totals("S4", 1000, 1160, 990, 1160),
        ];

        let report = build_report(&rows, Money::from_cents(1));
        assert_eq!(report.payment_mismatches.len(), 1);
        assert_eq!(report.payment_mismatches[0].sale_id, "S3");
        assert_eq!(report.payment_mismatches[0].actual, Money::from_cents(998));
        assert_eq!(report.subtotal_mismatches.len(), 1);
        assert_eq!(report.subtotal_mismatches[0].sale_id, "S4");

        assert!(build_report(&rows[..2], Money::from_cents(1)).is_clean());
        assert!(!build_report(&rows[..2], Money::zero()).is_clean());
    }

    #[test]
    fn test_pending_sale_is_not_a_payment_mismatch() {
        let mut pending = totals("S1", 1000, 1000, 1000, 0);
        pending.status = SaleStatus::Pending;
        assert!(build_report(&[pending.clone()], Money::zero()).is_clean());

        pending.items_total = Money::from_cents(900);
        let report = build_report(&[pending], Money::zero());
        assert!(report.payment_mismatches.is_empty());
        assert_eq!(report.subtotal_mismatches.len(), 1);

        let unpaid = totals("S2", 1000, 1000, 1000, 0);
        assert_eq!(build_report(&[unpaid], Money::zero()).payment_mismatches.len(), 1);
    }
}
