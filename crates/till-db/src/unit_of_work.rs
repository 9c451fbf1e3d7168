//! One SQLite transaction that hands out tenant-scoped repositories.
//!
//! ```rust,ignore
//! let mut uow = db.begin().await?;
//! uow.sales().mark_cancelled(..).await?;
//! uow.stock().adjust(..).await?;
//! uow.commit().await?; // an early `?` drops `uow` and rolls back
//! ```

use sqlx::{Sqlite, Transaction};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::cash_register::CashRegisterRepository;
use crate::repository::catalog::CatalogRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::stock::StockRepository;

/// An open transaction. Repositories borrow it mutably, one at a time.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        UnitOfWork { tx }
    }

    pub fn catalog(&mut self) -> CatalogRepository<'_> {
        CatalogRepository::new(&mut self.tx)
    }

    pub fn stock(&mut self) -> StockRepository<'_> {
        StockRepository::new(&mut self.tx)
    }

    pub fn sales(&mut self) -> SaleRepository<'_> {
        SaleRepository::new(&mut self.tx)
    }

    pub fn registers(&mut self) -> CashRegisterRepository<'_> {
        CashRegisterRepository::new(&mut self.tx)
    }

    /// Makes every write of this unit visible at once.
    pub async fn commit(self) -> DbResult<()> {
        self.tx.commit().await?;
        debug!("Unit of work committed");
        Ok(())
    }

    /// Discards every write of this unit. Same as dropping it, but awaits
    /// the rollback.
    pub async fn rollback(self) -> DbResult<()> {
        self.tx.rollback().await?;
        debug!("Unit of work rolled back");
        Ok(())
    }
}
