//! Unit of work - One database transaction spanning every write of a use case.
//!
//! The stores handed out by [`UnitOfWork`] all run on the same transaction, so the
//! stock ledger, history journal, audit trail and order aggregate commit together
//! or not at all. Dropping a `UnitOfWork` without committing rolls it back, which
//! is what makes an early `?` return safe.

use crate::{
    core::{
        audit::{self, AuditEntry, AuditPolicy},
        history::HistoryJournal,
        ledger::StockLedger,
        order_store::OrderStore,
    },
    entities::audit_log,
    errors::Result,
};
use sea_orm::{DatabaseTransaction, TransactionTrait};
use tracing::{error, trace};

/// An open transaction plus the audit policy it writes under.
#[derive(Debug)]
pub struct UnitOfWork {
    txn: DatabaseTransaction,
    audit_policy: AuditPolicy,
}

impl UnitOfWork {
    /// Opens a transaction on `db`.
    pub async fn begin<C>(db: &C, audit_policy: AuditPolicy) -> Result<Self>
    where
        C: TransactionTrait,
    {
        let txn = db.begin().await?;
        trace!("UnitOfWork: begin");
        Ok(Self { txn, audit_policy })
    }

    /// Product stock, read and written inside this unit of work.
    #[must_use]
    pub const fn products(&self) -> StockLedger<'_, DatabaseTransaction> {
        StockLedger::new(&self.txn)
    }

    /// Orders and their lines.
    #[must_use]
    pub const fn orders(&self) -> OrderStore<'_, DatabaseTransaction> {
        OrderStore::new(&self.txn)
    }

    /// Product history journal.
    #[must_use]
    pub const fn history(&self) -> HistoryJournal<'_, DatabaseTransaction> {
        HistoryJournal::new(&self.txn)
    }

    /// Audit trail.
    #[must_use]
    pub const fn audit(&self) -> AuditScope<'_> {
        AuditScope {
            txn: &self.txn,
            policy: self.audit_policy,
        }
    }

    /// The underlying transaction, for writes no store covers.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Commits every write made through this unit of work.
    pub async fn commit(self) -> Result<()> {
        self.txn.commit().await?;
        trace!("UnitOfWork: commit");
        Ok(())
    }

    /// Discards every write made through this unit of work.
    pub async fn rollback(self) -> Result<()> {
        self.txn.rollback().await?;
        trace!("UnitOfWork: rollback");
        Ok(())
    }

    /// Commits when `outcome` is `Ok`, rolls back when it is `Err`.
    ///
    /// A failed rollback is logged; the caller still sees the original error.
    pub async fn finish<T>(self, outcome: Result<T>) -> Result<T> {
        match outcome {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback().await {
                    error!(error = %rollback_err, cause = %err, "UnitOfWork: rollback failed");
                }
                Err(err)
            }
        }
    }
}

/// Audit writer bound to a unit of work.
#[derive(Debug, Clone, Copy)]
pub struct AuditScope<'a> {
    txn: &'a DatabaseTransaction,
    policy: AuditPolicy,
}

impl AuditScope<'_> {
    /// Records `entry` atomically with the rest of the unit of work.
    pub async fn record(&self, entry: AuditEntry) -> Result<Option<audit_log::Model>> {
        audit::audit_in_transaction(self.txn, self.policy, entry).await
    }
}
