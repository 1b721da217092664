//! Explicit transaction scope for lifecycle mutations.
//!
//! # Responsibility
//! - Open one `BEGIN IMMEDIATE` transaction per mutating operation.
//! - Hand out repositories bound to that transaction.
//!
//! # Invariants
//! - The write lock is held from `begin` until `commit`/`rollback`/drop, so
//!   precondition reads and writes see the same committed state.
//! - Dropping an uncommitted unit of work rolls it back; early `?` returns
//!   never leave partial writes behind.

use super::DbResult;
use crate::repo::activity_repo::SqliteActivityLogRepository;
use crate::repo::history_repo::SqliteHistoryRepository;
use crate::repo::student_repo::SqliteStudentRepository;
use log::debug;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Instant;

/// One atomic scope spanning student, history and activity writes.
pub struct UnitOfWork<'conn> {
    tx: Transaction<'conn>,
    operation: &'static str,
    started_at: Instant,
}

impl<'conn> UnitOfWork<'conn> {
    /// Begins an immediate (write-locking) transaction on `conn`.
    pub fn begin(conn: &'conn mut Connection, operation: &'static str) -> DbResult<Self> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        debug!("event=uow_begin module=db status=ok operation={operation}");
        Ok(Self {
            tx,
            operation,
            started_at: Instant::now(),
        })
    }

    pub fn students(&self) -> SqliteStudentRepository<'_> {
        SqliteStudentRepository::new(&self.tx)
    }

    pub fn history(&self) -> SqliteHistoryRepository<'_> {
        SqliteHistoryRepository::new(&self.tx)
    }

    pub fn activity(&self) -> SqliteActivityLogRepository<'_> {
        SqliteActivityLogRepository::new(&self.tx)
    }

    /// Commits every write made through this unit of work.
    pub fn commit(self) -> DbResult<()> {
        let operation = self.operation;
        let started_at = self.started_at;
        self.tx.commit()?;
        debug!(
            "event=uow_commit module=db status=ok operation={operation} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Discards every write made through this unit of work.
    pub fn rollback(self) -> DbResult<()> {
        let operation = self.operation;
        self.tx.rollback()?;
        debug!("event=uow_rollback module=db status=ok operation={operation}");
        Ok(())
    }
}
