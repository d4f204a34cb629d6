//! In-process transaction manager with commit callbacks
//!
//! The ambient transaction is task-local: every unit of work started through
//! [`TransactionManager::execute`] or [`TransactionManager::execute_blocking`]
//! sees its own transaction, and concurrent units never share callbacks.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::handle::Transaction;
use crate::domain::entities::TransactionState;
use crate::domain::traits::{CommitCallback, TransactionContext};
use crate::application::errors::TransactionError;

tokio::task_local! {
    static CURRENT: Arc<Transaction>;
}

#[derive(Debug, Default)]
struct Counters {
    committed: AtomicU64,
    rolled_back: AtomicU64,
    callbacks_fired: AtomicU64,
    callbacks_failed: AtomicU64,
}

/// Point-in-time copy of the manager counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionStats {
    pub committed: u64,
    pub rolled_back: u64,
    pub callbacks_fired: u64,
    pub callbacks_failed: u64,
}

/// Transaction manager
#[derive(Debug, Clone, Default)]
pub struct TransactionManager {
    counters: Arc<Counters>,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a transaction without making it ambient
    pub fn begin(&self) -> Arc<Transaction> {
        let txn = Arc::new(Transaction::new());
        tracing::trace!("[{}] Begin", txn.id());
        txn
    }

    /// The ambient transaction of the current task, if any
    pub fn current() -> Option<Arc<Transaction>> {
        CURRENT.try_with(Arc::clone).ok()
    }

    /// Run `work` with `txn` as the ambient transaction
    pub async fn scope<F: Future>(txn: Arc<Transaction>, work: F) -> F::Output {
        CURRENT.scope(txn, work).await
    }

    /// Synchronous counterpart of [`TransactionManager::scope`]
    pub fn sync_scope<R>(txn: Arc<Transaction>, work: impl FnOnce() -> R) -> R {
        CURRENT.sync_scope(txn, work)
    }

    /// Commit `txn` and run its callbacks in registration order.
    ///
    /// A panicking callback is logged and the remaining callbacks still run.
    pub fn commit(&self, txn: &Transaction) -> Result<(), TransactionError> {
        let callbacks = txn.finish(TransactionState::Committed)?;
        self.counters.committed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("[{}] Committed, firing {} callbacks", txn.id(), callbacks.len());

        for callback in callbacks {
            match panic::catch_unwind(AssertUnwindSafe(callback)) {
                Ok(()) => {
                    self.counters.callbacks_fired.fetch_add(1, Ordering::Relaxed);
                }
                Err(_) => {
                    self.counters.callbacks_failed.fetch_add(1, Ordering::Relaxed);
                    tracing::error!("[{}] Commit callback panicked", txn.id());
                }
            }
        }
        Ok(())
    }

    /// Roll back `txn`, discarding its callbacks
    pub fn rollback(&self, txn: &Transaction) -> Result<(), TransactionError> {
        let discarded = txn.finish(TransactionState::RolledBack)?.len();
        self.counters.rolled_back.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("[{}] Rolled back, discarded {} callbacks", txn.id(), discarded);
        Ok(())
    }

    /// Run `work` in a transaction: `Ok` commits, `Err` rolls back.
    ///
    /// If the task already has an active ambient transaction, `work` joins it
    /// and the outer unit decides the outcome. A panic or a dropped future
    /// rolls the transaction back.
    pub async fn execute<F, T, E>(&self, work: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<TransactionError>,
    {
        if Self::ambient_is_active() {
            return work.await;
        }

        let guard = RollbackGuard::new(self, self.begin());
        let result = Self::scope(Arc::clone(&guard.txn), work).await;
        self.complete(&guard.txn, result)
    }

    /// Synchronous counterpart of [`TransactionManager::execute`]
    pub fn execute_blocking<F, T, E>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<TransactionError>,
    {
        if Self::ambient_is_active() {
            return work();
        }

        let guard = RollbackGuard::new(self, self.begin());
        let result = Self::sync_scope(Arc::clone(&guard.txn), work);
        self.complete(&guard.txn, result)
    }

    /// A finished transaction left in scope is never joined
    fn ambient_is_active() -> bool {
        Self::current().map_or(false, |txn| txn.is_active())
    }

    fn complete<T, E>(&self, txn: &Transaction, result: Result<T, E>) -> Result<T, E>
    where
        E: From<TransactionError>,
    {
        match result {
            Ok(value) => {
                self.commit(txn)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.rollback(txn) {
                    tracing::warn!("[{}] Rollback failed: {}", txn.id(), rollback_err);
                }
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> TransactionStats {
        TransactionStats {
            committed: self.counters.committed.load(Ordering::Relaxed),
            rolled_back: self.counters.rolled_back.load(Ordering::Relaxed),
            callbacks_fired: self.counters.callbacks_fired.load(Ordering::Relaxed),
            callbacks_failed: self.counters.callbacks_failed.load(Ordering::Relaxed),
        }
    }
}

/// Rolls back a transaction that is still active when the unit of work
/// unwinds or is dropped before completing
struct RollbackGuard<'a> {
    manager: &'a TransactionManager,
    txn: Arc<Transaction>,
}

impl<'a> RollbackGuard<'a> {
    fn new(manager: &'a TransactionManager, txn: Arc<Transaction>) -> Self {
        Self { manager, txn }
    }
}

impl Drop for RollbackGuard<'_> {
    fn drop(&mut self) {
        if !self.txn.is_active() {
            return;
        }
        tracing::warn!("[{}] Unit of work did not complete, rolling back", self.txn.id());
        if let Err(e) = self.manager.rollback(&self.txn) {
            tracing::warn!("[{}] Rollback failed: {}", self.txn.id(), e);
        }
    }
}

impl TransactionContext for TransactionManager {
    fn is_active(&self) -> bool {
        Self::ambient_is_active()
    }

    fn register_commit_callback(&self, callback: CommitCallback) -> Result<(), TransactionError> {
        let txn = Self::current().ok_or(TransactionError::NoActiveTransaction)?;
        txn.register(callback)
    }
}
