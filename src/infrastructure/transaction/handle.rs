//! A single transaction and the commit callbacks queued on it

use std::sync::Mutex;
use crate::domain::entities::{TransactionId, TransactionState};
use crate::domain::traits::CommitCallback;
use crate::application::errors::TransactionError;

struct Inner {
    state: TransactionState,
    callbacks: Vec<CommitCallback>,
}

/// Transaction handle.
///
/// State and callback list share one lock so a callback can never be queued
/// on a transaction that has already finished.
pub struct Transaction {
    id: TransactionId,
    inner: Mutex<Inner>,
}

impl Transaction {
    pub(crate) fn new() -> Self {
        Self {
            id: TransactionId::next(),
            inner: Mutex::new(Inner {
                state: TransactionState::Active,
                callbacks: Vec::new(),
            }),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn state(&self) -> Result<TransactionState, TransactionError> {
        let inner = self.inner.lock().map_err(|_| TransactionError::Poisoned)?;
        Ok(inner.state)
    }

    pub fn is_active(&self) -> bool {
        self.state().map(|s| s.is_active()).unwrap_or(false)
    }

    /// Number of callbacks waiting for commit
    pub fn pending_callbacks(&self) -> usize {
        self.inner.lock().map(|inner| inner.callbacks.len()).unwrap_or(0)
    }

    /// Queue a callback, in registration order
    pub fn register(&self, callback: CommitCallback) -> Result<(), TransactionError> {
        let mut inner = self.inner.lock().map_err(|_| TransactionError::Poisoned)?;
        if !inner.state.is_active() {
            return Err(TransactionError::NotActive(self.id));
        }
        inner.callbacks.push(callback);
        Ok(())
    }

    /// Move to `target` and hand back the queued callbacks
    pub(crate) fn finish(&self, target: TransactionState) -> Result<Vec<CommitCallback>, TransactionError> {
        let mut inner = self.inner.lock().map_err(|_| TransactionError::Poisoned)?;
        if !inner.state.is_active() {
            return Err(TransactionError::NotActive(self.id));
        }
        inner.state = target;
        Ok(std::mem::take(&mut inner.callbacks))
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if let Ok(inner) = self.inner.get_mut() {
            if inner.state.is_active() && !inner.callbacks.is_empty() {
                tracing::debug!(
                    "[{}] Dropped while active, discarding {} commit callbacks",
                    self.id,
                    inner.callbacks.len()
                );
            }
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("state", &self.state().ok())
            .field("pending_callbacks", &self.pending_callbacks())
            .finish()
    }
}
