use crate::application::errors::TransactionError;

/// Work to run once, after the owning transaction commits
pub type CommitCallback = Box<dyn FnOnce() + Send + 'static>;

/// Access to the caller's ambient transaction
pub trait TransactionContext: Send + Sync {
    /// Whether the current task runs inside an active transaction
    fn is_active(&self) -> bool;

    /// Queue `callback` to run after the ambient transaction commits.
    ///
    /// The callback is dropped without running if the transaction rolls back.
    fn register_commit_callback(&self, callback: CommitCallback) -> Result<(), TransactionError>;
}
