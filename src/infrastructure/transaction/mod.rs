//! Reference transaction context - begin/commit/rollback with commit callbacks

pub mod handle;
pub mod manager;

pub use handle::Transaction;
pub use manager::{TransactionManager, TransactionStats};
