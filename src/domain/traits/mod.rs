//! Domain traits - Abstractions for the collaborators around the dispatcher

pub mod bus;
pub mod processor;
pub mod transaction;

pub use bus::{Destination, MessageBus};
pub use processor::MediaProcessor;
pub use transaction::{CommitCallback, TransactionContext};
