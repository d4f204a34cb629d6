//! Deferred media processor dispatch.
//!
//! Media processing requests are turned into messages that reach the processor
//! destination only after the transaction that produced them commits.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::errors::{BusError, ConstructionError, DispatchError, TransactionError};
pub use application::messaging::{DeferredDispatcher, DestinationListener, HandlerRegistry, MessageHandler};
pub use application::services::{DeferredProcessor, ProcessorLocator};
pub use domain::entities::{DispatchMessage, EntityType, MediaModel, ProcessorCommand};
pub use domain::traits::{CommitCallback, Destination, MediaProcessor, MessageBus, TransactionContext};
pub use infrastructure::bus::InMemoryMessageBus;
pub use infrastructure::config::{Config, NoTransactionPolicy};
pub use infrastructure::transaction::TransactionManager;
