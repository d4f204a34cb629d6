//! Domain entities - Core objects exchanged between dispatcher, transactions and bus

pub mod command;
pub mod entity_type;
pub mod message;
pub mod transaction;

pub use command::ProcessorCommand;
pub use entity_type::{EntityType, MediaModel};
pub use message::DispatchMessage;
pub use transaction::{TransactionId, TransactionState};
