//! Application layer errors

use thiserror::Error;
use crate::domain::entities::TransactionId;

/// Errors returned synchronously by the deferred dispatcher
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Construction error: {0}")]
    Construction(#[from] ConstructionError),

    #[error("No active transaction")]
    NoActiveTransaction,

    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}

/// Message construction errors, raised before anything is registered
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("Invalid entity type: {0:?}")]
    InvalidEntityType(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ConstructionError {
    fn from(e: serde_json::Error) -> Self {
        ConstructionError::Serialization(e.to_string())
    }
}

/// Transaction context errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Transaction {0} is not active")]
    NotActive(TransactionId),

    #[error("No active transaction")]
    NoActiveTransaction,

    #[error("Lock poisoned")]
    Poisoned,
}

/// Message bus errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("Destination not found: {0}")]
    DestinationNotFound(String),

    #[error("Lock poisoned")]
    Poisoned,
}

/// Errors raised by handlers on the consuming side of a destination
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Processing failed: {0}")]
    Failed(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
