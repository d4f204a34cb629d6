//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Errors: Dispatch, transaction, bus and config errors
//! - Messaging: Deferred dispatch and destination listeners
//! - Services: Per-model deferred processors

pub mod errors;
pub mod messaging;
pub mod services;
