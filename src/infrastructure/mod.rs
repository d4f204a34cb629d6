//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Transaction: In-process transaction context with commit callbacks
//! - Bus: In-process message bus with named destinations

pub mod bus;
pub mod config;
pub mod transaction;
