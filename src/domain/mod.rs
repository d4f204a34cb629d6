//! Domain layer - Core types with no infrastructure dependencies
//! 
//! This layer contains:
//! - Entities: Commands, entity types, dispatch messages, transaction ids
//! - Traits: Abstractions for collaborators (MessageBus, TransactionContext, MediaProcessor)

pub mod entities;
pub mod traits;
