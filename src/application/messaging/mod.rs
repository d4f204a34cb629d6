//! Message handling - Deferred dispatch on the producing side, routing on the consuming side

pub mod dispatcher;
pub mod listener;

pub use dispatcher::DeferredDispatcher;
pub use listener::{DestinationListener, HandlerRegistry, ListenerStats, MessageHandler};
