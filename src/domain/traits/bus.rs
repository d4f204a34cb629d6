use std::fmt;
use crate::domain::entities::DispatchMessage;
use crate::application::errors::BusError;

/// Named logical channel on a message bus
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Destination(String);

impl Destination {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Destination {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Message bus - fire-and-forget delivery to named destinations
pub trait MessageBus: Send + Sync {
    /// Hand `message` to the bus. Delivery and ordering are the bus's concern.
    fn send(&self, destination: &Destination, message: DispatchMessage) -> Result<(), BusError>;
}
