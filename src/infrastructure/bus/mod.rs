//! In-process message bus with named destinations

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tokio::sync::mpsc;

use crate::domain::entities::DispatchMessage;
use crate::domain::traits::{Destination, MessageBus};
use crate::application::errors::BusError;

type Listener = mpsc::UnboundedSender<DispatchMessage>;

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of the bus counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusStats {
    /// Messages handed to at least one listener
    pub sent: u64,
    /// Messages sent to a destination nobody listens to
    pub dropped: u64,
    /// Sends that failed, e.g. unknown destination
    pub failed: u64,
}

/// Message bus backed by tokio channels.
///
/// Destinations must be declared before use. Every live listener of a
/// destination receives its own copy of each message.
#[derive(Debug, Default)]
pub struct InMemoryMessageBus {
    destinations: RwLock<HashMap<Destination, Vec<Listener>>>,
    counters: Counters,
}

impl InMemoryMessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_destinations<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let bus = Self::new();
        for name in names {
            bus.add_destination(Destination::new(name));
        }
        bus
    }

    /// Declare a destination. Returns false if it already existed.
    pub fn add_destination(&self, destination: Destination) -> bool {
        let Ok(mut destinations) = self.destinations.write() else {
            tracing::error!("Bus lock poisoned, cannot add destination {}", destination);
            return false;
        };
        if destinations.contains_key(&destination) {
            return false;
        }
        tracing::debug!("Destination added: {}", destination);
        destinations.insert(destination, Vec::new());
        true
    }

    pub fn has_destination(&self, destination: &Destination) -> bool {
        self.destinations
            .read()
            .map(|d| d.contains_key(destination))
            .unwrap_or(false)
    }

    /// Register a listener on `destination`
    pub fn subscribe(
        &self,
        destination: &Destination,
    ) -> Result<mpsc::UnboundedReceiver<DispatchMessage>, BusError> {
        let mut destinations = self.destinations.write().map_err(|_| BusError::Poisoned)?;
        let listeners = destinations
            .get_mut(destination)
            .ok_or_else(|| BusError::DestinationNotFound(destination.to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        listeners.push(tx);
        Ok(rx)
    }

    /// Live listeners on `destination`
    pub fn listener_count(&self, destination: &Destination) -> usize {
        self.destinations
            .read()
            .ok()
            .and_then(|d| d.get(destination).map(|l| l.iter().filter(|tx| !tx.is_closed()).count()))
            .unwrap_or(0)
    }

    pub fn stats(&self) -> BusStats {
        BusStats {
            sent: self.counters.sent.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

impl MessageBus for InMemoryMessageBus {
    fn send(&self, destination: &Destination, message: DispatchMessage) -> Result<(), BusError> {
        let mut destinations = self.destinations.write().map_err(|_| {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
            BusError::Poisoned
        })?;

        let Some(listeners) = destinations.get_mut(destination) else {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
            return Err(BusError::DestinationNotFound(destination.to_string()));
        };

        listeners.retain(|tx| !tx.is_closed());

        if listeners.is_empty() {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("No listeners for destination {}, dropping message {}", destination, message.id());
            return Ok(());
        }

        // A listener may close between retain and send; it just misses the message.
        for tx in listeners.iter() {
            let _ = tx.send(message.clone());
        }

        self.counters.sent.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("[{}] {} {} -> {}", message.id(), message.command(), message.entity_type(), destination);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{EntityType, ProcessorCommand};

    fn message(command: ProcessorCommand) -> DispatchMessage {
        let entity_type = EntityType::new("media.Image").unwrap();
        DispatchMessage::new(entity_type, &serde_json::json!({"id": 1}), command).unwrap()
    }

    #[tokio::test]
    async fn test_every_listener_gets_a_copy() {
        let destination = Destination::new("media/processor");
        let bus = InMemoryMessageBus::with_destinations([destination.name()]);
        let mut a = bus.subscribe(&destination).unwrap();
        let mut b = bus.subscribe(&destination).unwrap();

        let sent = message(ProcessorCommand::Process);
        bus.send(&destination, sent.clone()).unwrap();

        assert_eq!(a.recv().await, Some(sent.clone()));
        assert_eq!(b.recv().await, Some(sent));
        assert_eq!(bus.stats().sent, 1);
    }

    #[test]
    fn test_unknown_destination_fails() {
        let bus = InMemoryMessageBus::new();
        let destination = Destination::new("nowhere");

        assert_eq!(
            bus.send(&destination, message(ProcessorCommand::CleanUp)),
            Err(BusError::DestinationNotFound("nowhere".to_string()))
        );
        assert!(bus.subscribe(&destination).is_err());
        assert_eq!(bus.stats().failed, 1);
    }

    #[test]
    fn test_no_listeners_drops_message() {
        let destination = Destination::new("media/processor");
        let bus = InMemoryMessageBus::with_destinations([destination.name()]);
        let rx = bus.subscribe(&destination).unwrap();
        drop(rx);

        assert!(bus.send(&destination, message(ProcessorCommand::Process)).is_ok());
        assert_eq!(bus.listener_count(&destination), 0);
        assert_eq!(bus.stats(), BusStats { sent: 0, dropped: 1, failed: 0 });
    }

    #[test]
    fn test_add_destination_is_idempotent() {
        let bus = InMemoryMessageBus::new();
        assert!(bus.add_destination(Destination::new("a")));
        assert!(!bus.add_destination(Destination::new("a")));
        assert!(bus.has_destination(&Destination::new("a")));
    }
}
