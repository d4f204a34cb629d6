//! Destination listener - Routes received processor messages by entity type

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::mpsc;
use crate::domain::entities::{DispatchMessage, EntityType};
use crate::domain::traits::Destination;
use crate::application::errors::HandlerError;

/// Consumer of processor messages for one entity type
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &DispatchMessage) -> Result<(), HandlerError>;
}

/// Handlers keyed by entity type name
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<EntityType, Arc<dyn MessageHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H: MessageHandler + 'static>(&mut self, entity_type: EntityType, handler: H) {
        self.handlers.insert(entity_type, Arc::new(handler));
    }

    pub fn get(&self, entity_type: &EntityType) -> Option<&Arc<dyn MessageHandler>> {
        self.handlers.get(entity_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Counts of what a listener did with the messages it received
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListenerStats {
    pub handled: u64,
    pub unhandled: u64,
    pub failed: u64,
}

/// Drains one destination and hands each message to its entity type's handler.
///
/// Unknown entity types and handler errors are logged; they never stop the loop.
pub struct DestinationListener {
    destination: Destination,
    receiver: mpsc::UnboundedReceiver<DispatchMessage>,
    handlers: HandlerRegistry,
    stats: ListenerStats,
}

impl DestinationListener {
    pub fn new(
        destination: Destination,
        receiver: mpsc::UnboundedReceiver<DispatchMessage>,
        handlers: HandlerRegistry,
    ) -> Self {
        Self {
            destination,
            receiver,
            handlers,
            stats: ListenerStats::default(),
        }
    }

    pub fn stats(&self) -> ListenerStats {
        self.stats
    }

    /// Handle messages until the bus side closes
    pub async fn run(mut self) -> ListenerStats {
        tracing::info!("Listening on {} ({} handlers)", self.destination, self.handlers.len());
        while let Some(message) = self.receiver.recv().await {
            self.handle(&message).await;
        }
        tracing::info!("Destination {} closed", self.destination);
        self.stats
    }

    /// Handle every message already queued, without waiting for more
    pub async fn drain(&mut self) -> ListenerStats {
        while let Ok(message) = self.receiver.try_recv() {
            self.handle(&message).await;
        }
        self.stats
    }

    async fn handle(&mut self, message: &DispatchMessage) {
        let Some(handler) = self.handlers.get(message.entity_type()).cloned() else {
            self.stats.unhandled += 1;
            tracing::warn!(
                "[{}] No handler for {} on {}",
                message.id(),
                message.entity_type(),
                self.destination
            );
            return;
        };

        match handler.handle(message).await {
            Ok(()) => {
                self.stats.handled += 1;
                tracing::debug!("[{}] {} {} handled", message.id(), message.command(), message.entity_type());
            }
            Err(e) => {
                self.stats.failed += 1;
                tracing::error!("[{}] Handler for {} failed: {}", message.id(), message.entity_type(), e);
            }
        }
    }
}
