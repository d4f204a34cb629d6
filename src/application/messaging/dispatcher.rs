//! Deferred dispatcher - Sends processor messages once the caller's transaction commits

use std::sync::Arc;
use serde::Serialize;
use crate::domain::entities::{DispatchMessage, EntityType, ProcessorCommand};
use crate::domain::traits::{Destination, MessageBus, TransactionContext};
use crate::application::errors::DispatchError;
use crate::infrastructure::config::{DispatcherConfig, NoTransactionPolicy};

/// Builds processor messages and defers their delivery to transaction commit.
///
/// The dispatcher keeps no per-call state: every call captures its own
/// message in a commit callback, so one instance can serve any number of
/// concurrent transactions.
#[derive(Clone)]
pub struct DeferredDispatcher {
    bus: Arc<dyn MessageBus>,
    transactions: Arc<dyn TransactionContext>,
    destination: Destination,
    no_transaction: NoTransactionPolicy,
}

impl DeferredDispatcher {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        transactions: Arc<dyn TransactionContext>,
        config: &DispatcherConfig,
    ) -> Self {
        Self {
            bus,
            transactions,
            destination: Destination::new(config.destination.clone()),
            no_transaction: config.no_transaction,
        }
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Request processing of `model` after commit
    pub fn process<M: Serialize + ?Sized>(&self, entity_type: &str, model: &M) -> Result<(), DispatchError> {
        self.dispatch(&EntityType::new(entity_type)?, model, ProcessorCommand::Process)
    }

    /// Request clean-up of the media derived from `model` after commit
    pub fn clean_up<M: Serialize + ?Sized>(&self, entity_type: &str, model: &M) -> Result<(), DispatchError> {
        self.dispatch(&EntityType::new(entity_type)?, model, ProcessorCommand::CleanUp)
    }

    /// Build the message now, send it when the ambient transaction commits.
    ///
    /// Construction errors are returned before anything is registered.
    pub fn dispatch<M: Serialize + ?Sized>(
        &self,
        entity_type: &EntityType,
        model: &M,
        command: ProcessorCommand,
    ) -> Result<(), DispatchError> {
        let message = DispatchMessage::new(entity_type.clone(), model, command)?;

        if !self.transactions.is_active() {
            return self.dispatch_without_transaction(message);
        }

        let message_id = message.id();
        let bus = Arc::clone(&self.bus);
        let destination = self.destination.clone();

        self.transactions.register_commit_callback(Box::new(move || {
            let id = message.id();
            if let Err(e) = bus.send(&destination, message) {
                tracing::error!("[{}] Failed to send to {}: {}", id, destination, e);
            }
        }))?;

        tracing::debug!("[{}] {} {} deferred until commit", message_id, command, entity_type);
        Ok(())
    }

    fn dispatch_without_transaction(&self, message: DispatchMessage) -> Result<(), DispatchError> {
        match self.no_transaction {
            NoTransactionPolicy::Reject => {
                tracing::warn!(
                    "[{}] {} {} rejected: no active transaction",
                    message.id(),
                    message.command(),
                    message.entity_type()
                );
                Err(DispatchError::NoActiveTransaction)
            }
            NoTransactionPolicy::Immediate => {
                tracing::debug!("[{}] No active transaction, sending immediately", message.id());
                self.bus.send(&self.destination, message)?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use crate::application::errors::{BusError, ConstructionError};
    use crate::infrastructure::transaction::TransactionManager;

    #[derive(Debug, thiserror::Error)]
    enum WorkError {
        #[error("{0}")]
        Dispatch(#[from] DispatchError),

        #[error("Unit of work aborted")]
        Aborted,
    }

    impl From<crate::application::errors::TransactionError> for WorkError {
        fn from(e: crate::application::errors::TransactionError) -> Self {
            WorkError::Dispatch(e.into())
        }
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("no stable reference"))
        }
    }

    /// Bus that records every send
    #[derive(Default)]
    struct RecordingBus {
        sent: Mutex<Vec<(Destination, DispatchMessage)>>,
    }

    impl RecordingBus {
        fn commands(&self) -> Vec<ProcessorCommand> {
            self.sent.lock().unwrap().iter().map(|(_, m)| m.command()).collect()
        }
    }

    impl MessageBus for RecordingBus {
        fn send(&self, destination: &Destination, message: DispatchMessage) -> Result<(), BusError> {
            self.sent.lock().unwrap().push((destination.clone(), message));
            Ok(())
        }
    }

    fn setup(policy: NoTransactionPolicy) -> (Arc<RecordingBus>, TransactionManager, DeferredDispatcher) {
        let bus = Arc::new(RecordingBus::default());
        let manager = TransactionManager::new();
        let config = DispatcherConfig {
            no_transaction: policy,
            ..DispatcherConfig::default()
        };
        let dispatcher = DeferredDispatcher::new(bus.clone(), Arc::new(manager.clone()), &config);
        (bus, manager, dispatcher)
    }

    #[test]
    fn test_nothing_is_sent_before_commit() {
        let (bus, manager, dispatcher) = setup(NoTransactionPolicy::Reject);

        let result = manager.execute_blocking(|| -> Result<(), DispatchError> {
            dispatcher.process("media.Image", &serde_json::json!({"id": 3}))?;
            assert!(bus.sent.lock().unwrap().is_empty());
            Ok(())
        });

        assert!(result.is_ok());
        let sent = bus.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, *dispatcher.destination());
        assert_eq!(sent[0].1.entity_type().name(), "media.Image");
        assert_eq!(sent[0].1.model()["id"], 3);
        assert_eq!(sent[0].1.command(), ProcessorCommand::Process);
    }

    #[test]
    fn test_rollback_sends_nothing() {
        let (bus, manager, dispatcher) = setup(NoTransactionPolicy::Reject);

        let result = manager.execute_blocking(|| -> Result<(), WorkError> {
            dispatcher.clean_up("media.Image", &1)?;
            Err(WorkError::Aborted)
        });

        assert!(matches!(result, Err(WorkError::Aborted)));
        assert!(bus.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_entity_type_registers_nothing() {
        let (bus, manager, dispatcher) = setup(NoTransactionPolicy::Reject);

        let result = manager.execute_blocking(|| -> Result<(), DispatchError> {
            let err = dispatcher.process("", &1).unwrap_err();
            assert!(matches!(
                err,
                DispatchError::Construction(ConstructionError::InvalidEntityType(_))
            ));
            assert_eq!(TransactionManager::current().map(|t| t.pending_callbacks()), Some(0));
            Ok(())
        });

        assert!(result.is_ok());
        assert!(bus.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unserializable_model_registers_nothing() {
        let (bus, manager, dispatcher) = setup(NoTransactionPolicy::Reject);

        let result = manager.execute_blocking(|| -> Result<(), DispatchError> {
            let err = dispatcher.clean_up("media.Image", &Unserializable).unwrap_err();
            assert!(matches!(
                err,
                DispatchError::Construction(ConstructionError::Serialization(_))
            ));
            assert_eq!(TransactionManager::current().map(|t| t.pending_callbacks()), Some(0));
            Ok(())
        });

        assert!(result.is_ok());
        assert!(bus.sent.lock().unwrap().is_empty());
        assert_eq!(manager.stats().callbacks_fired, 0);
    }

    #[test]
    fn test_reject_policy_outside_transaction() {
        let (bus, _manager, dispatcher) = setup(NoTransactionPolicy::Reject);

        let result = dispatcher.process("media.Image", &1);

        assert!(matches!(result, Err(DispatchError::NoActiveTransaction)));
        assert!(bus.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_immediate_policy_outside_transaction() {
        let (bus, _manager, dispatcher) = setup(NoTransactionPolicy::Immediate);

        dispatcher.clean_up("media.Image", &1).unwrap();

        assert_eq!(bus.commands(), vec![ProcessorCommand::CleanUp]);
    }

    #[test]
    fn test_messages_fire_in_registration_order() {
        let (bus, manager, dispatcher) = setup(NoTransactionPolicy::Reject);

        manager
            .execute_blocking(|| -> Result<(), DispatchError> {
                dispatcher.process("media.Image", &1)?;
                dispatcher.clean_up("media.Image", &1)?;
                Ok(())
            })
            .unwrap();

        assert_eq!(bus.commands(), vec![ProcessorCommand::Process, ProcessorCommand::CleanUp]);
    }
}
