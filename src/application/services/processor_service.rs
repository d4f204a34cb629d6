use std::marker::PhantomData;
use std::sync::Arc;
use crate::domain::entities::{EntityType, MediaModel, ProcessorCommand};
use crate::domain::traits::MediaProcessor;
use crate::application::errors::{ConstructionError, DispatchError};
use crate::application::messaging::DeferredDispatcher;

/// Hands out processors whose work is deferred to transaction commit
#[derive(Clone)]
pub struct ProcessorLocator {
    dispatcher: Arc<DeferredDispatcher>,
}

impl ProcessorLocator {
    pub fn new(dispatcher: Arc<DeferredDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Processor for models of type `M`
    pub fn locate_for<M: MediaModel>(&self) -> Result<DeferredProcessor<M>, ConstructionError> {
        Ok(DeferredProcessor {
            entity_type: EntityType::of::<M>()?,
            dispatcher: Arc::clone(&self.dispatcher),
            _model: PhantomData,
        })
    }
}

/// [`MediaProcessor`] that queues each call as a message sent after commit
pub struct DeferredProcessor<M> {
    entity_type: EntityType,
    dispatcher: Arc<DeferredDispatcher>,
    _model: PhantomData<fn(&M)>,
}

impl<M> DeferredProcessor<M> {
    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }
}

impl<M: MediaModel> MediaProcessor<M> for DeferredProcessor<M> {
    fn process(&self, model: &M) -> Result<(), DispatchError> {
        self.dispatcher.dispatch(&self.entity_type, model, ProcessorCommand::Process)
    }

    fn clean_up(&self, model: &M) -> Result<(), DispatchError> {
        self.dispatcher.dispatch(&self.entity_type, model, ProcessorCommand::CleanUp)
    }
}
