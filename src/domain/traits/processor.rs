use crate::application::errors::DispatchError;

/// Media processor for one model type.
///
/// Implementations decide when the work happens; the deferred implementation
/// only queues it until the current transaction commits.
pub trait MediaProcessor<M>: Send + Sync {
    /// Generate the media derived from `model`
    fn process(&self, model: &M) -> Result<(), DispatchError>;

    /// Remove the media derived from `model`
    fn clean_up(&self, model: &M) -> Result<(), DispatchError>;
}
