//! Application services - Processor lookup over the deferred dispatcher

pub mod processor_service;

pub use processor_service::{DeferredProcessor, ProcessorLocator};
