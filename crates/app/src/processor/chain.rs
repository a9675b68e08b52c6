use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use homectl_domain::error::HomectlError;

use super::{EventContext, EventProcessor, LifeCycleContext};

/// Ordered list of processors with fault isolation.
///
/// Errors and panics of one processor are logged and never stop the event
/// from reaching the next processor.
#[derive(Default)]
pub struct EventProcessorChain {
    processors: Vec<Arc<dyn EventProcessor>>,
}

impl EventProcessorChain {
    #[must_use]
    pub fn new(processors: Vec<Arc<dyn EventProcessor>>) -> Self {
        Self { processors }
    }

    /// Append a processor at the end of the chain.
    #[must_use]
    pub fn with(mut self, processor: Arc<dyn EventProcessor>) -> Self {
        self.processors.push(processor);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    pub async fn start(&self, ctx: &LifeCycleContext) {
        for processor in &self.processors {
            match guarded(processor.start(ctx)).await {
                Ok(()) => tracing::info!(processor = processor.name(), "processor started"),
                Err(failure) => failure.log(processor.name(), "start"),
            }
        }
    }

    /// Push an event through every processor, in order, until one
    /// terminates the context.
    pub async fn push(&self, ctx: &mut EventContext) {
        for processor in &self.processors {
            if let Err(failure) = guarded(processor.push(ctx)).await {
                failure.log(processor.name(), "push");
            }
            if ctx.is_terminated() {
                tracing::debug!(
                    processor = processor.name(),
                    event = %ctx.event(),
                    "event terminated"
                );
                return;
            }
        }
    }

    pub async fn stop(&self) {
        for processor in &self.processors {
            match guarded(processor.stop()).await {
                Ok(()) => tracing::info!(processor = processor.name(), "processor stopped"),
                Err(failure) => failure.log(processor.name(), "stop"),
            }
        }
    }
}

impl std::fmt::Debug for EventProcessorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.processors.iter().map(|p| p.name()))
            .finish()
    }
}

enum Failure {
    Error(HomectlError),
    Panic(String),
}

impl Failure {
    fn log(&self, processor: &str, stage: &'static str) {
        match self {
            Self::Error(err) => {
                tracing::error!(processor, stage, error = ?err, "processor failed");
            }
            Self::Panic(message) => {
                tracing::error!(processor, stage, panic = %message, "processor panicked");
            }
        }
    }
}

async fn guarded<F>(future: F) -> Result<(), Failure>
where
    F: Future<Output = Result<(), HomectlError>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(Failure::Error(err)),
        Err(payload) => Err(Failure::Panic(panic_message(payload.as_ref()).to_string())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
