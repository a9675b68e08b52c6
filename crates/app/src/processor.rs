//! Event processors: ordered handlers every accepted event goes through
//! before it reaches the status cache.

mod chain;
mod context;

pub use chain::EventProcessorChain;
pub use context::{EventContext, LifeCycleContext};

use async_trait::async_trait;
use homectl_domain::error::HomectlError;

/// A pluggable handler in the [`EventProcessorChain`].
///
/// `push` runs inline on the task that produced the event, so processors
/// should not hold it longer than needed.
#[async_trait]
pub trait EventProcessor: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Called when a deployment generation starts.
    ///
    /// # Errors
    ///
    /// A start failure is logged; the processor stays in the chain.
    async fn start(&self, _ctx: &LifeCycleContext) -> Result<(), HomectlError> {
        Ok(())
    }

    /// Handle one event.
    ///
    /// # Errors
    ///
    /// Errors are logged by the chain and never reach the producer.
    async fn push(&self, ctx: &mut EventContext) -> Result<(), HomectlError>;

    /// Called when the generation stops.
    ///
    /// # Errors
    ///
    /// A stop failure is logged; the remaining processors still stop.
    async fn stop(&self) -> Result<(), HomectlError> {
        Ok(())
    }
}
