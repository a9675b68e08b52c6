//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the runtime and the adapter
//! layer can depend on them without creating circular dependencies.

pub mod command;
pub mod model_builder;
pub mod rule_session;
pub mod sample_store;

pub use command::{EventListener, EventProducer, ExecutableCommand, StatusCommand};
pub use model_builder::{Deployment, ModelBuilder};
pub use rule_session::{FactHandle, Firing, RuleSession};
pub use sample_store::SampleStore;
