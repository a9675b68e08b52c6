//! # homectl-app
//!
//! Application layer: the event runtime and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `ExecutableCommand`, `StatusCommand`, `EventListener`: device commands
//!   - `RuleSession`: fact store of a rule engine
//!   - `SampleStore`: time-series persistence
//!   - `ModelBuilder`: builds a deployment generation
//! - Run the **event pipeline**: sensors turn raw values into events, events go
//!   through the processor chain (rule engine, data logger) and land in the
//!   status cache
//! - Own the **lifecycle** of a deployment generation (`Controller`)
//! - Provide **in-process infrastructure** (change feed, polling workers, an
//!   in-memory rule session) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `homectl-domain` only (plus `tokio` for tasks and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod commands;
pub mod controller;
pub mod data_logger;
pub mod event_bus;
pub mod polling;
pub mod ports;
pub mod processor;
pub mod rule_engine;
pub mod rule_session;
pub mod sensor;
pub mod status_cache;
