//! # homectld
//!
//! Composition root that wires the adapters, processors and storage
//! together.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Build the processor chain (rule engine, data logger) over the sample store
//! - Turn the `[[commands]]`/`[[sensors]]` sections into deployment generations
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

pub mod config;
pub mod deployment;

use std::sync::Arc;

use homectl_app::data_logger::DataLogger;
use homectl_app::ports::SampleStore;
use homectl_app::processor::EventProcessorChain;
use homectl_app::rule_engine::RuleEngine;

use crate::config::Config;

/// Rule engine first, then the data logger writing to `store`.
#[must_use]
pub fn processor_chain<S>(config: &Config, store: S) -> EventProcessorChain
where
    S: SampleStore + 'static,
{
    let rules = RuleEngine::new(&config.rules.dir).with_globals(config.rules.globals.clone());
    let logger = DataLogger::new(store, config.data_logger.sources.iter().cloned());
    EventProcessorChain::default()
        .with(Arc::new(rules))
        .with(Arc::new(logger))
}
