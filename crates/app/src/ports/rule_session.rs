//! Rule session port: an opaque fact store with insert/retract/fire.

use std::sync::Arc;

use homectl_domain::event::Event;
use homectl_domain::rule::RuleAction;

/// Handle of a fact inserted into a [`RuleSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FactHandle(u64);

impl FactHandle {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// One rule whose conditions matched during [`RuleSession::fire_all_rules`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firing {
    pub rule: String,
    pub actions: Vec<RuleAction>,
}

/// Working memory of a rule engine.
///
/// Facts are events; the session keeps them until retracted. Firing
/// evaluates the loaded rules against the current facts and returns the
/// activations, leaving their execution to the caller.
pub trait RuleSession: Send {
    /// Insert a fact and return its handle.
    fn insert(&mut self, fact: Arc<Event>) -> FactHandle;

    /// Remove a fact. Returns `false` when the handle is unknown.
    fn retract(&mut self, handle: FactHandle) -> bool;

    /// Whether this exact event instance is a live fact.
    fn contains(&self, fact: &Arc<Event>) -> bool;

    /// Evaluate all rules against the current facts.
    fn fire_all_rules(&mut self) -> Vec<Firing>;

    /// Set a named global readable by rule conditions.
    fn set_global(&mut self, name: &str, value: String);

    /// Number of live facts.
    fn fact_count(&self) -> usize;
}
