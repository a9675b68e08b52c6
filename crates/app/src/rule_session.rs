//! In-process rule session: a small forward-chaining evaluator over the
//! latest fact of every sensor.
//!
//! Rules are evaluated in load order. A rule fires once per distinct set of
//! matching facts: it does not fire again until one of the facts it matched
//! is replaced, or until it stops matching and matches again.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use homectl_domain::event::Event;
use homectl_domain::rule::{Condition, RuleBase};

use crate::ports::{FactHandle, Firing, RuleSession};

/// [`RuleSession`] kept entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryRuleSession {
    rules: RuleBase,
    facts: BTreeMap<FactHandle, Arc<Event>>,
    next_handle: u64,
    globals: HashMap<String, String>,
    activations: HashMap<usize, Vec<FactHandle>>,
}

impl InMemoryRuleSession {
    #[must_use]
    pub fn new(rules: RuleBase) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    /// Most recent fact produced by the named sensor.
    fn fact_for(&self, sensor: &str) -> Option<(FactHandle, &Arc<Event>)> {
        self.facts
            .iter()
            .rev()
            .find(|(_, fact)| fact.source_name() == sensor)
            .map(|(handle, fact)| (*handle, fact))
    }

    fn evaluate(&self, condition: &Condition) -> Option<FactHandle> {
        let (handle, fact) = self.fact_for(&condition.sensor)?;
        let operand = condition.value.resolve(&self.globals)?;
        condition
            .matches(&fact.serialize(), &operand)
            .then_some(handle)
    }
}

impl RuleSession for InMemoryRuleSession {
    fn insert(&mut self, fact: Arc<Event>) -> FactHandle {
        let handle = FactHandle::new(self.next_handle);
        self.next_handle += 1;
        self.facts.insert(handle, fact);
        handle
    }

    fn retract(&mut self, handle: FactHandle) -> bool {
        self.facts.remove(&handle).is_some()
    }

    fn contains(&self, fact: &Arc<Event>) -> bool {
        self.facts.values().any(|live| Arc::ptr_eq(live, fact))
    }

    fn fire_all_rules(&mut self) -> Vec<Firing> {
        let mut firings = Vec::new();
        for (index, rule) in self.rules.rules().iter().enumerate() {
            let matched: Option<Vec<FactHandle>> =
                rule.when.iter().map(|c| self.evaluate(c)).collect();
            let Some(mut matched) = matched else {
                self.activations.remove(&index);
                continue;
            };
            matched.sort_unstable();
            matched.dedup();
            if self.activations.get(&index) == Some(&matched) {
                continue;
            }
            self.activations.insert(index, matched);
            firings.push(Firing {
                rule: rule.name.clone(),
                actions: rule.then.clone(),
            });
        }
        firings
    }

    fn set_global(&mut self, name: &str, value: String) {
        self.globals.insert(name.to_string(), value);
    }

    fn fact_count(&self) -> usize {
        self.facts.len()
    }
}
