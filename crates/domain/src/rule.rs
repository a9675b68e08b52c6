//! Rules: condition → action definitions evaluated against sensor facts.
//!
//! A rule file holds any number of `[[rule]]` tables. Each rule lists the
//! conditions (`when`) that must all hold over the latest sensor values and
//! the actions (`then`) to run when they do. Rule files are compiled one at a
//! time into a [`RuleBase`]; a file with any error is rejected as a whole.

mod action;
mod condition;

pub use action::RuleAction;
pub use condition::{Comparison, Condition, Operand};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A single named rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub name: String,
    #[serde(default)]
    pub when: Vec<Condition>,
    #[serde(default)]
    pub then: Vec<RuleAction>,
}

impl RuleDefinition {
    /// Check the rule against its invariants.
    ///
    /// # Errors
    ///
    /// Returns every violated invariant:
    /// - `name` is blank ([`ValidationError::EmptyName`])
    /// - `when` is empty ([`ValidationError::NoConditions`])
    /// - `then` is empty ([`ValidationError::NoActions`])
    /// - an ordering operator against a non numeric literal
    ///   ([`ValidationError::NonNumericOperand`])
    /// - an `execute` action naming a command `known_command` rejects
    ///   ([`ValidationError::UnknownCommand`])
    pub fn validate(&self, known_command: impl Fn(&str) -> bool) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(ValidationError::EmptyName);
        }
        if self.when.is_empty() {
            errors.push(ValidationError::NoConditions {
                rule: self.name.clone(),
            });
        }
        if self.then.is_empty() {
            errors.push(ValidationError::NoActions {
                rule: self.name.clone(),
            });
        }
        for condition in &self.when {
            if let Operand::Text(value) = &condition.value
                && condition.op.is_ordering()
                && value.trim().parse::<f64>().is_err()
            {
                errors.push(ValidationError::NonNumericOperand {
                    rule: self.name.clone(),
                    sensor: condition.sensor.clone(),
                    value: value.clone(),
                });
            }
        }
        for action in &self.then {
            if let RuleAction::Execute { command } = action
                && !known_command(command)
            {
                errors.push(ValidationError::UnknownCommand {
                    rule: self.name.clone(),
                    command: command.clone(),
                });
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Content of one rule file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleFile {
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleDefinition>,
}

/// Compiled, validated rules in load order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleBase {
    rules: Vec<RuleDefinition>,
}

impl RuleBase {
    /// Validate every rule of a file and collect them into a rule base.
    ///
    /// # Errors
    ///
    /// Returns all validation errors of the file, including rule names used
    /// twice within it ([`ValidationError::DuplicateRule`]).
    pub fn compile(
        file: RuleFile,
        known_command: impl Fn(&str) -> bool,
    ) -> Result<Self, Vec<ValidationError>> {
        let mut base = Self::default();
        let mut errors = Vec::new();
        for rule in file.rules {
            if let Err(mut rule_errors) = rule.validate(&known_command) {
                errors.append(&mut rule_errors);
            }
            if base.contains(&rule.name) {
                errors.push(ValidationError::DuplicateRule(rule.name.clone()));
            }
            base.rules.push(rule);
        }
        if errors.is_empty() {
            Ok(base)
        } else {
            Err(errors)
        }
    }

    /// Append all rules of `other`, keeping load order.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateRule`] when a rule name is already
    /// present; nothing is merged in that case.
    pub fn merge(&mut self, other: Self) -> Result<(), ValidationError> {
        if let Some(duplicate) = other.rules.iter().find(|rule| self.contains(&rule.name)) {
            return Err(ValidationError::DuplicateRule(duplicate.name.clone()));
        }
        self.rules.extend(other.rules);
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.rules.iter().any(|rule| rule.name == name)
    }

    #[must_use]
    pub fn rules(&self) -> &[RuleDefinition] {
        &self.rules
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEATING: &str = r#"
[[rule]]
name = "heat when cold"

[[rule.when]]
sensor = "temperature"
op = "lt"
value = 18

[[rule.when]]
sensor = "presence"
op = "eq"
value = "home"

[[rule.then]]
type = "execute"
command = "heater_on"

[[rule]]
name = "too hot"

[[rule.when]]
sensor = "temperature"
op = "gt"
value = { global = "max_temperature" }

[[rule.then]]
type = "log"
message = "temperature above limit"
"#;

    fn any_command(_: &str) -> bool {
        true
    }

    #[test]
    fn should_parse_rule_file_from_toml() {
        let file: RuleFile = toml::from_str(HEATING).unwrap();
        assert_eq!(file.rules.len(), 2);
        let first = &file.rules[0];
        assert_eq!(first.when[0].op, Comparison::Lt);
        assert_eq!(first.when[0].value, Operand::Number(18.0));
        assert_eq!(first.when[1].value, Operand::Text("home".to_string()));
        assert_eq!(
            file.rules[1].when[0].value,
            Operand::Global {
                global: "max_temperature".to_string()
            }
        );
    }

    #[test]
    fn should_compile_rules_in_load_order() {
        let file: RuleFile = toml::from_str(HEATING).unwrap();
        let base = RuleBase::compile(file, any_command).unwrap();
        let names: Vec<_> = base.rules().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["heat when cold", "too hot"]);
    }

    #[test]
    fn should_reject_file_when_command_is_unknown() {
        let file: RuleFile = toml::from_str(HEATING).unwrap();
        let errors = RuleBase::compile(file, |name| name != "heater_on").unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::UnknownCommand {
                rule: "heat when cold".to_string(),
                command: "heater_on".to_string(),
            }]
        );
    }

    #[test]
    fn should_report_every_violation_of_a_rule() {
        let rule = RuleDefinition {
            name: String::new(),
            when: vec![Condition {
                sensor: "temperature".to_string(),
                op: Comparison::Gt,
                value: Operand::Text("warm".to_string()),
            }],
            then: Vec::new(),
        };
        let errors = rule.validate(any_command).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::EmptyName));
    }

    #[test]
    fn should_reject_duplicate_names_within_a_file() {
        let rule = RuleDefinition {
            name: "same".to_string(),
            when: vec![Condition {
                sensor: "s".to_string(),
                op: Comparison::Eq,
                value: Operand::Text("on".to_string()),
            }],
            then: vec![RuleAction::Log {
                message: "m".to_string(),
            }],
        };
        let file = RuleFile {
            rules: vec![rule.clone(), rule],
        };
        let errors = RuleBase::compile(file, any_command).unwrap_err();
        assert_eq!(errors, vec![ValidationError::DuplicateRule("same".to_string())]);
    }

    #[test]
    fn should_not_merge_when_name_already_loaded() {
        let file: RuleFile = toml::from_str(HEATING).unwrap();
        let mut base = RuleBase::compile(file.clone(), any_command).unwrap();
        let again = RuleBase::compile(file, any_command).unwrap();
        assert!(base.merge(again).is_err());
        assert_eq!(base.len(), 2);
    }
}
