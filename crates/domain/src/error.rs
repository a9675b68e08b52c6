//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`HomectlError`] via `#[from]` or an explicit `into_domain()`.

use std::error::Error;

use crate::id::SensorId;

/// Top-level error shared by the domain, the application services and the
/// adapters.
#[derive(Debug, thiserror::Error)]
pub enum HomectlError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("deployment error")]
    Deployment(#[from] DeploymentError),

    #[error("storage error")]
    Storage(#[source] Box<dyn Error + Send + Sync>),

    #[error("command error")]
    Command(#[source] Box<dyn Error + Send + Sync>),
}

/// A domain invariant was violated while building a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("rule {rule:?} has no condition")]
    NoConditions { rule: String },

    #[error("rule {rule:?} has no action")]
    NoActions { rule: String },

    #[error("rule {rule:?} compares sensor {sensor:?} against non numeric value {value:?}")]
    NonNumericOperand {
        rule: String,
        sensor: String,
        value: String,
    },

    #[error("rule {rule:?} executes unknown command {command:?}")]
    UnknownCommand { rule: String, command: String },

    #[error("duplicate rule name {0:?}")]
    DuplicateRule(String),

    #[error("state sensor must declare at least one state")]
    NoStates,
}

/// A lookup by identity did not match anything.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// The controller model could not be assembled into a runnable generation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeploymentError {
    #[error("sensor id {0} is declared more than once")]
    DuplicateSensor(SensorId),

    #[error("command name {0:?} is declared more than once")]
    DuplicateCommand(String),

    #[error("sensor {sensor} references unknown command {command:?}")]
    UnknownCommand { sensor: SensorId, command: String },

    #[error("command {command:?} cannot produce values for sensor {sensor}")]
    NotAProducer { sensor: SensorId, command: String },

    #[error("unreadable rules directory {path} ({kind})")]
    RulesDirectory {
        path: String,
        kind: std::io::ErrorKind,
    },

    #[error("invalid sensor {sensor}")]
    InvalidSensor {
        sensor: SensorId,
        #[source]
        source: ValidationError,
    },
}
