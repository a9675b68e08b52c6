//! Action: what a rule does when all its conditions hold.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    /// Send the named write command.
    Execute { command: String },
    /// Emit an informational log line.
    Log { message: String },
}

impl std::fmt::Display for RuleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Execute { command } => write!(f, "execute({command})"),
            Self::Log { message } => write!(f, "log({message:?})"),
        }
    }
}
