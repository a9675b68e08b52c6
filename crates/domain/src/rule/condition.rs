//! Condition: a comparison between a sensor fact and an operand.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Comparison operator of a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparison {
    /// Whether the operator only makes sense between numbers.
    #[must_use]
    pub fn is_ordering(self) -> bool {
        !matches!(self, Self::Eq | Self::Ne)
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
        }
    }
}

/// Right-hand side of a [`Condition`].
///
/// In rule files a bare number or string is a literal, and a table
/// `{ global = "name" }` refers to a global set on the rule session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Number(f64),
    Text(String),
    Global { global: String },
}

impl Operand {
    /// Text of the operand, looking globals up in `globals`.
    ///
    /// Returns `None` for a global that has not been set.
    #[must_use]
    pub fn resolve<'a>(&'a self, globals: &'a HashMap<String, String>) -> Option<Cow<'a, str>> {
        match self {
            Self::Number(value) => Some(Cow::Owned(value.to_string())),
            Self::Text(value) => Some(Cow::Borrowed(value)),
            Self::Global { global } => globals.get(global).map(|v| Cow::Borrowed(v.as_str())),
        }
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value:?}"),
            Self::Global { global } => write!(f, "${global}"),
        }
    }
}

/// Guard over the latest value of one sensor, referenced by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub sensor: String,
    pub op: Comparison,
    pub value: Operand,
}

impl Condition {
    /// Compare a fact value with an already resolved operand.
    ///
    /// Both sides are compared as numbers when both parse as numbers;
    /// otherwise only `eq`/`ne` apply, as plain text comparison.
    #[must_use]
    pub fn matches(&self, fact: &str, operand: &str) -> bool {
        match (fact.trim().parse::<f64>(), operand.trim().parse::<f64>()) {
            (Ok(left), Ok(right)) => self.op.accepts(left.total_cmp(&right)),
            _ => match self.op {
                Comparison::Eq => fact == operand,
                Comparison::Ne => fact != operand,
                _ => false,
            },
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:?} {}", self.sensor, self.op, self.value)
    }
}
