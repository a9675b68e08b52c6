//! Event value model: typed, immutable snapshots of a sensor value.
//!
//! An [`Event`] is produced by a sensor for every raw value it receives, flows
//! through the processor chain and ends up in the status cache. Consumers never
//! mutate a published event; a change is always a new event.

mod custom_state;
mod level;
mod range;
mod switch;
mod unknown;

use std::fmt;

pub use self::custom_state::CustomState;
pub use self::level::Level;
pub use self::range::Range;
pub use self::switch::{ParseSwitchStateError, Switch, SwitchState};
pub use self::unknown::{UNKNOWN_STATUS, Unknown};

use crate::id::SensorId;

/// A typed value snapshot from one sensor.
#[derive(Debug, Clone)]
pub enum Event {
    Range(Range),
    Level(Level),
    Switch(Switch),
    Custom(CustomState),
    Unknown(Unknown),
}

impl Event {
    /// Identity of the sensor that produced the event.
    #[must_use]
    pub fn source_id(&self) -> SensorId {
        match self {
            Self::Range(inner) => inner.source_id(),
            Self::Level(inner) => inner.source_id(),
            Self::Switch(inner) => inner.source_id(),
            Self::Custom(inner) => inner.source_id(),
            Self::Unknown(inner) => inner.source_id(),
        }
    }

    #[must_use]
    pub fn source_name(&self) -> &str {
        match self {
            Self::Range(inner) => inner.source_name(),
            Self::Level(inner) => inner.source_name(),
            Self::Switch(inner) => inner.source_name(),
            Self::Custom(inner) => inner.source_name(),
            Self::Unknown(inner) => inner.source_name(),
        }
    }

    /// Textual form of the value, as served to clients.
    #[must_use]
    pub fn serialize(&self) -> String {
        match self {
            Self::Range(inner) => inner.serialize(),
            Self::Level(inner) => inner.serialize(),
            Self::Switch(inner) => inner.serialize(),
            Self::Custom(inner) => inner.serialize(),
            Self::Unknown(inner) => inner.serialize(),
        }
    }

    /// Value equality: same kind, same source, same value.
    ///
    /// Always false across different event kinds.
    #[must_use]
    pub fn is_equal(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Range(a), Self::Range(b)) => a.is_equal(b),
            (Self::Level(a), Self::Level(b)) => a.is_equal(b),
            (Self::Switch(a), Self::Switch(b)) => a.is_equal(b),
            (Self::Custom(a), Self::Custom(b)) => a.is_equal(b),
            (Self::Unknown(a), Self::Unknown(b)) => a.is_equal(b),
            _ => false,
        }
    }

    /// New event of the same kind and source holding `value`, with the
    /// kind's constraints applied again (range bounds, switch states).
    ///
    /// A value a numeric kind cannot parse yields an [`Unknown`] event.
    #[must_use]
    pub fn with_value(&self, value: &str) -> Self {
        let parsed = value.trim().parse::<i32>();
        match (self, parsed) {
            (Self::Range(inner), Ok(parsed)) => Self::Range(inner.with_value(parsed)),
            (Self::Level(inner), Ok(parsed)) => Self::Level(inner.with_value(parsed)),
            (Self::Switch(inner), _) => Self::Switch(inner.with_value(value)),
            (Self::Custom(inner), _) => Self::Custom(inner.with_value(value)),
            _ => Self::Unknown(Unknown::new(self.source_id(), self.source_name())),
        }
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    /// Name of the event kind, used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Range(_) => "range",
            Self::Level(_) => "level",
            Self::Switch(_) => "switch",
            Self::Custom(_) => "custom",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal(other)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}:{})={}",
            self.kind(),
            self.source_id(),
            self.source_name(),
            self.serialize()
        )
    }
}

impl From<Range> for Event {
    fn from(value: Range) -> Self {
        Self::Range(value)
    }
}

impl From<Level> for Event {
    fn from(value: Level) -> Self {
        Self::Level(value)
    }
}

impl From<Switch> for Event {
    fn from(value: Switch) -> Self {
        Self::Switch(value)
    }
}

impl From<CustomState> for Event {
    fn from(value: CustomState) -> Self {
        Self::Custom(value)
    }
}

impl From<Unknown> for Event {
    fn from(value: Unknown) -> Self {
        Self::Unknown(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: SensorId = SensorId::new(1);

    #[test]
    fn should_not_be_equal_when_kinds_differ() {
        let range = Event::from(Range::new(ID, "s", 42, 0, 100));
        let custom = Event::from(CustomState::new(ID, "s", "42"));
        assert_eq!(range.serialize(), custom.serialize());
        assert!(!range.is_equal(&custom));
    }

    #[test]
    fn should_not_be_equal_when_sources_differ() {
        let a = Event::from(Level::new(SensorId::new(1), "s", 10));
        let b = Event::from(Level::new(SensorId::new(2), "s", 10));
        assert_ne!(a, b);
    }

    #[test]
    fn should_serialize_unknown_as_not_available() {
        let event = Event::from(Unknown::new(ID, "s"));
        assert_eq!(event.serialize(), UNKNOWN_STATUS);
        assert!(event.is_unknown());
    }

    #[test]
    fn should_expose_source_for_every_kind() {
        let events = [
            Event::from(Range::new(ID, "s", 1, 0, 2)),
            Event::from(Level::new(ID, "s", 1)),
            Event::from(Switch::from_state(ID, "s", SwitchState::On)),
            Event::from(CustomState::new(ID, "s", "x")),
            Event::from(Unknown::new(ID, "s")),
        ];
        for event in events {
            assert_eq!(event.source_id(), ID);
            assert_eq!(event.source_name(), "s");
        }
    }

    #[test]
    fn should_keep_kind_and_bounds_when_value_replaced() {
        let range = Event::from(Range::new(ID, "s", 42, -20, 100));
        assert_eq!(range.with_value("150").serialize(), "100");
        assert_eq!(range.with_value(" -5 ").serialize(), "-5");
        assert!(range.with_value("warm").is_unknown());

        let switch = Event::from(Switch::from_state(ID, "s", SwitchState::Off));
        assert_eq!(switch.with_value("ON").serialize(), "on");

        let unknown = Event::from(Unknown::new(ID, "s"));
        assert!(unknown.with_value("1").is_unknown());
    }

    #[test]
    fn should_render_kind_source_and_value_when_displayed() {
        let event = Event::from(Switch::from_state(SensorId::new(5), "lamp", SwitchState::On));
        assert_eq!(event.to_string(), "switch(5:lamp)=on");
    }
}
