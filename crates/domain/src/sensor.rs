//! Sensor definitions: stable identity plus declared type, and the mapping
//! from raw device text to a typed [`Event`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::event::{
    CustomState, Event, Level, Range, Switch, SwitchState, UNKNOWN_STATUS, Unknown,
};
use crate::id::SensorId;

/// Property carrying the lower bound of a range sensor.
pub const RANGE_MIN_PROPERTY: &str = "range-min";
/// Property carrying the upper bound of a range sensor.
pub const RANGE_MAX_PROPERTY: &str = "range-max";

/// Free-form string properties handed to status commands on every read.
pub type Properties = BTreeMap<String, String>;

/// Declared type of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    Switch,
    Level,
    Range,
    Custom,
}

impl SensorType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Switch => "switch",
            Self::Level => "level",
            Self::Range => "range",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid sensor type {0:?}")]
pub struct ParseSensorTypeError(pub String);

impl FromStr for SensorType {
    type Err = ParseSensorTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "switch" => Ok(Self::Switch),
            "level" => Ok(Self::Level),
            "range" => Ok(Self::Range),
            "custom" => Ok(Self::Custom),
            _ => Err(ParseSensorTypeError(s.to_string())),
        }
    }
}

/// Ordered set of accepted states, each optionally mapped to a display value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistinctStates {
    states: Vec<(String, Option<String>)>,
}

impl DistinctStates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The `on`/`off` pair every switch sensor accepts.
    #[must_use]
    pub fn switch() -> Self {
        Self::new().with_state("on").with_state("off")
    }

    /// Add (or replace) an unmapped state.
    #[must_use]
    pub fn with_state(self, state: impl Into<String>) -> Self {
        self.insert(state.into(), None)
    }

    /// Add (or replace) a state displayed as `display`.
    #[must_use]
    pub fn with_mapping(self, state: impl Into<String>, display: impl Into<String>) -> Self {
        self.insert(state.into(), Some(display.into()))
    }

    fn insert(mut self, state: String, display: Option<String>) -> Self {
        match self.states.iter_mut().find(|(name, _)| *name == state) {
            Some(entry) => entry.1 = display,
            None => self.states.push((state, display)),
        }
        self
    }

    #[must_use]
    pub fn has_state(&self, state: &str) -> bool {
        self.states.iter().any(|(name, _)| name == state)
    }

    /// Display value of `state`, if the state is mapped.
    #[must_use]
    pub fn mapping(&self, state: &str) -> Option<&str> {
        self.states
            .iter()
            .find(|(name, _)| name == state)
            .and_then(|(_, display)| display.as_deref())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(|(name, _)| name.as_str())
    }
}

/// Type-specific configuration of a sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorKind {
    Range { min: i32, max: i32 },
    Level,
    Switch { states: DistinctStates },
    Custom { states: DistinctStates, strict: bool },
}

impl SensorKind {
    /// Switch accepting the plain `on`/`off` states.
    #[must_use]
    pub fn switch() -> Self {
        Self::Switch {
            states: DistinctStates::switch(),
        }
    }

    #[must_use]
    pub fn sensor_type(&self) -> SensorType {
        match self {
            Self::Range { .. } => SensorType::Range,
            Self::Level => SensorType::Level,
            Self::Switch { .. } => SensorType::Switch,
            Self::Custom { .. } => SensorType::Custom,
        }
    }
}

/// Identity and declared type of one sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorDefinition {
    id: SensorId,
    name: String,
    kind: SensorKind,
    properties: Properties,
}

impl SensorDefinition {
    /// Create a builder for constructing a [`SensorDefinition`].
    #[must_use]
    pub fn builder() -> SensorDefinitionBuilder {
        SensorDefinitionBuilder::default()
    }

    #[must_use]
    pub fn id(&self) -> SensorId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> &SensorKind {
        &self.kind
    }

    #[must_use]
    pub fn sensor_type(&self) -> SensorType {
        self.kind.sensor_type()
    }

    #[must_use]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Turn a raw device value into a typed event.
    ///
    /// Never fails: values that do not fit the declared type become an
    /// [`Unknown`] event, with a warning unless the raw value already was the
    /// unknown status.
    #[must_use]
    pub fn process(&self, raw: &str) -> Event {
        if raw == UNKNOWN_STATUS {
            return self.unknown();
        }
        match &self.kind {
            SensorKind::Range { min, max } => match raw.trim().parse::<i32>() {
                Ok(value) => Range::new(self.id, self.name.clone(), value, *min, *max).into(),
                Err(_) => self.reject(raw, "not an integer"),
            },
            SensorKind::Level => match raw.trim().parse::<i32>() {
                Ok(value) => Level::new(self.id, self.name.clone(), value).into(),
                Err(_) => self.reject(raw, "not an integer"),
            },
            SensorKind::Switch { states } => self.process_switch(states, raw),
            SensorKind::Custom { states, strict } => self.process_custom(states, *strict, raw),
        }
    }

    fn process_switch(&self, states: &DistinctStates, raw: &str) -> Event {
        let state = raw.trim().to_ascii_lowercase();
        if !states.has_state(&state) {
            return self.reject(raw, "not a switch state");
        }
        match (state.parse::<SwitchState>(), states.mapping(&state)) {
            (Ok(parsed), Some(display)) => {
                Switch::new(self.id, self.name.clone(), display, parsed).into()
            }
            (Ok(parsed), None) => Switch::from_state(self.id, self.name.clone(), parsed).into(),
            (Err(_), _) => self.reject(raw, "not a switch state"),
        }
    }

    fn process_custom(&self, states: &DistinctStates, strict: bool, raw: &str) -> Event {
        if !states.has_state(raw) {
            if strict {
                return self.reject(raw, "not a declared state");
            }
            return CustomState::new(self.id, self.name.clone(), raw).into();
        }
        match states.mapping(raw) {
            Some(display) => CustomState::mapped(self.id, self.name.clone(), display, raw).into(),
            None => CustomState::new(self.id, self.name.clone(), raw).into(),
        }
    }

    /// Unknown event for this sensor.
    #[must_use]
    pub fn unknown(&self) -> Event {
        Unknown::new(self.id, self.name.clone()).into()
    }

    fn reject(&self, raw: &str, reason: &'static str) -> Event {
        tracing::warn!(
            sensor_id = %self.id,
            sensor_name = %self.name,
            sensor_type = %self.sensor_type(),
            raw,
            reason,
            "rejecting sensor value"
        );
        self.unknown()
    }
}

/// Step-by-step builder for [`SensorDefinition`].
#[derive(Debug, Default)]
pub struct SensorDefinitionBuilder {
    id: Option<SensorId>,
    name: Option<String>,
    kind: Option<SensorKind>,
    properties: Properties,
}

impl SensorDefinitionBuilder {
    #[must_use]
    pub fn id(mut self, id: SensorId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: SensorKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Consume the builder, validate, and return a [`SensorDefinition`].
    ///
    /// Range bounds are published as the `range-min`/`range-max` properties so
    /// status commands can see them.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyName`] when the name is missing or blank
    /// and [`ValidationError::NoStates`] for a custom sensor without states.
    pub fn build(self) -> Result<SensorDefinition, ValidationError> {
        let name = self.name.unwrap_or_default();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let kind = self.kind.unwrap_or_else(SensorKind::switch);
        let mut properties = self.properties;
        match &kind {
            SensorKind::Range { min, max } => {
                properties.insert(RANGE_MIN_PROPERTY.to_string(), min.to_string());
                properties.insert(RANGE_MAX_PROPERTY.to_string(), max.to_string());
            }
            SensorKind::Custom { states, .. } if states.is_empty() => {
                return Err(ValidationError::NoStates);
            }
            _ => {}
        }
        Ok(SensorDefinition {
            id: self.id.unwrap_or(SensorId::new(0)),
            name,
            kind,
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor(kind: SensorKind) -> SensorDefinition {
        SensorDefinition::builder()
            .id(SensorId::new(10))
            .name("probe")
            .kind(kind)
            .build()
            .unwrap()
    }

    #[test]
    fn should_produce_clamped_range_when_value_is_integer() {
        let def = sensor(SensorKind::Range { min: -20, max: 100 });
        let event = def.process(" 150 ");
        assert!(matches!(&event, Event::Range(r) if r.value() == 100));
        assert_eq!(def.process("42").serialize(), "42");
    }

    #[test]
    fn should_produce_unknown_when_range_value_is_not_integer() {
        let def = sensor(SensorKind::Range { min: 0, max: 10 });
        assert!(def.process("warm").is_unknown());
    }

    #[test]
    fn should_publish_range_bounds_as_properties() {
        let def = sensor(SensorKind::Range { min: -20, max: 100 });
        assert_eq!(def.properties()[RANGE_MIN_PROPERTY], "-20");
        assert_eq!(def.properties()[RANGE_MAX_PROPERTY], "100");
    }

    #[test]
    fn should_produce_level_when_value_is_integer() {
        let def = sensor(SensorKind::Level);
        assert!(matches!(def.process("120"), Event::Level(l) if l.value() == 100));
    }

    #[test]
    fn should_produce_switch_when_value_is_on_or_off() {
        let def = sensor(SensorKind::switch());
        let on = def.process("ON");
        assert!(matches!(&on, Event::Switch(s) if s.state() == SwitchState::On));
        assert_eq!(on.serialize(), "on");
        assert_eq!(def.process("off").serialize(), "off");
    }

    #[test]
    fn should_produce_unknown_when_switch_value_is_invalid() {
        let def = sensor(SensorKind::switch());
        assert!(def.process("half").is_unknown());
    }

    #[test]
    fn should_use_mapping_when_switch_state_is_mapped() {
        let def = sensor(SensorKind::Switch {
            states: DistinctStates::new()
                .with_mapping("on", "open")
                .with_mapping("off", "closed"),
        });
        let event = def.process("on");
        assert!(matches!(&event, Event::Switch(s) if s.state() == SwitchState::On));
        assert_eq!(event.serialize(), "open");
    }

    #[test]
    fn should_produce_unknown_when_strict_custom_value_is_undeclared() {
        let def = sensor(SensorKind::Custom {
            states: DistinctStates::new().with_state("home").with_state("away"),
            strict: true,
        });
        assert!(def.process("vacation").is_unknown());
        assert_eq!(def.process("home").serialize(), "home");
    }

    #[test]
    fn should_accept_any_value_when_custom_sensor_is_lenient() {
        let def = sensor(SensorKind::Custom {
            states: DistinctStates::new().with_state("home"),
            strict: false,
        });
        assert_eq!(def.process("vacation").serialize(), "vacation");
    }

    #[test]
    fn should_keep_raw_state_when_custom_state_is_mapped() {
        let def = sensor(SensorKind::Custom {
            states: DistinctStates::new().with_mapping("2", "Away"),
            strict: true,
        });
        let event = def.process("2");
        assert!(matches!(&event, Event::Custom(c) if c.original_state() == Some("2")));
        assert_eq!(event.serialize(), "Away");
    }

    #[test]
    fn should_produce_unknown_when_raw_value_is_not_available() {
        for kind in [
            SensorKind::Level,
            SensorKind::switch(),
            SensorKind::Range { min: 0, max: 1 },
        ] {
            assert!(sensor(kind).process(UNKNOWN_STATUS).is_unknown());
        }
    }

    #[test]
    fn should_reject_definition_when_name_is_blank() {
        let result = SensorDefinition::builder().name("  ").build();
        assert_eq!(result.unwrap_err(), ValidationError::EmptyName);
    }

    #[test]
    fn should_reject_custom_definition_without_states() {
        let result = SensorDefinition::builder()
            .name("mode")
            .kind(SensorKind::Custom {
                states: DistinctStates::new(),
                strict: true,
            })
            .build();
        assert_eq!(result.unwrap_err(), ValidationError::NoStates);
    }

    #[test]
    fn should_parse_sensor_type_case_insensitively() {
        assert_eq!("RANGE".parse::<SensorType>().unwrap(), SensorType::Range);
        assert!("thermostat".parse::<SensorType>().is_err());
    }
}
