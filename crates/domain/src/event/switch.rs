//! On/off events.

use std::fmt;
use std::str::FromStr;

use crate::id::SensorId;

/// Canonical state of a [`Switch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchState {
    On,
    Off,
}

impl SwitchState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a text is neither `on` nor `off`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid switch state {0:?}")]
pub struct ParseSwitchStateError(pub String);

impl FromStr for SwitchState {
    type Err = ParseSwitchStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("on") {
            Ok(Self::On)
        } else if trimmed.eq_ignore_ascii_case("off") {
            Ok(Self::Off)
        } else {
            Err(ParseSwitchStateError(s.to_string()))
        }
    }
}

/// On/off snapshot with a possibly distinct display value.
///
/// The `value` text may differ from the canonical state when the sensor maps
/// its states (e.g. `"open"` for [`SwitchState::On`]).
#[derive(Debug, Clone)]
pub struct Switch {
    source_id: SensorId,
    source_name: String,
    value: String,
    state: SwitchState,
}

impl Switch {
    #[must_use]
    pub fn new(
        source_id: SensorId,
        source_name: impl Into<String>,
        value: impl Into<String>,
        state: SwitchState,
    ) -> Self {
        Self {
            source_id,
            source_name: source_name.into(),
            value: value.into(),
            state,
        }
    }

    /// Switch whose value text is the canonical state text.
    #[must_use]
    pub fn from_state(
        source_id: SensorId,
        source_name: impl Into<String>,
        state: SwitchState,
    ) -> Self {
        Self::new(source_id, source_name, state.as_str(), state)
    }

    #[must_use]
    pub fn source_id(&self) -> SensorId {
        self.source_id
    }

    #[must_use]
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn state(&self) -> SwitchState {
        self.state
    }

    /// Same source, state derived from `value`.
    ///
    /// `"on"` (any case) becomes [`SwitchState::On`], anything else
    /// [`SwitchState::Off`]; the value text is replaced by the canonical
    /// state text either way, so a mapped display value does not survive.
    #[must_use]
    pub fn with_value(&self, value: &str) -> Self {
        let state = if value.trim().eq_ignore_ascii_case("on") {
            SwitchState::On
        } else {
            SwitchState::Off
        };
        Self::from_state(self.source_id, self.source_name.clone(), state)
    }

    #[must_use]
    pub fn serialize(&self) -> String {
        self.value.clone()
    }

    #[must_use]
    pub fn is_equal(&self, other: &Self) -> bool {
        self.source_id == other.source_id
            && self.source_name == other.source_name
            && self.value == other.value
    }
}
