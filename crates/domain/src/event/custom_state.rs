//! Free-form string events.

use crate::id::SensorId;

/// Unvalidated string snapshot.
///
/// When the producing sensor maps raw states to display values,
/// `original_state` keeps the raw state the mapping was applied to.
#[derive(Debug, Clone)]
pub struct CustomState {
    source_id: SensorId,
    source_name: String,
    value: String,
    original_state: Option<String>,
}

impl CustomState {
    #[must_use]
    pub fn new(source_id: SensorId, source_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            source_id,
            source_name: source_name.into(),
            value: value.into(),
            original_state: None,
        }
    }

    /// State produced by mapping `original_state` to the display `value`.
    #[must_use]
    pub fn mapped(
        source_id: SensorId,
        source_name: impl Into<String>,
        value: impl Into<String>,
        original_state: impl Into<String>,
    ) -> Self {
        Self {
            original_state: Some(original_state.into()),
            ..Self::new(source_id, source_name, value)
        }
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
    pub fn original_state(&self) -> Option<&str> {
        self.original_state.as_deref()
    }

    #[must_use]
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self::new(self.source_id, self.source_name.clone(), value)
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
