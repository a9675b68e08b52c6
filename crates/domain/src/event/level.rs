//! Percentage events fixed to `[0, 100]`.

use crate::id::SensorId;

/// Integer snapshot fixed to `[0, 100]`.
///
/// Behaves like a [`Range`](super::Range) with fixed bounds, and logs a
/// warning whenever an out-of-bounds input had to be clamped.
#[derive(Debug, Clone)]
pub struct Level {
    source_id: SensorId,
    source_name: String,
    value: i32,
}

impl Level {
    pub const MIN: i32 = 0;
    pub const MAX: i32 = 100;

    #[must_use]
    pub fn new(source_id: SensorId, source_name: impl Into<String>, value: i32) -> Self {
        let source_name = source_name.into();
        let value = clamp_level(source_id, &source_name, value);
        Self {
            source_id,
            source_name,
            value,
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
    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn set_value(&mut self, value: i32) {
        self.value = clamp_level(self.source_id, &self.source_name, value);
    }

    #[must_use]
    pub fn with_value(&self, value: i32) -> Self {
        Self::new(self.source_id, self.source_name.clone(), value)
    }

    #[must_use]
    pub fn serialize(&self) -> String {
        self.value.to_string()
    }

    #[must_use]
    pub fn is_equal(&self, other: &Self) -> bool {
        self.source_id == other.source_id
            && self.source_name == other.source_name
            && self.value == other.value
    }
}

fn clamp_level(source_id: SensorId, source_name: &str, value: i32) -> i32 {
    let clamped = value.clamp(Level::MIN, Level::MAX);
    if clamped != value {
        tracing::warn!(
            sensor_id = %source_id,
            sensor_name = source_name,
            value,
            clamped,
            "level value out of [0, 100], clamped"
        );
    }
    clamped
}
