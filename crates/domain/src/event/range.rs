//! Integer events bounded by an inclusive `[min, max]` interval.

use crate::id::SensorId;

/// Integer value snapshot clamped to inclusive bounds.
///
/// Every write path (construction, [`Range::set_value`],
/// [`Range::with_value`]) clamps to the nearest bound, so
/// `min <= value <= max` always holds.
#[derive(Debug, Clone)]
pub struct Range {
    source_id: SensorId,
    source_name: String,
    value: i32,
    min: i32,
    max: i32,
}

impl Range {
    /// Create a range event, clamping `value` into `[min, max]`.
    ///
    /// Bounds given in the wrong order are swapped.
    #[must_use]
    pub fn new(
        source_id: SensorId,
        source_name: impl Into<String>,
        value: i32,
        min: i32,
        max: i32,
    ) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            source_id,
            source_name: source_name.into(),
            value: value.clamp(min, max),
            min,
            max,
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

    #[must_use]
    pub fn min(&self) -> i32 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> i32 {
        self.max
    }

    /// Replace the value, clamping it into the bounds of this event.
    pub fn set_value(&mut self, value: i32) {
        self.value = value.clamp(self.min, self.max);
    }

    /// Same source and bounds, new (clamped) value.
    #[must_use]
    pub fn with_value(&self, value: i32) -> Self {
        Self::new(
            self.source_id,
            self.source_name.clone(),
            value,
            self.min,
            self.max,
        )
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
