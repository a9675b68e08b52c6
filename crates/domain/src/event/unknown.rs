use crate::id::SensorId;

/// Text every unknown or unavailable status serializes to.
pub const UNKNOWN_STATUS: &str = "N/A";

/// Sentinel event for a sensor whose value is not known.
#[derive(Debug, Clone)]
pub struct Unknown {
    source_id: SensorId,
    source_name: String,
}

impl Unknown {
    #[must_use]
    pub fn new(source_id: SensorId, source_name: impl Into<String>) -> Self {
        Self {
            source_id,
            source_name: source_name.into(),
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
    pub fn serialize(&self) -> String {
        UNKNOWN_STATUS.to_string()
    }

    #[must_use]
    pub fn is_equal(&self, other: &Self) -> bool {
        self.source_id == other.source_id && self.source_name == other.source_name
    }
}
