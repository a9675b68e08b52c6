//! Samples: numeric time-series points recorded for configured sensors.

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// One numeric value of a sensor at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Name of the sensor the value belongs to.
    pub source_name: String,
    pub timestamp: Timestamp,
    pub value: f64,
}

impl Sample {
    #[must_use]
    pub fn new(source_name: impl Into<String>, timestamp: Timestamp, value: f64) -> Self {
        Self {
            source_name: source_name.into(),
            timestamp,
            value,
        }
    }
}
