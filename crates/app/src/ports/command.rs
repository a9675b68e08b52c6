//! Command ports: the capabilities a protocol adapter can offer.
//!
//! A single adapter type may implement any subset of:
//!
//! - [`ExecutableCommand`]: fire-and-forget write (`send`)
//! - [`StatusCommand`]: synchronous pull of the current raw value (`read`)
//! - [`EventListener`]: push registration; the adapter produces values for
//!   the registered sensors on its own schedule
//!
//! Sensors are bound to exactly one producer, expressed by [`EventProducer`].

use std::sync::Arc;

use async_trait::async_trait;
use homectl_domain::error::HomectlError;
use homectl_domain::sensor::{Properties, SensorType};

use crate::sensor::Sensor;

/// A write command (e.g. "turn the heater on").
#[async_trait]
pub trait ExecutableCommand: Send + Sync {
    /// Perform the write.
    ///
    /// Failures are the adapter's business: they are logged, never returned.
    async fn send(&self);
}

/// A command able to return the current raw value of a device.
#[async_trait]
pub trait StatusCommand: Send + Sync {
    /// Read the raw value for a sensor of the given type.
    ///
    /// # Errors
    ///
    /// Returns an error when the device could not be read; the caller treats
    /// the sensor value as unknown.
    async fn read(
        &self,
        sensor_type: SensorType,
        properties: &Properties,
    ) -> Result<String, HomectlError>;
}

/// A command that pushes values to the sensors registered on it.
#[async_trait]
pub trait EventListener: Send + Sync {
    /// Register a sensor. Registration and activation are the same moment:
    /// the listener may start producing values for it right away.
    ///
    /// # Errors
    ///
    /// Returns an error when the sensor cannot be served by this listener.
    fn set_sensor(&self, sensor: Arc<Sensor>) -> Result<(), HomectlError>;

    /// Deregister a sensor, stopping production for it.
    ///
    /// Must not block indefinitely.
    async fn stop(&self, sensor: &Sensor);
}

/// How a sensor gets its values.
#[derive(Clone)]
pub enum EventProducer {
    /// Polled by a worker owned by the sensor.
    Status(Arc<dyn StatusCommand>),
    /// Pushed by the command itself.
    Listener(Arc<dyn EventListener>),
}

impl std::fmt::Debug for EventProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(_) => f.write_str("EventProducer::Status"),
            Self::Listener(_) => f.write_str("EventProducer::Listener"),
        }
    }
}
