//! Model builder port: turns a controller description into a runnable
//! generation of commands and sensors.

use std::collections::HashSet;
use std::sync::Arc;

use homectl_domain::error::{DeploymentError, HomectlError};

use crate::commands::CommandFacade;
use crate::sensor::Sensor;
use crate::status_cache::StatusCache;

/// One deployment generation: the write commands and the sensors.
#[derive(Debug, Default)]
pub struct Deployment {
    pub commands: CommandFacade,
    pub sensors: Vec<Arc<Sensor>>,
}

impl Deployment {
    /// Check generation-wide invariants.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentError::DuplicateSensor`] when two sensors share an id.
    pub fn validate(&self) -> Result<(), DeploymentError> {
        let mut seen = HashSet::with_capacity(self.sensors.len());
        for sensor in &self.sensors {
            if !seen.insert(sensor.id()) {
                return Err(DeploymentError::DuplicateSensor(sensor.id()));
            }
        }
        Ok(())
    }
}

/// Builds deployment generations.
///
/// Implementations parse whatever describes the controller (a configuration
/// file, a test fixture) and bind every sensor to `cache`.
pub trait ModelBuilder: Send + Sync {
    /// Build a new generation without starting anything.
    ///
    /// # Errors
    ///
    /// Returns an error when the description is invalid; the caller keeps
    /// running the previous generation.
    fn build(&self, cache: &Arc<StatusCache>) -> Result<Deployment, HomectlError>;
}
