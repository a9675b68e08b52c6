//! # homectl-adapter-virtual
//!
//! Virtual/demo command adapter that provides simulated devices for testing
//! and demonstration purposes.
//!
//! ## Provided devices
//!
//! | Kind | Accepted actions | Value |
//! |------|------------------|-------|
//! | Switch | `on` / `off` / `toggle` / `set:on` / `set:off` | `on` or `off` |
//! | Level | `set:<0..=100>` | integer percentage |
//! | Text | `set:<text>` | any text |
//!
//! Every command can be read ([`StatusCommand`](homectl_app::ports::StatusCommand))
//! and followed ([`EventListener`](homectl_app::ports::EventListener)).
//!
//! ## Dependency rule
//!
//! Depends on `homectl-app` (port traits) and `homectl-domain` only.

mod command;
mod device;
mod error;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

pub use command::VirtualCommand;
pub use device::{DeviceKind, VirtualAction, VirtualDevice};
pub use error::VirtualError;

/// Action name of read-only commands.
pub const STATUS_ACTION: &str = "status";

/// Registry of simulated devices, shared by every command built from it.
#[derive(Debug, Default)]
pub struct VirtualDevices {
    devices: Mutex<HashMap<String, Arc<VirtualDevice>>>,
}

impl VirtualDevices {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the named device, creating it with `kind` on first use.
    ///
    /// # Errors
    ///
    /// Returns [`VirtualError::KindMismatch`] when the device already exists
    /// with another kind.
    pub fn device(&self, name: &str, kind: DeviceKind) -> Result<Arc<VirtualDevice>, VirtualError> {
        let mut devices = self.devices.lock().unwrap_or_else(PoisonError::into_inner);
        let device = devices
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(VirtualDevice::new(name, kind)));
        if device.kind() != kind {
            tracing::warn!(device = name, existing = ?device.kind(), requested = ?kind, "device kind changed");
            return Err(VirtualError::KindMismatch {
                device: name.to_string(),
                existing: device.kind(),
                requested: kind,
            });
        }
        Ok(Arc::clone(device))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<VirtualDevice>> {
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Build a command on the named device.
    ///
    /// `action` is `status` for a read-only command, otherwise a
    /// [`VirtualAction`].
    ///
    /// # Errors
    ///
    /// Returns [`VirtualError::InvalidAction`] when `action` cannot be parsed
    /// and [`VirtualError::KindMismatch`] when the device exists with another
    /// kind.
    pub fn command(
        &self,
        device: &str,
        kind: DeviceKind,
        action: &str,
    ) -> Result<VirtualCommand, VirtualError> {
        let device = self.device(device, kind)?;
        if action.trim() == STATUS_ACTION {
            return Ok(VirtualCommand::status(device));
        }
        Ok(VirtualCommand::write(device, action.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use homectl_app::ports::{ExecutableCommand, StatusCommand};
    use homectl_domain::sensor::{Properties, SensorType};

    use super::*;

    #[test]
    fn should_share_device_between_commands() {
        let devices = VirtualDevices::new();
        let on = devices.command("lamp", DeviceKind::Switch, "on").unwrap();
        let status = devices.command("lamp", DeviceKind::Switch, "status").unwrap();
        assert!(Arc::ptr_eq(on.device(), status.device()));
    }

    #[test]
    fn should_reject_device_reused_with_another_kind() {
        let devices = VirtualDevices::new();
        devices.command("lamp", DeviceKind::Switch, "on").unwrap();

        let result = devices.command("lamp", DeviceKind::Level, "status");

        assert!(matches!(
            result,
            Err(VirtualError::KindMismatch {
                existing: DeviceKind::Switch,
                requested: DeviceKind::Level,
                ..
            })
        ));
        assert_eq!(devices.get("lamp").unwrap().kind(), DeviceKind::Switch);
    }

    #[test]
    fn should_reject_unknown_action() {
        let devices = VirtualDevices::new();
        assert!(matches!(
            devices.command("lamp", DeviceKind::Switch, "blink"),
            Err(VirtualError::InvalidAction(_))
        ));
    }

    #[tokio::test]
    async fn should_read_value_written_by_another_command() {
        let devices = VirtualDevices::new();
        let set = devices.command("dimmer", DeviceKind::Level, "set:70").unwrap();
        let status = devices.command("dimmer", DeviceKind::Level, "status").unwrap();

        set.send().await;

        let value = status.read(SensorType::Level, &Properties::new()).await.unwrap();
        assert_eq!(value, "70");
    }
}
