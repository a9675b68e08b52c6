//! Commands bound to a virtual device.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use homectl_app::ports::{EventListener, ExecutableCommand, StatusCommand};
use homectl_app::sensor::Sensor;
use homectl_domain::error::HomectlError;
use homectl_domain::event::UNKNOWN_STATUS;
use homectl_domain::id::SensorId;
use homectl_domain::sensor::{Properties, SensorType};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::device::{VirtualAction, VirtualDevice};

const FOLLOWER_GRACE: Duration = Duration::from_secs(1);

struct Follower {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// A command on a [`VirtualDevice`].
///
/// With an action it is a write command; it can always be read, and sensors
/// registered on it as a listener get every value change pushed.
pub struct VirtualCommand {
    device: Arc<VirtualDevice>,
    action: Option<VirtualAction>,
    followers: Mutex<HashMap<SensorId, Follower>>,
}

impl VirtualCommand {
    /// Command applying `action` when sent.
    #[must_use]
    pub fn write(device: Arc<VirtualDevice>, action: VirtualAction) -> Self {
        Self {
            device,
            action: Some(action),
            followers: Mutex::default(),
        }
    }

    /// Read-only command.
    #[must_use]
    pub fn status(device: Arc<VirtualDevice>) -> Self {
        Self {
            device,
            action: None,
            followers: Mutex::default(),
        }
    }

    #[must_use]
    pub fn device(&self) -> &Arc<VirtualDevice> {
        &self.device
    }

    /// Number of sensors currently following the device.
    #[must_use]
    pub fn follower_count(&self) -> usize {
        self.followers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for VirtualCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualCommand")
            .field("device", &self.device.name())
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ExecutableCommand for VirtualCommand {
    async fn send(&self) {
        let Some(action) = &self.action else {
            tracing::warn!(device = self.device.name(), "read-only virtual command sent");
            return;
        };
        match self.device.apply(action) {
            Ok(()) => tracing::debug!(device = self.device.name(), %action, "virtual action applied"),
            Err(err) => tracing::warn!(device = self.device.name(), %action, %err, "virtual action failed"),
        }
    }
}

#[async_trait]
impl StatusCommand for VirtualCommand {
    async fn read(
        &self,
        _sensor_type: SensorType,
        _properties: &Properties,
    ) -> Result<String, HomectlError> {
        self.device.read().map_err(HomectlError::from)
    }
}

#[async_trait]
impl EventListener for VirtualCommand {
    fn set_sensor(&self, sensor: Arc<Sensor>) -> Result<(), HomectlError> {
        let id = sensor.id();
        let (stop, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(follow(
            Arc::clone(&self.device),
            Arc::downgrade(&sensor),
            stop_rx,
        ));
        let previous = self
            .followers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Follower { stop, handle });
        if let Some(previous) = previous {
            previous.stop.send_replace(true);
        }
        Ok(())
    }

    async fn stop(&self, sensor: &Sensor) {
        let follower = self
            .followers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&sensor.id());
        let Some(follower) = follower else {
            return;
        };
        follower.stop.send_replace(true);
        if tokio::time::timeout(FOLLOWER_GRACE, follower.handle).await.is_err() {
            tracing::warn!(device = self.device.name(), sensor_id = %sensor.id(), "follower did not stop in time");
        }
    }
}

/// Push the current value, then every change, until stopped.
async fn follow(device: Arc<VirtualDevice>, sensor: Weak<Sensor>, mut stop: watch::Receiver<bool>) {
    let mut values = device.subscribe();
    loop {
        let Some(target) = sensor.upgrade() else {
            break;
        };
        values.mark_unchanged();
        let raw = device.read().unwrap_or_else(|err| {
            tracing::debug!(device = device.name(), %err, "virtual device unavailable");
            UNKNOWN_STATUS.to_string()
        });
        target.update(&raw).await;
        drop(target);
        tokio::select! {
            changed = values.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = stop.changed() => break,
        }
    }
}
