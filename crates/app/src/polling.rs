//! Polling workers: background tasks producing sensor values on an interval.
//!
//! A [`PollingWorker`] runs one tick, sleeps the interval and starts over
//! until asked to stop. Stopping sets a `watch` flag that also wakes the
//! sleep, then waits for the task to finish within a grace period; a tick in
//! progress always completes.
//!
//! A [`PollingGroup`] shares one worker between every sensor bound to the
//! same command: the worker is created by the first registration and torn
//! down by the last deregistration.

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use homectl_domain::id::SensorId;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::sensor::Sensor;

/// Interval used when a sensor polls a plain status command.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_millis(500);

/// Time granted to a worker to finish its current tick on stop.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

/// Handle of a running polling task.
#[derive(Debug)]
pub struct PollingWorker {
    name: String,
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
    grace: Duration,
}

impl PollingWorker {
    /// Spawn a worker calling `tick` every `interval`.
    ///
    /// The worker also ends on its own when `tick` returns
    /// [`ControlFlow::Break`].
    pub fn spawn<F, Fut>(name: impl Into<String>, interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send,
    {
        let name = name.into();
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            tracing::debug!(worker = %task_name, ?interval, "polling worker started");
            loop {
                if *stop_rx.borrow_and_update() {
                    break;
                }
                if tick().await.is_break() {
                    break;
                }
                tokio::select! {
                    () = tokio::time::sleep(interval) => {}
                    changed = stop_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!(worker = %task_name, "polling worker stopped");
        });
        Self {
            name,
            stop_tx,
            handle,
            grace: DEFAULT_STOP_GRACE,
        }
    }

    /// Override the grace period used by [`PollingWorker::stop`].
    #[must_use]
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Ask the worker to stop without waiting for it.
    pub fn request_stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Ask the worker to stop and wait for it, at most the grace period.
    ///
    /// A worker still busy after the grace period is left to finish on its
    /// own; it will not start another tick.
    pub async fn stop(self) {
        self.request_stop();
        match tokio::time::timeout(self.grace, self.handle).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(worker = %self.name, %err, "polling worker failed");
            }
            Err(_) => {
                tracing::warn!(
                    worker = %self.name,
                    grace = ?self.grace,
                    "polling worker did not stop within grace period"
                );
            }
        }
    }
}

/// Sensors registered on one shared command.
#[derive(Debug, Default)]
pub struct SensorSet {
    sensors: Mutex<Vec<Arc<Sensor>>>,
}

impl SensorSet {
    /// Add a sensor, replacing one with the same id.
    /// Returns `true` when the set was empty before.
    fn insert(&self, sensor: Arc<Sensor>) -> bool {
        let mut sensors = self.sensors.lock().unwrap_or_else(PoisonError::into_inner);
        let was_empty = sensors.is_empty();
        sensors.retain(|existing| existing.id() != sensor.id());
        sensors.push(sensor);
        was_empty
    }

    /// Remove a sensor. Returns `true` when the set is empty afterwards.
    fn remove(&self, id: SensorId) -> bool {
        let mut sensors = self.sensors.lock().unwrap_or_else(PoisonError::into_inner);
        sensors.retain(|existing| existing.id() != id);
        sensors.is_empty()
    }

    /// Currently registered sensors.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<Sensor>> {
        self.sensors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sensors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reference-counted worker shared by all sensors of a command.
#[derive(Debug, Default)]
pub struct PollingGroup {
    sensors: Arc<SensorSet>,
    worker: Mutex<Option<PollingWorker>>,
}

impl PollingGroup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sensor; the first registration starts the worker built by
    /// `start`, which receives the shared sensor set.
    pub fn register<F>(&self, sensor: Arc<Sensor>, start: F)
    where
        F: FnOnce(Arc<SensorSet>) -> PollingWorker,
    {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        let first = self.sensors.insert(sensor);
        if first || worker.is_none() {
            *worker = Some(start(Arc::clone(&self.sensors)));
        }
    }

    /// Deregister a sensor; the last deregistration stops the worker.
    pub async fn deregister(&self, id: SensorId) {
        let stopping = {
            let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
            if self.sensors.remove(id) {
                worker.take()
            } else {
                None
            }
        };
        if let Some(worker) = stopping {
            worker.stop().await;
        }
    }

    #[must_use]
    pub fn sensors(&self) -> &Arc<SensorSet> {
        &self.sensors
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }
}
