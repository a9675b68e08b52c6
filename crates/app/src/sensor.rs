//! Sensor runtime: binds a [`SensorDefinition`] to its event producer and
//! to the status cache.
//!
//! Raw values enter through [`Sensor::update`], become typed events and are
//! handed to the cache (which runs the processor chain first).

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use homectl_domain::event::UNKNOWN_STATUS;
use homectl_domain::id::SensorId;
use homectl_domain::sensor::{Properties, SensorDefinition, SensorType};

use crate::polling::{DEFAULT_POLLING_INTERVAL, DEFAULT_STOP_GRACE, PollingWorker};
use crate::ports::{EventProducer, StatusCommand};
use crate::status_cache::StatusCache;

/// A deployed sensor.
pub struct Sensor {
    definition: SensorDefinition,
    producer: EventProducer,
    cache: Arc<StatusCache>,
    interval: Duration,
    stop_grace: Duration,
    reader: Mutex<Option<PollingWorker>>,
    running: AtomicBool,
}

impl Sensor {
    #[must_use]
    pub fn new(
        definition: SensorDefinition,
        producer: EventProducer,
        cache: Arc<StatusCache>,
    ) -> Self {
        Self {
            definition,
            producer,
            cache,
            interval: DEFAULT_POLLING_INTERVAL,
            stop_grace: DEFAULT_STOP_GRACE,
            reader: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    /// Override how often a status command is polled.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Override how long [`Sensor::stop`] waits for a status read in progress.
    #[must_use]
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    #[must_use]
    pub fn id(&self) -> SensorId {
        self.definition.id()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    #[must_use]
    pub fn sensor_type(&self) -> SensorType {
        self.definition.sensor_type()
    }

    #[must_use]
    pub fn properties(&self) -> &Properties {
        self.definition.properties()
    }

    #[must_use]
    pub fn definition(&self) -> &SensorDefinition {
        &self.definition
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Feed a raw device value. Values arriving while the sensor is not
    /// running are dropped, so a stopped generation never reaches the cache.
    pub async fn update(&self, raw: &str) {
        if !self.is_running() {
            tracing::debug!(sensor_id = %self.id(), sensor_name = self.name(), raw, "sensor stopped, value dropped");
            return;
        }
        let event = self.definition.process(raw);
        tracing::trace!(sensor_id = %self.id(), sensor_name = self.name(), raw, "sensor update");
        self.cache.update(event).await;
    }

    /// Bind the producer: register on a listener, or start polling a status
    /// command. Registration failures are logged.
    pub fn start(self: &Arc<Self>) {
        self.running.store(true, Ordering::Release);
        match &self.producer {
            EventProducer::Listener(listener) => {
                if let Err(err) = listener.set_sensor(Arc::clone(self)) {
                    self.running.store(false, Ordering::Release);
                    tracing::error!(
                        sensor_id = %self.id(),
                        sensor_name = self.name(),
                        error = ?err,
                        "unable to register sensor on its command"
                    );
                    return;
                }
            }
            EventProducer::Status(command) => {
                let worker = spawn_reader(Arc::downgrade(self), Arc::clone(command), self.interval);
                let previous = self
                    .reader
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .replace(worker);
                if let Some(previous) = previous {
                    previous.request_stop();
                }
            }
        }
        tracing::debug!(sensor_id = %self.id(), sensor_name = self.name(), "sensor started");
    }

    /// Unbind the producer and wait for any polling worker to finish.
    ///
    /// The sensor stops accepting values before waiting, so a read still in
    /// flight after the grace period is discarded.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::Release);
        match &self.producer {
            EventProducer::Listener(listener) => listener.stop(self).await,
            EventProducer::Status(_) => {
                let worker = self
                    .reader
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                if let Some(worker) = worker {
                    worker.with_grace(self.stop_grace).stop().await;
                }
            }
        }
        tracing::debug!(sensor_id = %self.id(), sensor_name = self.name(), "sensor stopped");
    }
}

fn spawn_reader(
    sensor: Weak<Sensor>,
    command: Arc<dyn StatusCommand>,
    interval: Duration,
) -> PollingWorker {
    let name = sensor
        .upgrade()
        .map_or_else(String::new, |s| format!("sensor-{}", s.id()));
    PollingWorker::spawn(name, interval, move || {
        let sensor = sensor.clone();
        let command = Arc::clone(&command);
        async move {
            let Some(sensor) = sensor.upgrade() else {
                return ControlFlow::Break(());
            };
            let raw = match command.read(sensor.sensor_type(), sensor.properties()).await {
                Ok(raw) => raw,
                Err(err) => {
                    tracing::error!(
                        sensor_id = %sensor.id(),
                        sensor_name = sensor.name(),
                        error = ?err,
                        "unable to read sensor status"
                    );
                    UNKNOWN_STATUS.to_string()
                }
            };
            sensor.update(&raw).await;
            ControlFlow::Continue(())
        }
    })
}

impl std::fmt::Debug for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sensor")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("type", &self.sensor_type())
            .field("producer", &self.producer)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
