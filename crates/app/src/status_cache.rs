//! Status cache: the terminal store of the latest event of every sensor.
//!
//! Every update first runs through the [`EventProcessorChain`]; unless a
//! processor terminated it, the event then becomes the latest value of its
//! sensor. Readers get the latest value, wait for the next change of one
//! sensor, or subscribe to every change.
//!
//! Each sensor has its own `watch` channel, so waiting for a change never
//! polls and never blocks writers of other sensors.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use homectl_domain::error::{HomectlError, NotFoundError};
use homectl_domain::event::{Event, UNKNOWN_STATUS, Unknown};
use homectl_domain::id::SensorId;
use tokio::sync::{broadcast, watch};

use crate::event_bus::ChangeBus;
use crate::processor::{EventContext, EventProcessorChain, LifeCycleContext};

/// Longest time a client may wait for a change.
pub const MAX_WAIT: Duration = Duration::from_secs(50);

/// Latest event per sensor, fed through the processor chain.
#[derive(Debug)]
pub struct StatusCache {
    chain: EventProcessorChain,
    entries: RwLock<HashMap<SensorId, watch::Sender<Arc<Event>>>>,
    names: RwLock<HashMap<String, SensorId>>,
    changes: ChangeBus,
    shutting_down: AtomicBool,
}

impl StatusCache {
    #[must_use]
    pub fn new(chain: EventProcessorChain) -> Self {
        Self {
            chain,
            entries: RwLock::default(),
            names: RwLock::default(),
            changes: ChangeBus::default(),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Start the processors for a new deployment generation.
    pub async fn start(&self, ctx: &LifeCycleContext) {
        self.chain.start(ctx).await;
    }

    /// Declare a sensor, seeding its entry with an unknown value.
    ///
    /// Registering an id twice logs an error and replaces the entry;
    /// clients waiting on the old entry return with its last value.
    pub fn register_sensor(&self, id: SensorId, name: &str) {
        let seed = Arc::new(Event::from(Unknown::new(id, name)));
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.insert(id, watch::channel(seed).0).is_some() {
            tracing::error!(sensor_id = %id, sensor_name = name, "sensor registered twice");
        }
        drop(entries);
        self.names
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), id);
    }

    /// Process an event and make it the latest value of its sensor.
    ///
    /// Ignored while the cache is shutting down. An event equal to the
    /// current value does not wake waiters nor subscribers.
    pub async fn update(&self, event: Event) {
        if self.shutting_down.load(Ordering::Acquire) {
            tracing::debug!(event = %event, "cache shutting down, update ignored");
            return;
        }
        let mut ctx = EventContext::new(event);
        self.chain.push(&mut ctx).await;
        if ctx.is_terminated() {
            return;
        }
        self.store(ctx.into_event());
    }

    fn store(&self, event: Arc<Event>) {
        let id = event.source_id();
        let changed = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            match entries.get(&id) {
                Some(sender) => sender.send_if_modified(|current| {
                    if current.is_equal(&event) {
                        false
                    } else {
                        *current = Arc::clone(&event);
                        true
                    }
                }),
                None => {
                    entries.insert(id, watch::channel(Arc::clone(&event)).0);
                    true
                }
            }
        };
        if changed {
            tracing::trace!(event = %event, "status changed");
            self.changes.publish(Event::clone(&event));
        }
    }

    /// Latest event of a sensor.
    #[must_use]
    pub fn get(&self, id: SensorId) -> Option<Event> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .map(|sender| Event::clone(&sender.borrow()))
    }

    /// Latest event of a sensor, looked up by name.
    ///
    /// # Errors
    ///
    /// Returns [`HomectlError::NotFound`] when no sensor has that name.
    pub fn get_by_name(&self, name: &str) -> Result<Event, HomectlError> {
        let id = self
            .names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied();
        id.and_then(|id| self.get(id)).ok_or_else(|| {
            NotFoundError {
                entity: "Sensor",
                id: name.to_string(),
            }
            .into()
        })
    }

    /// Serialized latest value, `"N/A"` for an unknown sensor.
    #[must_use]
    pub fn query_status(&self, id: SensorId) -> String {
        self.get(id)
            .map_or_else(|| UNKNOWN_STATUS.to_string(), |event| event.serialize())
    }

    #[must_use]
    pub fn query_statuses(&self, ids: &[SensorId]) -> BTreeMap<SensorId, String> {
        ids.iter().map(|id| (*id, self.query_status(*id))).collect()
    }

    /// Latest event of every sensor, ordered by id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Event> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut events: Vec<Event> = entries
            .values()
            .map(|sender| Event::clone(&sender.borrow()))
            .collect();
        events.sort_by_key(Event::source_id);
        events
    }

    /// Wait for the next change of a sensor, at most `timeout`
    /// (capped to [`MAX_WAIT`]).
    ///
    /// Returns the new value as soon as it is stored, or the latest known
    /// value when the timeout elapses. Returns `None` for an unknown sensor.
    pub async fn await_change(&self, id: SensorId, timeout: Duration) -> Option<Event> {
        let mut receiver = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .map(watch::Sender::subscribe)?;
        let _ = tokio::time::timeout(timeout.min(MAX_WAIT), receiver.changed()).await;
        let latest = Event::clone(&receiver.borrow());
        Some(latest)
    }

    /// Subscribe to every accepted change.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.changes.subscribe()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop the processors and forget every value.
    ///
    /// Updates arriving meanwhile are ignored. The cache accepts updates
    /// again once this returns.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        self.chain.stop().await;
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.names
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.shutting_down.store(false, Ordering::Release);
        tracing::info!("status cache cleared");
    }
}
