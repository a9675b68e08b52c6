//! Data logger processor: records numeric sensor values as time-series
//! samples through a [`SampleStore`].

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use homectl_domain::error::HomectlError;
use homectl_domain::sample::Sample;
use homectl_domain::time::{self, Timestamp};
use serde::Deserialize;

use crate::ports::SampleStore;
use crate::processor::{EventContext, EventProcessor};

/// Smallest time between two samples of the same source.
pub const MIN_STEP: Duration = Duration::from_secs(1);

fn default_step_secs() -> u64 {
    60
}

/// A sensor whose values are recorded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DataSource {
    /// Sensor name.
    pub name: String,
    /// Minimum number of seconds between two samples.
    #[serde(default = "default_step_secs")]
    pub step_secs: u64,
}

impl DataSource {
    #[must_use]
    pub fn new(name: impl Into<String>, step_secs: u64) -> Self {
        Self {
            name: name.into(),
            step_secs,
        }
    }

    fn step(&self) -> Duration {
        Duration::from_secs(self.step_secs).max(MIN_STEP)
    }
}

/// Event processor recording samples of the configured sources.
#[derive(Debug)]
pub struct DataLogger<S> {
    store: S,
    steps: HashMap<String, Duration>,
    last_sample: Mutex<HashMap<String, Timestamp>>,
}

impl<S: SampleStore> DataLogger<S> {
    pub fn new(store: S, sources: impl IntoIterator<Item = DataSource>) -> Self {
        let steps = sources
            .into_iter()
            .map(|source| {
                let step = source.step();
                (source.name, step)
            })
            .collect();
        Self {
            store,
            steps,
            last_sample: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether a sample of `source` taken at `now` is due.
    fn is_due(&self, source: &str, step: Duration, now: Timestamp) -> bool {
        let last = self.last_sample.lock().unwrap_or_else(PoisonError::into_inner);
        last.get(source).is_none_or(|previous| {
            now.signed_duration_since(*previous)
                .to_std()
                .is_ok_and(|elapsed| elapsed >= step)
        })
    }

    fn mark(&self, source: &str, now: Timestamp) {
        self.last_sample
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(source.to_string(), now);
    }
}

#[async_trait]
impl<S: SampleStore> EventProcessor for DataLogger<S> {
    fn name(&self) -> &str {
        "data-logger"
    }

    async fn push(&self, ctx: &mut EventContext) -> Result<(), HomectlError> {
        let event = ctx.event();
        let source = event.source_name();
        let Some(step) = self.steps.get(source).copied() else {
            return Ok(());
        };
        let Some(value) = event
            .serialize()
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
        else {
            return Ok(());
        };
        let now = time::truncate_to_seconds(time::now());
        if !self.is_due(source, step, now) {
            return Ok(());
        }
        self.store.record(Sample::new(source, now, value)).await?;
        self.mark(source, now);
        tracing::trace!(source, value, "sample recorded");
        Ok(())
    }

    async fn stop(&self) -> Result<(), HomectlError> {
        self.last_sample
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use homectl_domain::event::{Range, Switch, SwitchState};
    use homectl_domain::id::SensorId;

    use super::*;

    #[derive(Default)]
    struct InMemorySampleStore {
        samples: Mutex<Vec<Sample>>,
    }

    #[async_trait]
    impl SampleStore for InMemorySampleStore {
        async fn record(&self, sample: Sample) -> Result<(), HomectlError> {
            self.samples.lock().unwrap().push(sample);
            Ok(())
        }

        async fn find_by_source(
            &self,
            source_name: &str,
            from: Timestamp,
            to: Timestamp,
        ) -> Result<Vec<Sample>, HomectlError> {
            Ok(self
                .samples
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.source_name == source_name && s.timestamp >= from && s.timestamp <= to)
                .cloned()
                .collect())
        }
    }

    fn temperature(value: i32) -> EventContext {
        EventContext::new(Range::new(SensorId::new(1), "temperature", value, -20, 100).into())
    }

    fn logger() -> DataLogger<InMemorySampleStore> {
        DataLogger::new(
            InMemorySampleStore::default(),
            [DataSource::new("temperature", 60)],
        )
    }

    #[tokio::test]
    async fn should_record_sample_when_source_is_configured() {
        let logger = logger();
        logger.push(&mut temperature(21)).await.unwrap();

        let samples = logger.store().samples.lock().unwrap().clone();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].source_name, "temperature");
        assert!((samples[0].value - 21.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn should_not_record_twice_within_step() {
        let logger = logger();
        logger.push(&mut temperature(21)).await.unwrap();
        logger.push(&mut temperature(22)).await.unwrap();
        assert_eq!(logger.store().samples.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_skip_unconfigured_sources() {
        let logger = logger();
        let mut ctx = EventContext::new(Range::new(SensorId::new(2), "humidity", 40, 0, 100).into());
        logger.push(&mut ctx).await.unwrap();
        assert!(logger.store().samples.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_skip_non_numeric_values_silently() {
        let logger = DataLogger::new(
            InMemorySampleStore::default(),
            [DataSource::new("lamp", 1)],
        );
        let mut ctx =
            EventContext::new(Switch::from_state(SensorId::new(3), "lamp", SwitchState::On).into());
        logger.push(&mut ctx).await.unwrap();
        assert!(logger.store().samples.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_record_again_after_restart() {
        let logger = logger();
        logger.push(&mut temperature(21)).await.unwrap();
        logger.stop().await.unwrap();
        logger.push(&mut temperature(22)).await.unwrap();
        assert_eq!(logger.store().samples.lock().unwrap().len(), 2);
    }
}
