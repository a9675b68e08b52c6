//! Controller: owns the running deployment generation.
//!
//! A deployment builds a new generation first; only when that succeeds is the
//! previous one torn down (sensors stopped, processors stopped, cache
//! cleared) and the new one started. A failed build leaves the running
//! generation untouched.

use std::sync::Arc;

use homectl_domain::error::HomectlError;
use tokio::sync::Mutex;

use crate::ports::{Deployment, ModelBuilder};
use crate::processor::LifeCycleContext;
use crate::status_cache::StatusCache;

/// Lifecycle owner of sensors, commands and the status cache.
#[derive(Debug)]
pub struct Controller {
    cache: Arc<StatusCache>,
    current: Mutex<Option<Deployment>>,
}

impl Controller {
    #[must_use]
    pub fn new(cache: Arc<StatusCache>) -> Self {
        Self {
            cache,
            current: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<StatusCache> {
        &self.cache
    }

    /// Build and start a new generation, replacing the running one.
    ///
    /// # Errors
    ///
    /// Returns the build error; the previous generation keeps running.
    pub async fn deploy(&self, builder: &dyn ModelBuilder) -> Result<(), HomectlError> {
        let mut current = self.current.lock().await;
        let next = builder.build(&self.cache)?;
        next.validate()?;

        if let Some(previous) = current.take() {
            stop_sensors(&previous).await;
        }
        self.cache.shutdown().await;

        self.cache
            .start(&LifeCycleContext::new(next.commands.clone()))
            .await;
        for sensor in &next.sensors {
            self.cache.register_sensor(sensor.id(), sensor.name());
        }
        for sensor in &next.sensors {
            sensor.start();
        }
        tracing::info!(
            sensors = next.sensors.len(),
            commands = next.commands.len(),
            "deployment started"
        );
        *current = Some(next);
        Ok(())
    }

    /// Stop the running generation, if any.
    pub async fn shutdown(&self) {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            stop_sensors(&previous).await;
        }
        self.cache.shutdown().await;
        tracing::info!("controller stopped");
    }

    /// Send a write command of the running generation.
    ///
    /// # Errors
    ///
    /// Returns [`HomectlError::NotFound`] when no command has that name
    /// (including when nothing is deployed).
    pub async fn execute(&self, command: &str) -> Result<(), HomectlError> {
        let commands = {
            let current = self.current.lock().await;
            current
                .as_ref()
                .map(|deployment| deployment.commands.clone())
                .unwrap_or_default()
        };
        commands.execute(command).await
    }

    /// Number of sensors in the running generation.
    pub async fn sensor_count(&self) -> usize {
        self.current
            .lock()
            .await
            .as_ref()
            .map_or(0, |deployment| deployment.sensors.len())
    }
}

async fn stop_sensors(deployment: &Deployment) {
    for sensor in &deployment.sensors {
        sensor.stop().await;
    }
    tracing::info!(sensors = deployment.sensors.len(), "deployment stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use homectl_domain::error::{DeploymentError, ValidationError};
    use homectl_domain::id::SensorId;
    use homectl_domain::sensor::{SensorDefinition, SensorKind};

    use super::*;
    use crate::commands::CommandFacade;
    use crate::ports::{EventListener, EventProducer, ExecutableCommand};
    use crate::processor::EventProcessorChain;
    use crate::sensor::Sensor;

    #[derive(Default)]
    struct RecordingListener {
        registered: StdMutex<Vec<SensorId>>,
    }

    #[async_trait]
    impl EventListener for RecordingListener {
        fn set_sensor(&self, sensor: Arc<Sensor>) -> Result<(), HomectlError> {
            self.registered.lock().unwrap().push(sensor.id());
            Ok(())
        }

        async fn stop(&self, sensor: &Sensor) {
            self.registered.lock().unwrap().retain(|id| *id != sensor.id());
        }
    }

    #[derive(Default)]
    struct CountingCommand {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl ExecutableCommand for CountingCommand {
        async fn send(&self) {
            self.sent.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FnBuilder<F>(F);

    fn builder<F>(build: F) -> FnBuilder<F>
    where
        F: Fn(&Arc<StatusCache>) -> Result<Deployment, HomectlError> + Send + Sync,
    {
        FnBuilder(build)
    }

    impl<F> ModelBuilder for FnBuilder<F>
    where
        F: Fn(&Arc<StatusCache>) -> Result<Deployment, HomectlError> + Send + Sync,
    {
        fn build(&self, cache: &Arc<StatusCache>) -> Result<Deployment, HomectlError> {
            (self.0)(cache)
        }
    }

    fn sensor(
        id: u32,
        name: &str,
        listener: &Arc<RecordingListener>,
        cache: &Arc<StatusCache>,
    ) -> Arc<Sensor> {
        let definition = SensorDefinition::builder()
            .id(SensorId::new(id))
            .name(name)
            .kind(SensorKind::Level)
            .build()
            .unwrap();
        Arc::new(Sensor::new(
            definition,
            EventProducer::Listener(listener.clone()),
            Arc::clone(cache),
        ))
    }

    fn controller() -> Controller {
        Controller::new(Arc::new(StatusCache::new(EventProcessorChain::default())))
    }

    #[tokio::test]
    async fn should_register_and_start_sensors_when_deployed() {
        let controller = controller();
        let listener = Arc::new(RecordingListener::default());
        let model = builder(|cache| {
            Ok(Deployment {
                commands: CommandFacade::default(),
                sensors: vec![sensor(1, "dimmer", &listener, cache)],
            })
        });

        controller.deploy(&model).await.unwrap();

        assert_eq!(*listener.registered.lock().unwrap(), vec![SensorId::new(1)]);
        assert!(controller.cache().get(SensorId::new(1)).unwrap().is_unknown());
        assert_eq!(controller.sensor_count().await, 1);
    }

    #[tokio::test]
    async fn should_keep_previous_generation_when_build_fails() {
        let controller = controller();
        let listener = Arc::new(RecordingListener::default());
        let good = builder(|cache| {
            Ok(Deployment {
                commands: CommandFacade::default(),
                sensors: vec![sensor(1, "dimmer", &listener, cache)],
            })
        });
        let bad = builder(|_| Err(ValidationError::EmptyName.into()));

        controller.deploy(&good).await.unwrap();
        let result = controller.deploy(&bad).await;

        assert!(result.is_err());
        assert_eq!(controller.sensor_count().await, 1);
        assert_eq!(listener.registered.lock().unwrap().len(), 1);
        assert!(controller.cache().get(SensorId::new(1)).is_some());
    }

    #[tokio::test]
    async fn should_stop_previous_sensors_when_redeployed() {
        let controller = controller();
        let listener = Arc::new(RecordingListener::default());
        let first = builder(|cache| {
            Ok(Deployment {
                commands: CommandFacade::default(),
                sensors: vec![sensor(1, "old", &listener, cache)],
            })
        });
        let second = builder(|cache| {
            Ok(Deployment {
                commands: CommandFacade::default(),
                sensors: vec![sensor(2, "new", &listener, cache)],
            })
        });

        controller.deploy(&first).await.unwrap();
        controller.deploy(&second).await.unwrap();

        assert_eq!(*listener.registered.lock().unwrap(), vec![SensorId::new(2)]);
        assert!(controller.cache().get(SensorId::new(1)).is_none());
        assert!(controller.cache().get_by_name("new").is_ok());
    }

    #[tokio::test]
    async fn should_reject_generation_with_duplicate_sensor_ids() {
        let controller = controller();
        let listener = Arc::new(RecordingListener::default());
        let model = builder(|cache| {
            Ok(Deployment {
                commands: CommandFacade::default(),
                sensors: vec![
                    sensor(1, "a", &listener, cache),
                    sensor(1, "b", &listener, cache),
                ],
            })
        });

        let err = controller.deploy(&model).await.unwrap_err();

        assert!(matches!(
            err,
            HomectlError::Deployment(DeploymentError::DuplicateSensor(id)) if id == SensorId::new(1)
        ));
        assert!(listener.registered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_execute_commands_of_running_generation() {
        let controller = controller();
        let heater = Arc::new(CountingCommand::default());
        let commands = CommandFacade::builder()
            .command("heater_on", heater.clone())
            .build()
            .unwrap();
        let model = builder(move |_| {
            Ok(Deployment {
                commands: commands.clone(),
                sensors: Vec::new(),
            })
        });

        assert!(controller.execute("heater_on").await.is_err());
        controller.deploy(&model).await.unwrap();
        controller.execute("heater_on").await.unwrap();

        assert_eq!(heater.sent.load(Ordering::SeqCst), 1);
        assert!(matches!(
            controller.execute("unknown").await,
            Err(HomectlError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn should_stop_everything_when_shut_down() {
        let controller = controller();
        let listener = Arc::new(RecordingListener::default());
        let model = builder(|cache| {
            Ok(Deployment {
                commands: CommandFacade::default(),
                sensors: vec![sensor(1, "dimmer", &listener, cache)],
            })
        });
        controller.deploy(&model).await.unwrap();

        controller.shutdown().await;

        assert!(listener.registered.lock().unwrap().is_empty());
        assert!(controller.cache().is_empty());
        assert_eq!(controller.sensor_count().await, 0);
    }
}
