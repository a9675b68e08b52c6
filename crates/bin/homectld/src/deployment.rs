//! Builds a deployment generation from the `[[commands]]` and `[[sensors]]`
//! sections of the configuration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use homectl_adapter_shell::ShellCommand;
use homectl_adapter_virtual::{STATUS_ACTION, VirtualDevices};
use homectl_app::commands::CommandFacade;
use homectl_app::ports::{
    Deployment, EventListener, EventProducer, ExecutableCommand, ModelBuilder, StatusCommand,
};
use homectl_app::sensor::Sensor;
use homectl_app::status_cache::StatusCache;
use homectl_domain::error::{DeploymentError, HomectlError};

use crate::config::{
    CommandConfig, Config, SensorConfig, SensorMode, ShellCommandConfig, VirtualCommandConfig,
};

/// One built command with the capabilities sensors may bind to.
struct Built {
    executable: Arc<dyn ExecutableCommand>,
    readable: Option<(Arc<dyn StatusCommand>, Arc<dyn EventListener>)>,
}

/// [`ModelBuilder`] over a parsed configuration.
///
/// Simulated devices live in the shared [`VirtualDevices`] registry so their
/// state survives redeployments.
#[derive(Debug)]
pub struct ConfigModelBuilder {
    commands: Vec<CommandConfig>,
    sensors: Vec<SensorConfig>,
    interval: Duration,
    devices: Arc<VirtualDevices>,
}

impl ConfigModelBuilder {
    #[must_use]
    pub fn new(config: &Config, devices: Arc<VirtualDevices>) -> Self {
        Self {
            commands: config.commands.clone(),
            sensors: config.sensors.clone(),
            interval: config.polling_interval(),
            devices,
        }
    }

    fn build_command(&self, config: &CommandConfig) -> Result<Built, HomectlError> {
        match config {
            CommandConfig::Virtual(config) => self.build_virtual(config),
            CommandConfig::Shell(config) => Ok(self.build_shell(config)?),
        }
    }

    fn build_virtual(&self, config: &VirtualCommandConfig) -> Result<Built, HomectlError> {
        let command = Arc::new(self.devices.command(
            &config.device,
            config.kind.parse()?,
            &config.action,
        )?);
        // only status commands feed sensors
        let readable = (config.action.trim() == STATUS_ACTION).then(|| {
            (
                Arc::clone(&command) as Arc<dyn StatusCommand>,
                Arc::clone(&command) as Arc<dyn EventListener>,
            )
        });
        Ok(Built {
            executable: command,
            readable,
        })
    }

    fn build_shell(
        &self,
        config: &ShellCommandConfig,
    ) -> Result<Built, homectl_adapter_shell::ShellError> {
        let mut builder = ShellCommand::builder().program(&config.program).interval(
            config
                .interval_ms
                .map_or(self.interval, Duration::from_millis),
        );
        if let Some(params) = &config.params {
            builder = builder.params(params);
        }
        if let Some(pattern) = &config.pattern {
            builder = builder.pattern(pattern);
        }
        if let Some(names) = &config.sensor_names {
            builder = builder.sensor_names(names);
        }
        if let Some(timeout) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout));
        }
        let command = Arc::new(builder.build()?);
        Ok(Built {
            executable: Arc::clone(&command) as Arc<dyn ExecutableCommand>,
            readable: Some((
                Arc::clone(&command) as Arc<dyn StatusCommand>,
                command as Arc<dyn EventListener>,
            )),
        })
    }

    fn build_sensor(
        &self,
        config: &SensorConfig,
        built: &HashMap<&str, Built>,
        cache: &Arc<StatusCache>,
    ) -> Result<Arc<Sensor>, DeploymentError> {
        let definition = config
            .definition()
            .map_err(|source| DeploymentError::InvalidSensor {
                sensor: config.id,
                source,
            })?;
        let command = built
            .get(config.command.as_str())
            .ok_or_else(|| DeploymentError::UnknownCommand {
                sensor: config.id,
                command: config.command.clone(),
            })?;
        let (status, listener) =
            command
                .readable
                .as_ref()
                .ok_or_else(|| DeploymentError::NotAProducer {
                    sensor: config.id,
                    command: config.command.clone(),
                })?;
        let producer = match config.mode {
            SensorMode::Listen => EventProducer::Listener(Arc::clone(listener)),
            SensorMode::Poll => EventProducer::Status(Arc::clone(status)),
        };
        let interval = config
            .interval_ms
            .map_or(self.interval, Duration::from_millis);
        Ok(Arc::new(
            Sensor::new(definition, producer, Arc::clone(cache)).with_interval(interval),
        ))
    }
}

impl ModelBuilder for ConfigModelBuilder {
    fn build(&self, cache: &Arc<StatusCache>) -> Result<Deployment, HomectlError> {
        let mut built = HashMap::with_capacity(self.commands.len());
        let mut facade = CommandFacade::builder();
        for config in &self.commands {
            let command = self.build_command(config)?;
            facade = facade.command(config.name(), Arc::clone(&command.executable));
            built.insert(config.name(), command);
        }
        let commands = facade.build()?;

        let sensors = self
            .sensors
            .iter()
            .map(|config| self.build_sensor(config, &built, cache))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            commands = commands.len(),
            sensors = sensors.len(),
            "deployment built"
        );
        Ok(Deployment { commands, sensors })
    }
}

#[cfg(test)]
mod tests {
    use homectl_app::processor::EventProcessorChain;
    use homectl_domain::id::SensorId;

    use super::*;

    fn cache() -> Arc<StatusCache> {
        Arc::new(StatusCache::new(EventProcessorChain::default()))
    }

    fn builder(toml: &str) -> ConfigModelBuilder {
        ConfigModelBuilder::new(
            &Config::parse(toml).unwrap(),
            Arc::new(VirtualDevices::new()),
        )
    }

    const LAMP: &str = "
        [[commands]]
        protocol = 'virtual'
        name = 'lamp_status'
        device = 'lamp'

        [[commands]]
        protocol = 'virtual'
        name = 'lamp_on'
        device = 'lamp'
        action = 'on'
    ";

    #[test]
    fn should_build_commands_and_sensors() {
        let toml = format!(
            "{LAMP}
            [[sensors]]
            id = 1
            name = 'lamp'
            type = 'switch'
            command = 'lamp_status'
            "
        );
        let deployment = builder(&toml).build(&cache()).unwrap();

        assert_eq!(deployment.commands.len(), 2);
        assert!(deployment.commands.contains("lamp_on"));
        assert_eq!(deployment.sensors.len(), 1);
        assert_eq!(deployment.sensors[0].id(), SensorId::new(1));
    }

    #[test]
    fn should_fail_when_sensor_references_unknown_command() {
        let toml = "
            [[sensors]]
            id = 1
            name = 'lamp'
            type = 'switch'
            command = 'missing'
        ";
        let err = builder(toml).build(&cache()).unwrap_err();
        assert!(matches!(
            err,
            HomectlError::Deployment(DeploymentError::UnknownCommand { .. })
        ));
    }

    #[test]
    fn should_fail_when_sensor_binds_write_command() {
        let toml = format!(
            "{LAMP}
            [[sensors]]
            id = 1
            name = 'lamp'
            type = 'switch'
            command = 'lamp_on'
            "
        );
        let err = builder(&toml).build(&cache()).unwrap_err();
        assert!(matches!(
            err,
            HomectlError::Deployment(DeploymentError::NotAProducer { .. })
        ));
    }

    #[test]
    fn should_fail_when_command_name_is_repeated() {
        let toml = "
            [[commands]]
            protocol = 'virtual'
            name = 'lamp'
            device = 'lamp'

            [[commands]]
            protocol = 'shell'
            name = 'lamp'
            program = 'true'
        ";
        let err = builder(toml).build(&cache()).unwrap_err();
        assert!(matches!(
            err,
            HomectlError::Deployment(DeploymentError::DuplicateCommand(_))
        ));
    }

    #[test]
    fn should_fail_when_virtual_action_is_invalid() {
        let toml = "
            [[commands]]
            protocol = 'virtual'
            name = 'lamp'
            device = 'lamp'
            action = 'blink'
        ";
        let err = builder(toml).build(&cache()).unwrap_err();
        assert!(matches!(err, HomectlError::Command(_)));
    }

    #[test]
    fn should_fail_when_sensor_definition_is_invalid() {
        let toml = format!(
            "{LAMP}
            [[sensors]]
            id = 1
            name = ' '
            type = 'switch'
            command = 'lamp_status'
            "
        );
        let err = builder(&toml).build(&cache()).unwrap_err();
        assert!(matches!(
            err,
            HomectlError::Deployment(DeploymentError::InvalidSensor { .. })
        ));
    }
}
