//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `homectl.toml` in the working directory (or the file named by
//! `HOMECTL_CONFIG`). Every runtime setting has a sensible default so the
//! file is optional; environment variables take precedence over file values.
//!
//! The same file describes the deployment: `[[commands]]` and `[[sensors]]`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use homectl_app::data_logger::DataSource;
use homectl_domain::error::ValidationError;
use homectl_domain::id::SensorId;
use homectl_domain::sensor::{
    DistinctStates, Properties, SensorDefinition, SensorKind, SensorType,
};
use serde::Deserialize;

/// File read when `HOMECTL_CONFIG` is not set.
pub const DEFAULT_CONFIG_FILE: &str = "homectl.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Polling defaults.
    pub polling: PollingConfig,
    /// Rule engine settings.
    pub rules: RulesConfig,
    /// Time-series logging.
    pub data_logger: DataLoggerConfig,
    /// Commands of the deployment.
    pub commands: Vec<CommandConfig>,
    /// Sensors of the deployment.
    pub sensors: Vec<SensorConfig>,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Interval of polled sensors and shell listeners without their own.
    pub interval_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Directory of the `*.toml` rule files.
    pub dir: PathBuf,
    /// Globals set on every rule session.
    pub globals: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DataLoggerConfig {
    pub sources: Vec<DataSource>,
}

/// One command, keyed by the adapter implementing it.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum CommandConfig {
    Virtual(VirtualCommandConfig),
    Shell(ShellCommandConfig),
}

impl CommandConfig {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Virtual(config) => &config.name,
            Self::Shell(config) => &config.name,
        }
    }
}

fn default_device_kind() -> String {
    "switch".to_string()
}

fn default_action() -> String {
    homectl_adapter_virtual::STATUS_ACTION.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct VirtualCommandConfig {
    pub name: String,
    /// Simulated device name; commands naming the same device share it.
    pub device: String,
    /// `switch`, `level` or `text`.
    #[serde(default = "default_device_kind")]
    pub kind: String,
    /// `status`, `on`, `off`, `toggle` or `set:<value>`.
    #[serde(default = "default_action")]
    pub action: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShellCommandConfig {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub params: Option<String>,
    /// Regular expression applied to the output.
    #[serde(default)]
    pub pattern: Option<String>,
    /// `;`-separated sensor names, one per capture group.
    #[serde(default)]
    pub sensor_names: Option<String>,
    #[serde(default)]
    pub interval_ms: Option<u64>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// How a sensor gets its values from its command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorMode {
    /// The command pushes values.
    #[default]
    Listen,
    /// The sensor reads the command on an interval.
    Poll,
}

fn default_strict() -> bool {
    true
}

fn default_min() -> i32 {
    i32::MIN
}

fn default_max() -> i32 {
    i32::MAX
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    pub id: SensorId,
    pub name: String,
    #[serde(rename = "type")]
    pub sensor_type: SensorType,
    /// Name of the command producing the values.
    pub command: String,
    #[serde(default)]
    pub mode: SensorMode,
    /// Polling interval, for [`SensorMode::Poll`].
    #[serde(default)]
    pub interval_ms: Option<u64>,
    /// Lower bound of a range sensor.
    #[serde(default = "default_min")]
    pub min: i32,
    /// Upper bound of a range sensor.
    #[serde(default = "default_max")]
    pub max: i32,
    /// Accepted states of a custom sensor.
    #[serde(default)]
    pub states: Vec<String>,
    /// Display value per state, for switch and custom sensors.
    #[serde(default)]
    pub mapping: BTreeMap<String, String>,
    /// Whether a custom sensor rejects values outside its states.
    #[serde(default = "default_strict")]
    pub strict: bool,
    #[serde(default)]
    pub properties: Properties,
}

impl SensorConfig {
    /// Typed definition of this sensor.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] of the definition builder.
    pub fn definition(&self) -> Result<SensorDefinition, ValidationError> {
        let kind = match self.sensor_type {
            SensorType::Range => SensorKind::Range {
                min: self.min,
                max: self.max,
            },
            SensorType::Level => SensorKind::Level,
            SensorType::Switch => SensorKind::Switch {
                states: self.mapped(DistinctStates::switch()),
            },
            SensorType::Custom => SensorKind::Custom {
                states: self.mapped(
                    self.states
                        .iter()
                        .fold(DistinctStates::new(), |states, state| states.with_state(state)),
                ),
                strict: self.strict,
            },
        };
        let mut builder = SensorDefinition::builder()
            .id(self.id)
            .name(&self.name)
            .kind(kind);
        for (key, value) in &self.properties {
            builder = builder.property(key, value);
        }
        builder.build()
    }

    fn mapped(&self, states: DistinctStates) -> DistinctStates {
        self.mapping
            .iter()
            .fold(states, |states, (state, display)| states.with_mapping(state, display))
    }
}

impl Config {
    /// Load configuration from `path` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed or the
    /// result is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("HOMECTL_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("HOMECTL_RULES_DIR") {
            self.rules.dir = PathBuf::from(val);
        }
        if let Some(val) = var("HOMECTL_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    /// Check settings a deployment cannot detect on its own.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for a zero polling interval
    /// (global, per command or per sensor) and for a blank data source or
    /// command name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.interval_ms == 0 {
            return Err(ConfigError::Validation(
                "polling interval must be non-zero".to_string(),
            ));
        }
        if self
            .data_logger
            .sources
            .iter()
            .any(|source| source.name.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "data source names must not be empty".to_string(),
            ));
        }
        if self
            .commands
            .iter()
            .any(|command| command.name().trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "command names must not be empty".to_string(),
            ));
        }
        for command in &self.commands {
            if let CommandConfig::Shell(shell) = command
                && shell.interval_ms == Some(0)
            {
                return Err(ConfigError::Validation(format!(
                    "command {:?}: interval must be non-zero",
                    shell.name
                )));
            }
        }
        if let Some(sensor) = self.sensors.iter().find(|sensor| sensor.interval_ms == Some(0)) {
            return Err(ConfigError::Validation(format!(
                "sensor {:?}: interval must be non-zero",
                sensor.name
            )));
        }
        Ok(())
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    #[must_use]
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling.interval_ms)
    }
}

/// Path of the configuration file.
#[must_use]
pub fn config_path() -> PathBuf {
    std::env::var_os("HOMECTL_CONFIG").map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:homectl.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "homectld=info,homectl=info".to_string(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_ms: 500 }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("rules"),
            globals: BTreeMap::new(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use homectl_domain::event::Event;

    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.database.url, "sqlite:homectl.db?mode=rwc");
        assert_eq!(config.polling_interval(), Duration::from_millis(500));
        assert_eq!(config.rules.dir, PathBuf::from("rules"));
        assert!(config.commands.is_empty());
        assert!(config.sensors.is_empty());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.polling.interval_ms, 500);
    }

    #[test]
    fn should_parse_full_toml() {
        let config = Config::parse(
            r#"
            [database]
            url = 'sqlite:test.db'

            [logging]
            filter = 'debug'

            [polling]
            interval_ms = 250

            [rules]
            dir = '/etc/homectl/rules'
            globals = { threshold = '20' }

            [[data_logger.sources]]
            name = 'temperature'
            step_secs = 30

            [[commands]]
            protocol = 'virtual'
            name = 'lamp_on'
            device = 'lamp'
            action = 'on'

            [[commands]]
            protocol = 'shell'
            name = 'uptime'
            program = 'cat'
            params = '/proc/uptime'
            pattern = '^(\d+)'

            [[sensors]]
            id = 1
            name = 'uptime'
            type = 'range'
            command = 'uptime'
            min = 0
            max = 1000000
            "#,
        )
        .unwrap();

        assert_eq!(config.database.url, "sqlite:test.db");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.polling.interval_ms, 250);
        assert_eq!(config.rules.globals.get("threshold").map(String::as_str), Some("20"));
        assert_eq!(config.data_logger.sources, vec![DataSource::new("temperature", 30)]);
        assert_eq!(config.commands.len(), 2);
        assert!(matches!(&config.commands[0], CommandConfig::Virtual(c) if c.action == "on"));
        assert!(matches!(&config.commands[1], CommandConfig::Shell(c) if c.program == "cat"));
        assert_eq!(config.sensors[0].id, SensorId::new(1));
        assert_eq!(config.sensors[0].mode, SensorMode::Listen);
    }

    #[test]
    fn should_default_virtual_command_to_status() {
        let config = Config::parse(
            "
            [[commands]]
            protocol = 'virtual'
            name = 'lamp'
            device = 'lamp'
            ",
        )
        .unwrap();
        let CommandConfig::Virtual(command) = &config.commands[0] else {
            panic!("expected a virtual command");
        };
        assert_eq!(command.action, "status");
        assert_eq!(command.kind, "switch");
    }

    #[test]
    fn should_reject_unknown_protocol() {
        let result = Config::parse(
            "
            [[commands]]
            protocol = 'x10'
            name = 'lamp'
            ",
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file(Path::new("nonexistent.toml")).unwrap();
        assert_eq!(config.polling.interval_ms, 500);
    }

    #[test]
    fn should_apply_environment_overrides() {
        let env: HashMap<&str, &str> = [
            ("HOMECTL_DATABASE_URL", "sqlite::memory:"),
            ("HOMECTL_RULES_DIR", "/tmp/rules"),
            ("HOMECTL_LOG", "trace"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.database_url(), "sqlite::memory:");
        assert_eq!(config.rules.dir, PathBuf::from("/tmp/rules"));
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_prefer_rust_log_over_homectl_log() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "HOMECTL_LOG" => Some("warn".to_string()),
            "RUST_LOG" => Some("debug".to_string()),
            _ => None,
        });
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn should_reject_zero_polling_interval() {
        let mut config = Config::default();
        config.polling.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_sensor_interval() {
        let config = Config::parse(
            "
            [[sensors]]
            id = 1
            name = 'temperature'
            type = 'range'
            command = 'thermo'
            mode = 'poll'
            interval_ms = 0
            ",
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_zero_shell_interval() {
        let config = Config::parse(
            "
            [[commands]]
            protocol = 'shell'
            name = 'weather'
            program = 'curl'
            interval_ms = 0
            ",
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_accept_explicit_non_zero_intervals() {
        let config = Config::parse(
            "
            [[commands]]
            protocol = 'shell'
            name = 'weather'
            program = 'curl'
            interval_ms = 1000

            [[sensors]]
            id = 1
            name = 'temperature'
            type = 'range'
            command = 'weather'
            mode = 'poll'
            interval_ms = 250
            ",
        )
        .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_reject_blank_data_source_name() {
        let mut config = Config::default();
        config.data_logger.sources.push(DataSource::new(" ", 60));
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_accept_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn should_build_custom_definition_with_mapping() {
        let config = Config::parse(
            "
            [[sensors]]
            id = 3
            name = 'door'
            type = 'custom'
            command = 'door_status'
            states = ['open', 'closed']
            mapping = { open = 'Open' }
            ",
        )
        .unwrap();
        let definition = config.sensors[0].definition().unwrap();

        let SensorKind::Custom { states, strict } = definition.kind() else {
            panic!("expected a custom sensor");
        };
        assert!(*strict);
        assert_eq!(states.mapping("open"), Some("Open"));
        assert!(states.has_state("closed"));
        assert!(matches!(definition.process("open"), Event::Custom(_)));
    }

    #[test]
    fn should_reject_custom_sensor_without_states() {
        let config = Config::parse(
            "
            [[sensors]]
            id = 3
            name = 'door'
            type = 'custom'
            command = 'door_status'
            ",
        )
        .unwrap();
        assert!(matches!(
            config.sensors[0].definition(),
            Err(ValidationError::NoStates)
        ));
    }
}
