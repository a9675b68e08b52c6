//! The shell-exec command.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use homectl_app::polling::{PollingGroup, PollingWorker, SensorSet};
use homectl_app::ports::{EventListener, ExecutableCommand, StatusCommand};
use homectl_app::sensor::Sensor;
use homectl_domain::error::HomectlError;
use homectl_domain::event::UNKNOWN_STATUS;
use homectl_domain::sensor::{Properties, SensorType};
use regex::Regex;
use tokio::process::Command;

use crate::args;
use crate::error::ShellError;

/// Polling interval used when none is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Maximum run time of one invocation when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Separator of the sensor name list.
pub const SENSOR_NAME_SEPARATOR: char = ';';

#[derive(Debug)]
struct Invocation {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Invocation {
    /// Run the program and return its standard output, lines joined with `\n`.
    async fn run(&self) -> Result<String, ShellError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ShellError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // dropping the child on timeout kills the process
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ShellError::Timeout {
                program: self.program.clone(),
                timeout: self.timeout,
            })?
            .map_err(|source| ShellError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ShellError::Status {
                program: self.program.clone(),
                status: output.status.to_string(),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let result = stdout.lines().collect::<Vec<_>>().join("\n");
        tracing::debug!(program = %self.program, output = %result, "shell command returned");
        Ok(result)
    }
}

/// How an output is dispatched to sensors.
#[derive(Debug, PartialEq)]
enum Fanout<'a> {
    Everyone(&'a str),
    ByName(HashMap<&'a str, &'a str>),
}

#[derive(Debug)]
struct Extractor {
    pattern: Option<Regex>,
    sensor_names: Vec<String>,
}

impl Extractor {
    fn fanout<'a>(&'a self, output: &'a str) -> Fanout<'a> {
        let Some(pattern) = &self.pattern else {
            return Fanout::Everyone(output);
        };
        let Some(captures) = pattern.captures(output) else {
            tracing::info!(pattern = %pattern, "output did not match");
            return Fanout::Everyone(UNKNOWN_STATUS);
        };
        if self.sensor_names.is_empty() {
            let value = captures
                .get(1)
                .or_else(|| captures.get(0))
                .map_or(UNKNOWN_STATUS, |m| m.as_str());
            return Fanout::Everyone(value);
        }
        Fanout::ByName(
            self.sensor_names
                .iter()
                .enumerate()
                .map(|(index, name)| {
                    let value = captures.get(index + 1).map_or(UNKNOWN_STATUS, |m| m.as_str());
                    (name.as_str(), value)
                })
                .collect(),
        )
    }

    /// Single value for a plain status read.
    fn first<'a>(&'a self, output: &'a str) -> &'a str {
        match self.fanout(output) {
            Fanout::Everyone(value) => value,
            Fanout::ByName(values) => self
                .sensor_names
                .first()
                .and_then(|name| values.get(name.as_str()).copied())
                .unwrap_or(UNKNOWN_STATUS),
        }
    }
}

/// Runs a program.
///
/// - as [`ExecutableCommand`] every `send` runs it once
/// - as [`StatusCommand`] every `read` runs it once
/// - as [`EventListener`] one shared worker runs it every interval and fans
///   the output out to every registered sensor
///
/// With a pattern, the output is matched against it: capture group `n` goes
/// to the `n`-th configured sensor name, or group 1 (else the whole match)
/// to every sensor when no names are configured. When the output does not
/// match, every sensor receives `"N/A"`.
pub struct ShellCommand {
    invocation: Arc<Invocation>,
    extractor: Arc<Extractor>,
    interval: Duration,
    group: PollingGroup,
}

impl ShellCommand {
    #[must_use]
    pub fn builder() -> ShellCommandBuilder {
        ShellCommandBuilder::default()
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.invocation.program
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the shared polling worker is running.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.group.is_running()
    }

    fn spawn_worker(&self, sensors: Arc<SensorSet>) -> PollingWorker {
        let invocation = Arc::clone(&self.invocation);
        let extractor = Arc::clone(&self.extractor);
        PollingWorker::spawn(format!("shell-{}", self.invocation.program), self.interval, move || {
            let invocation = Arc::clone(&invocation);
            let extractor = Arc::clone(&extractor);
            let sensors = Arc::clone(&sensors);
            async move {
                let output = match invocation.run().await {
                    Ok(output) => output,
                    Err(err) => {
                        tracing::error!(program = %invocation.program, %err, "shell command failed");
                        UNKNOWN_STATUS.to_string()
                    }
                };
                dispatch(&extractor, &output, &sensors.snapshot()).await;
                ControlFlow::Continue(())
            }
        })
    }
}

async fn dispatch(extractor: &Extractor, output: &str, sensors: &[Arc<Sensor>]) {
    match extractor.fanout(output) {
        Fanout::Everyone(value) => {
            for sensor in sensors {
                sensor.update(value).await;
            }
        }
        Fanout::ByName(values) => {
            for sensor in sensors {
                match values.get(sensor.name()) {
                    Some(value) => sensor.update(value).await,
                    None => tracing::debug!(
                        sensor_id = %sensor.id(),
                        sensor_name = sensor.name(),
                        "sensor not listed in capture names"
                    ),
                }
            }
        }
    }
}

impl std::fmt::Debug for ShellCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellCommand")
            .field("program", &self.invocation.program)
            .field("args", &self.invocation.args)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ExecutableCommand for ShellCommand {
    async fn send(&self) {
        if let Err(err) = self.invocation.run().await {
            tracing::error!(program = %self.invocation.program, %err, "shell command failed");
        }
    }
}

#[async_trait]
impl StatusCommand for ShellCommand {
    async fn read(
        &self,
        _sensor_type: SensorType,
        _properties: &Properties,
    ) -> Result<String, HomectlError> {
        let output = self.invocation.run().await?;
        Ok(self.extractor.first(&output).to_string())
    }
}

#[async_trait]
impl EventListener for ShellCommand {
    fn set_sensor(&self, sensor: Arc<Sensor>) -> Result<(), HomectlError> {
        tracing::debug!(program = %self.invocation.program, sensor_name = sensor.name(), "sensor registered");
        self.group.register(sensor, |sensors| self.spawn_worker(sensors));
        Ok(())
    }

    async fn stop(&self, sensor: &Sensor) {
        self.group.deregister(sensor.id()).await;
    }
}

/// Builder for [`ShellCommand`].
#[derive(Debug, Default)]
pub struct ShellCommandBuilder {
    program: Option<String>,
    args: Vec<String>,
    params: Option<String>,
    pattern: Option<String>,
    sensor_names: Vec<String>,
    interval: Option<Duration>,
    timeout: Option<Duration>,
}

impl ShellCommandBuilder {
    #[must_use]
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Arguments as one string, split on whitespace outside quotes.
    /// Appended after the ones given with [`ShellCommandBuilder::arg`].
    #[must_use]
    pub fn params(mut self, params: impl Into<String>) -> Self {
        self.params = Some(params.into());
        self
    }

    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// `;`-separated sensor names, one per capture group.
    #[must_use]
    pub fn sensor_names(mut self, names: &str) -> Self {
        self.sensor_names = names
            .split(SENSOR_NAME_SEPARATOR)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();
        self
    }

    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// # Errors
    ///
    /// Returns a [`ShellError`] when the program is missing, the parameters
    /// have an unbalanced quote or the pattern is invalid.
    pub fn build(self) -> Result<ShellCommand, ShellError> {
        let program = self
            .program
            .filter(|program| !program.trim().is_empty())
            .ok_or(ShellError::MissingProgram)?;
        let mut args = self.args;
        if let Some(params) = &self.params {
            args.extend(args::split(params)?);
        }
        let pattern = self.pattern.as_deref().map(Regex::new).transpose()?;

        Ok(ShellCommand {
            invocation: Arc::new(Invocation {
                program,
                args,
                timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            }),
            extractor: Arc::new(Extractor {
                pattern,
                sensor_names: self.sensor_names,
            }),
            interval: self.interval.unwrap_or(DEFAULT_INTERVAL),
            group: PollingGroup::new(),
        })
    }
}
