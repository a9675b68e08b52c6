//! Simulated devices holding a single textual value.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use crate::error::VirtualError;

/// What values a [`VirtualDevice`] accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// `on` / `off`.
    Switch,
    /// Integer percentage in `[0, 100]`.
    Level,
    /// Any text.
    Text,
}

impl DeviceKind {
    fn initial_value(self) -> &'static str {
        match self {
            Self::Switch => "off",
            Self::Level => "0",
            Self::Text => "",
        }
    }
}

impl FromStr for DeviceKind {
    type Err = VirtualError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "switch" => Ok(Self::Switch),
            "level" => Ok(Self::Level),
            "text" => Ok(Self::Text),
            _ => Err(VirtualError::UnknownKind(s.to_string())),
        }
    }
}

/// A write applied to a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualAction {
    On,
    Off,
    Toggle,
    Set(String),
}

impl FromStr for VirtualAction {
    type Err = VirtualError;

    /// Parses `on`, `off`, `toggle` and `set:<value>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            "toggle" => Ok(Self::Toggle),
            other => other
                .strip_prefix("set:")
                .map(|value| Self::Set(value.to_string()))
                .ok_or_else(|| VirtualError::InvalidAction(s.to_string())),
        }
    }
}

impl std::fmt::Display for VirtualAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
            Self::Toggle => f.write_str("toggle"),
            Self::Set(value) => write!(f, "set:{value}"),
        }
    }
}

/// A simulated device.
///
/// The value lives in a `watch` channel so listeners can follow changes.
#[derive(Debug)]
pub struct VirtualDevice {
    name: String,
    kind: DeviceKind,
    value: watch::Sender<String>,
    reachable: AtomicBool,
}

impl VirtualDevice {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: DeviceKind) -> Self {
        let (value, _) = watch::channel(kind.initial_value().to_string());
        Self {
            name: name.into(),
            kind,
            value,
            reachable: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Simulate the device dropping off (or coming back to) the network.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Release);
    }

    /// Current value.
    ///
    /// # Errors
    ///
    /// Returns [`VirtualError::Unreachable`] while the device is unreachable.
    pub fn read(&self) -> Result<String, VirtualError> {
        if !self.reachable.load(Ordering::Acquire) {
            return Err(VirtualError::Unreachable(self.name.clone()));
        }
        Ok(self.value.borrow().clone())
    }

    /// Follow value changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.value.subscribe()
    }

    /// Apply an action.
    ///
    /// # Errors
    ///
    /// Returns [`VirtualError::Unreachable`] while the device is unreachable,
    /// [`VirtualError::UnsupportedAction`] for switch actions on non-switch
    /// devices and [`VirtualError::InvalidValue`] for values the device kind
    /// rejects.
    pub fn apply(&self, action: &VirtualAction) -> Result<(), VirtualError> {
        if !self.reachable.load(Ordering::Acquire) {
            return Err(VirtualError::Unreachable(self.name.clone()));
        }
        let next = match (self.kind, action) {
            (DeviceKind::Switch, VirtualAction::On) => "on".to_string(),
            (DeviceKind::Switch, VirtualAction::Off) => "off".to_string(),
            (DeviceKind::Switch, VirtualAction::Toggle) => {
                let toggled = if *self.value.borrow() == "on" { "off" } else { "on" };
                toggled.to_string()
            }
            (DeviceKind::Switch, VirtualAction::Set(value)) => match value.as_str() {
                "on" | "off" => value.clone(),
                _ => return Err(self.invalid_value(value)),
            },
            (DeviceKind::Level, VirtualAction::Set(value)) => match value.trim().parse::<i32>() {
                Ok(level) if (0..=100).contains(&level) => level.to_string(),
                _ => return Err(self.invalid_value(value)),
            },
            (DeviceKind::Text, VirtualAction::Set(value)) => value.clone(),
            (_, other) => {
                return Err(VirtualError::UnsupportedAction {
                    device: self.name.clone(),
                    action: other.to_string(),
                });
            }
        };
        self.value.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        Ok(())
    }

    fn invalid_value(&self, value: &str) -> VirtualError {
        VirtualError::InvalidValue {
            device: self.name.clone(),
            value: value.to_string(),
        }
    }
}
