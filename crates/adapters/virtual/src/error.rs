use homectl_domain::error::HomectlError;

use crate::device::DeviceKind;

/// Errors raised by virtual devices.
#[derive(Debug, thiserror::Error)]
pub enum VirtualError {
    #[error("device {0:?} is unreachable")]
    Unreachable(String),

    #[error("unknown device kind {0:?}")]
    UnknownKind(String),

    #[error("device {device:?} is a {existing:?} device, not {requested:?}")]
    KindMismatch {
        device: String,
        existing: DeviceKind,
        requested: DeviceKind,
    },

    #[error("invalid action {0:?}")]
    InvalidAction(String),

    #[error("device {device:?} does not accept value {value:?}")]
    InvalidValue { device: String, value: String },

    #[error("device {device:?} does not support action {action:?}")]
    UnsupportedAction { device: String, action: String },
}

impl VirtualError {
    /// Convert into the domain error type.
    #[must_use]
    pub fn into_domain(self) -> HomectlError {
        HomectlError::Command(Box::new(self))
    }
}

impl From<VirtualError> for HomectlError {
    fn from(err: VirtualError) -> Self {
        err.into_domain()
    }
}
