//! # homectl-adapter-shell
//!
//! Command adapter running local programs.
//!
//! A [`ShellCommand`] can be used as a write command, read as a status
//! command, or act as an event listener polling the program for every
//! sensor registered on it.
//!
//! ## Dependency rule
//!
//! Depends on `homectl-app` (port traits and polling) and `homectl-domain`
//! only.

mod args;
mod command;
mod error;

pub use command::{
    DEFAULT_INTERVAL, DEFAULT_TIMEOUT, SENSOR_NAME_SEPARATOR, ShellCommand, ShellCommandBuilder,
};
pub use error::ShellError;
