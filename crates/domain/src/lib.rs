//! # homectl-domain
//!
//! Pure domain model for the homectl controller runtime.
//!
//! ## Responsibilities
//! - Foundational types: integer identifiers, error conventions, timestamps
//! - Define **Events** (typed value snapshots: range, level, switch, custom state)
//! - Define **Sensor definitions** (identity + declared type) and the mapping
//!   from raw device values to typed events
//! - Define **Rules** (condition → action definitions loaded from rule files)
//! - Define **Samples** (numeric time-series points handed to persistence)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod event;
pub mod rule;
pub mod sample;
pub mod sensor;
