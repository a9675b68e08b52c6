//! # homectl-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence for the time-series samples written by the data
//! logger.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let db = Config::new("sqlite:homectl.db").build().await?;
//! let store = db.sample_store();
//! ```
//!
//! ## Dependency rule
//!
//! Depends on `homectl-app` (the [`SampleStore`](homectl_app::ports::SampleStore)
//! port) and `homectl-domain`.

mod error;
mod pool;
mod sample_store;

pub use error::StorageError;
pub use pool::{Config, Database};
pub use sample_store::SqliteSampleStore;
