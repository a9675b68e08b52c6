//! Failures of the sample database.

use homectl_domain::error::HomectlError;

/// Raised while opening the database or reading and writing samples.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Connection or query failure reported by sqlx.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// The bundled schema could not be applied.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored timestamp could not be parsed.
    #[error("invalid stored timestamp {0:?}")]
    Timestamp(String),
}

impl From<StorageError> for HomectlError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
