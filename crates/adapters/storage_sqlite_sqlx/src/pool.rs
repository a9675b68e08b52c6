//! Opens the sample database and brings its schema up to date.

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;

use crate::error::StorageError;
use crate::sample_store::SqliteSampleStore;

/// Where the sample database lives.
#[derive(Debug, Clone)]
pub struct Config {
    /// `SQLite` connection URL (e.g. `sqlite:homectl.db` or `sqlite::memory:`).
    pub database_url: String,
}

impl Config {
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Open the database, creating the file on first use, and apply the
    /// bundled migrations.
    ///
    /// # Errors
    ///
    /// Fails when the URL is not a `SQLite` URL, the file cannot be opened,
    /// or a migration is rejected.
    pub async fn build(self) -> Result<Database, StorageError> {
        Database::initialize(&self.database_url).await
    }
}

/// Open sample database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn initialize(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!(database_url, "sample database ready");

        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Sample store sharing this pool.
    #[must_use]
    pub fn sample_store(&self) -> SqliteSampleStore {
        SqliteSampleStore::new(self.pool.clone())
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_create_pool_and_run_migrations_when_using_memory_db() {
        let db = Config::new("sqlite::memory:").build().await.unwrap();

        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name='samples'")
                .fetch_all(db.pool())
                .await
                .unwrap();

        assert_eq!(tables.len(), 1);
    }

    #[tokio::test]
    async fn should_fail_when_url_is_invalid() {
        let result = Config::new("postgres://localhost/homectl").build().await;
        assert!(result.is_err());
    }
}
