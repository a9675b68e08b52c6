//! `SQLite` implementation of [`SampleStore`].

use async_trait::async_trait;
use chrono::SecondsFormat;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use homectl_app::ports::SampleStore;
use homectl_domain::error::HomectlError;
use homectl_domain::sample::Sample;
use homectl_domain::time::Timestamp;

use crate::error::StorageError;

/// Wrapper for converting database rows into domain types without polluting
/// domain structs with database concerns.
struct Wrapper(Sample);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let source_name: String = row.try_get("source_name")?;
        let timestamp: String = row.try_get("timestamp")?;
        let value: f64 = row.try_get("value")?;

        let timestamp = chrono::DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|_| sqlx::Error::Decode(Box::new(StorageError::Timestamp(timestamp.clone()))))?
            .to_utc();

        Ok(Self(Sample {
            source_name,
            timestamp,
            value,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO samples (source_name, timestamp, value)
    VALUES (?, ?, ?)
";

const SELECT_BY_SOURCE_IN_RANGE: &str = r"
    SELECT source_name, timestamp, value FROM samples
    WHERE source_name = ? AND timestamp >= ? AND timestamp <= ?
    ORDER BY timestamp ASC, id ASC
";

/// Fixed-width form so text comparison follows time order.
fn encode(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `SQLite`-backed sample store.
#[derive(Debug, Clone)]
pub struct SqliteSampleStore {
    pool: SqlitePool,
}

impl SqliteSampleStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SampleStore for SqliteSampleStore {
    async fn record(&self, sample: Sample) -> Result<(), HomectlError> {
        sqlx::query(INSERT)
            .bind(&sample.source_name)
            .bind(encode(sample.timestamp))
            .bind(sample.value)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        tracing::trace!(source_name = %sample.source_name, value = sample.value, "sample recorded");
        Ok(())
    }

    async fn find_by_source(
        &self,
        source_name: &str,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Sample>, HomectlError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_SOURCE_IN_RANGE)
            .bind(source_name)
            .bind(encode(from))
            .bind(encode(to))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}
