//! Sample store port: append and query numeric time-series samples.

use std::sync::Arc;

use async_trait::async_trait;
use homectl_domain::error::HomectlError;
use homectl_domain::sample::Sample;
use homectl_domain::time::Timestamp;

/// Persistent time-series storage.
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Append a sample.
    ///
    /// # Errors
    ///
    /// Returns [`HomectlError::Storage`] when the sample could not be written.
    async fn record(&self, sample: Sample) -> Result<(), HomectlError>;

    /// All samples of a source within `[from, to]`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`HomectlError::Storage`] when the query fails.
    async fn find_by_source(
        &self,
        source_name: &str,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Sample>, HomectlError>;
}

#[async_trait]
impl<T: SampleStore + ?Sized> SampleStore for Arc<T> {
    async fn record(&self, sample: Sample) -> Result<(), HomectlError> {
        (**self).record(sample).await
    }

    async fn find_by_source(
        &self,
        source_name: &str,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Sample>, HomectlError> {
        (**self).find_by_source(source_name, from, to).await
    }
}
