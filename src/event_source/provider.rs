use super::filter::{BlockRange, EventFilter};
use super::record::EventRecord;
use super::schema::EventSource;
use crate::error::ScanError;
use async_trait::async_trait;

/// Read-only access to historical contract logs.
///
/// Implementations return records oldest-first (block number, then log index),
/// fail with `SchemaMismatch` when the filter does not fit the source's schema
/// and with `SourceUnreachable` when the backing node cannot be queried.
/// A start block past the chain head yields an empty result.
#[async_trait]
pub trait LogProvider: Send + Sync {
    async fn chain_head(&self) -> Result<u64, ScanError>;

    async fn query_logs(
        &self,
        source: &EventSource,
        filter: &EventFilter,
        range: BlockRange,
    ) -> Result<Vec<EventRecord>, ScanError>;
}
