use async_trait::async_trait;
use bytes::Bytes;
use quire_types::{Key, Owner};

use crate::error::StoreResult;
use crate::record::{ChunkedMetadata, RecordValue, WriteReceipt};

/// Client for an append-only, size-capped ledger.
///
/// All implementations must satisfy these invariants:
/// - Records are never mutated. Every write appends a new version, and the
///   latest version is the one with the highest index.
/// - Identical keys under different owners are unrelated records.
/// - Reads of absent records return `Ok(None)`; `Err` is reserved for
///   transport failures and invalid requests.
/// - Writes are never retried implicitly.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Latest version of a direct record.
    async fn get_latest(&self, key: &Key, owner: &Owner) -> StoreResult<Option<RecordValue>>;

    /// A specific historical version of a direct record.
    async fn get_at_index(
        &self,
        key: &Key,
        owner: &Owner,
        index: u64,
    ) -> StoreResult<Option<RecordValue>>;

    /// Chunk count and label of a chunked record, at `index` or the latest
    /// version.
    async fn get_chunked_metadata(
        &self,
        key: &Key,
        owner: &Owner,
        index: Option<u64>,
    ) -> StoreResult<Option<ChunkedMetadata>>;

    /// Chunks `start..end` of a chunked record, in order.
    async fn get_chunks(
        &self,
        key: &Key,
        owner: &Owner,
        start: u32,
        end: u32,
        index: Option<u64>,
    ) -> StoreResult<Vec<Bytes>>;

    /// Append a new version of a direct record.
    async fn write(
        &self,
        key: &Key,
        owner: &Owner,
        label: &str,
        value: Bytes,
    ) -> StoreResult<WriteReceipt>;

    /// Append a new version of a chunked record.
    async fn write_chunked(
        &self,
        key: &Key,
        owner: &Owner,
        label: &str,
        chunks: Vec<Bytes>,
    ) -> StoreResult<WriteReceipt>;
}
