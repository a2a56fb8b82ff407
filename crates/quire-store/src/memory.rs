use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use quire_types::{Key, Owner};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::record::{ChunkedMetadata, RecordValue, WriteReceipt};
use crate::traits::LedgerClient;

/// Hard limits enforced by a ledger on every write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerLimits {
    /// Maximum size of a direct record's value.
    pub max_value_bytes: usize,
    /// Maximum size of a single chunk in a chunked record.
    pub max_chunk_bytes: usize,
    /// Maximum number of chunks in a chunked record.
    pub max_chunks: usize,
}

impl Default for LedgerLimits {
    fn default() -> Self {
        Self {
            max_value_bytes: 20_000,
            max_chunk_bytes: 20_000,
            max_chunks: 255,
        }
    }
}

type Address = (Key, Owner);

#[derive(Clone, Debug)]
struct ChunkedVersion {
    label: String,
    chunks: Vec<Bytes>,
}

/// In-memory, append-only ledger.
///
/// Intended for tests and embedding. Each `(key, owner)` address holds a
/// version vector for direct records and another for chunked records, behind
/// `RwLock`s for safe concurrent access. Read and write calls are counted so
/// tests can assert on round trips.
pub struct InMemoryLedger {
    limits: LedgerLimits,
    direct: RwLock<HashMap<Address, Vec<RecordValue>>>,
    chunked: RwLock<HashMap<Address, Vec<ChunkedVersion>>>,
    reads: AtomicU64,
    writes: AtomicU64,
    offline: AtomicBool,
}

impl InMemoryLedger {
    /// Create an empty ledger with default limits.
    pub fn new() -> Self {
        Self::with_limits(LedgerLimits::default())
    }

    /// Create an empty ledger enforcing the given limits.
    pub fn with_limits(limits: LedgerLimits) -> Self {
        Self {
            limits,
            direct: RwLock::new(HashMap::new()),
            chunked: RwLock::new(HashMap::new()),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            offline: AtomicBool::new(false),
        }
    }

    /// Number of read calls served so far.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of write calls accepted so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Simulate a transport outage: every call fails with
    /// [`StoreError::Backend`] while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of direct versions stored at an address.
    pub fn direct_versions(&self, key: &Key, owner: &Owner) -> usize {
        let map = self.direct.read().expect("lock poisoned");
        map.get(&(*key, owner.clone())).map_or(0, Vec::len)
    }

    /// Number of chunked versions stored at an address.
    pub fn chunked_versions(&self, key: &Key, owner: &Owner) -> usize {
        let map = self.chunked.read().expect("lock poisoned");
        map.get(&(*key, owner.clone())).map_or(0, Vec::len)
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("ledger unavailable".into()));
        }
        Ok(())
    }

    fn begin_read(&self) -> StoreResult<()> {
        self.check_online()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn chunked_version(
        &self,
        key: &Key,
        owner: &Owner,
        index: Option<u64>,
    ) -> Option<ChunkedVersion> {
        let map = self.chunked.read().expect("lock poisoned");
        let versions = map.get(&(*key, owner.clone()))?;
        match index {
            Some(i) => versions.get(usize::try_from(i).ok()?).cloned(),
            None => versions.last().cloned(),
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn get_latest(&self, key: &Key, owner: &Owner) -> StoreResult<Option<RecordValue>> {
        self.begin_read()?;
        let map = self.direct.read().expect("lock poisoned");
        Ok(map
            .get(&(*key, owner.clone()))
            .and_then(|versions| versions.last().cloned()))
    }

    async fn get_at_index(
        &self,
        key: &Key,
        owner: &Owner,
        index: u64,
    ) -> StoreResult<Option<RecordValue>> {
        self.begin_read()?;
        let map = self.direct.read().expect("lock poisoned");
        let Ok(index) = usize::try_from(index) else {
            return Ok(None);
        };
        Ok(map
            .get(&(*key, owner.clone()))
            .and_then(|versions| versions.get(index).cloned()))
    }

    async fn get_chunked_metadata(
        &self,
        key: &Key,
        owner: &Owner,
        index: Option<u64>,
    ) -> StoreResult<Option<ChunkedMetadata>> {
        self.begin_read()?;
        Ok(self
            .chunked_version(key, owner, index)
            .map(|version| ChunkedMetadata {
                chunk_count: version.chunks.len() as u32,
                label: version.label,
            }))
    }

    async fn get_chunks(
        &self,
        key: &Key,
        owner: &Owner,
        start: u32,
        end: u32,
        index: Option<u64>,
    ) -> StoreResult<Vec<Bytes>> {
        self.begin_read()?;
        let Some(version) = self.chunked_version(key, owner, index) else {
            return Err(StoreError::NotFound {
                key: *key,
                owner: owner.clone(),
            });
        };
        let count = version.chunks.len() as u32;
        if start > end || end > count {
            return Err(StoreError::InvalidRange { start, end, count });
        }
        Ok(version.chunks[start as usize..end as usize].to_vec())
    }

    async fn write(
        &self,
        key: &Key,
        owner: &Owner,
        label: &str,
        value: Bytes,
    ) -> StoreResult<WriteReceipt> {
        self.check_online()?;
        if value.len() > self.limits.max_value_bytes {
            return Err(StoreError::LimitExceeded(format!(
                "value of {} bytes exceeds {} byte limit",
                value.len(),
                self.limits.max_value_bytes
            )));
        }
        let mut map = self.direct.write().expect("lock poisoned");
        let versions = map.entry((*key, owner.clone())).or_default();
        versions.push(RecordValue::new(label, value));
        self.writes.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(key = %key, owner = %owner, version = versions.len() - 1, "direct write");
        Ok(WriteReceipt {
            key: *key,
            owner: owner.clone(),
            version_index: (versions.len() - 1) as u64,
        })
    }

    async fn write_chunked(
        &self,
        key: &Key,
        owner: &Owner,
        label: &str,
        chunks: Vec<Bytes>,
    ) -> StoreResult<WriteReceipt> {
        self.check_online()?;
        if chunks.is_empty() {
            return Err(StoreError::LimitExceeded(
                "chunked write must carry at least one chunk".into(),
            ));
        }
        if chunks.len() > self.limits.max_chunks {
            return Err(StoreError::LimitExceeded(format!(
                "{} chunks exceeds {} chunk limit",
                chunks.len(),
                self.limits.max_chunks
            )));
        }
        if let Some(oversized) = chunks
            .iter()
            .find(|c| c.len() > self.limits.max_chunk_bytes)
        {
            return Err(StoreError::LimitExceeded(format!(
                "chunk of {} bytes exceeds {} byte limit",
                oversized.len(),
                self.limits.max_chunk_bytes
            )));
        }
        let mut map = self.chunked.write().expect("lock poisoned");
        let versions = map.entry((*key, owner.clone())).or_default();
        versions.push(ChunkedVersion {
            label: label.to_string(),
            chunks,
        });
        self.writes.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(key = %key, owner = %owner, version = versions.len() - 1, "chunked write");
        Ok(WriteReceipt {
            key: *key,
            owner: owner.clone(),
            version_index: (versions.len() - 1) as u64,
        })
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let direct = self.direct.read().expect("lock poisoned").len();
        let chunked = self.chunked.read().expect("lock poisoned").len();
        f.debug_struct("InMemoryLedger")
            .field("direct_addresses", &direct)
            .field("chunked_addresses", &chunked)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> Key {
        Key::from_hash([byte; 32])
    }

    fn owner(id: &str) -> Owner {
        Owner::new(id).unwrap()
    }

    // -----------------------------------------------------------------------
    // Direct records
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn write_and_read_latest() {
        let ledger = InMemoryLedger::new();
        let receipt = ledger
            .write(&key(1), &owner("0xa"), "note", Bytes::from_static(b"v0"))
            .await
            .unwrap();
        assert_eq!(receipt.version_index, 0);

        let latest = ledger.get_latest(&key(1), &owner("0xa")).await.unwrap();
        assert_eq!(latest, Some(RecordValue::new("note", &b"v0"[..])));
    }

    #[tokio::test]
    async fn appends_versions_and_keeps_history() {
        let ledger = InMemoryLedger::new();
        for v in ["v0", "v1", "v2"] {
            ledger
                .write(&key(1), &owner("0xa"), "note", Bytes::from(v))
                .await
                .unwrap();
        }
        let latest = ledger.get_latest(&key(1), &owner("0xa")).await.unwrap();
        assert_eq!(latest.unwrap().value, Bytes::from("v2"));

        let first = ledger
            .get_at_index(&key(1), &owner("0xa"), 0)
            .await
            .unwrap();
        assert_eq!(first.unwrap().value, Bytes::from("v0"));
        assert!(ledger
            .get_at_index(&key(1), &owner("0xa"), 3)
            .await
            .unwrap()
            .is_none());
        assert_eq!(ledger.direct_versions(&key(1), &owner("0xa")), 3);
    }

    #[tokio::test]
    async fn owners_are_separate_namespaces() {
        let ledger = InMemoryLedger::new();
        ledger
            .write(&key(1), &owner("0xa"), "note", Bytes::from("a"))
            .await
            .unwrap();
        assert!(ledger
            .get_latest(&key(1), &owner("0xb"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn oversized_value_is_rejected() {
        let ledger = InMemoryLedger::with_limits(LedgerLimits {
            max_value_bytes: 4,
            ..LedgerLimits::default()
        });
        let err = ledger
            .write(&key(1), &owner("0xa"), "note", Bytes::from("12345"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::LimitExceeded(_)));
        assert!(!err.is_recoverable());
        assert_eq!(ledger.write_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Chunked records
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn chunked_roundtrip_with_ranges() {
        let ledger = InMemoryLedger::new();
        let chunks: Vec<Bytes> = ["a", "b", "c"].into_iter().map(Bytes::from).collect();
        ledger
            .write_chunked(&key(2), &owner("0xa"), "seg", chunks.clone())
            .await
            .unwrap();

        let meta = ledger
            .get_chunked_metadata(&key(2), &owner("0xa"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(meta.chunk_count, 3);
        assert_eq!(meta.label, "seg");
        assert!(!meta.is_empty());

        let all = ledger
            .get_chunks(&key(2), &owner("0xa"), 0, 3, None)
            .await
            .unwrap();
        assert_eq!(all, chunks);
        let tail = ledger
            .get_chunks(&key(2), &owner("0xa"), 1, 3, None)
            .await
            .unwrap();
        assert_eq!(tail, chunks[1..].to_vec());
    }

    #[tokio::test]
    async fn chunked_history_by_index() {
        let ledger = InMemoryLedger::new();
        ledger
            .write_chunked(&key(2), &owner("0xa"), "old", vec![Bytes::from("x")])
            .await
            .unwrap();
        ledger
            .write_chunked(
                &key(2),
                &owner("0xa"),
                "new",
                vec![Bytes::from("y"), Bytes::from("z")],
            )
            .await
            .unwrap();

        let old = ledger
            .get_chunked_metadata(&key(2), &owner("0xa"), Some(0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(old.chunk_count, 1);
        let old_chunks = ledger
            .get_chunks(&key(2), &owner("0xa"), 0, 1, Some(0))
            .await
            .unwrap();
        assert_eq!(old_chunks, vec![Bytes::from("x")]);
        assert_eq!(ledger.chunked_versions(&key(2), &owner("0xa")), 2);
    }

    #[tokio::test]
    async fn invalid_range_is_an_error() {
        let ledger = InMemoryLedger::new();
        ledger
            .write_chunked(&key(2), &owner("0xa"), "seg", vec![Bytes::from("x")])
            .await
            .unwrap();
        let err = ledger
            .get_chunks(&key(2), &owner("0xa"), 0, 2, None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::InvalidRange {
                start: 0,
                end: 2,
                count: 1
            }
        );
    }

    #[tokio::test]
    async fn missing_chunked_record() {
        let ledger = InMemoryLedger::new();
        assert!(ledger
            .get_chunked_metadata(&key(9), &owner("0xa"), None)
            .await
            .unwrap()
            .is_none());
        let err = ledger
            .get_chunks(&key(9), &owner("0xa"), 0, 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn chunk_limits_are_enforced() {
        let ledger = InMemoryLedger::with_limits(LedgerLimits {
            max_value_bytes: 10,
            max_chunk_bytes: 2,
            max_chunks: 2,
        });
        let too_many = vec![Bytes::from("a"), Bytes::from("b"), Bytes::from("c")];
        assert!(matches!(
            ledger
                .write_chunked(&key(3), &owner("0xa"), "seg", too_many)
                .await,
            Err(StoreError::LimitExceeded(_))
        ));
        let too_big = vec![Bytes::from("abc")];
        assert!(matches!(
            ledger
                .write_chunked(&key(3), &owner("0xa"), "seg", too_big)
                .await,
            Err(StoreError::LimitExceeded(_))
        ));
        assert!(matches!(
            ledger
                .write_chunked(&key(3), &owner("0xa"), "seg", Vec::new())
                .await,
            Err(StoreError::LimitExceeded(_))
        ));
        assert_eq!(ledger.chunked_versions(&key(3), &owner("0xa")), 0);
    }

    // -----------------------------------------------------------------------
    // Counters and outages
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn counts_reads_and_writes() {
        let ledger = InMemoryLedger::new();
        ledger
            .write(&key(1), &owner("0xa"), "n", Bytes::from("x"))
            .await
            .unwrap();
        ledger.get_latest(&key(1), &owner("0xa")).await.unwrap();
        ledger
            .get_chunked_metadata(&key(1), &owner("0xa"), None)
            .await
            .unwrap();
        assert_eq!(ledger.write_count(), 1);
        assert_eq!(ledger.read_count(), 2);
    }

    #[tokio::test]
    async fn offline_ledger_fails_with_backend_error() {
        let ledger = InMemoryLedger::new();
        ledger.set_offline(true);
        let err = ledger.get_latest(&key(1), &owner("0xa")).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        ledger.set_offline(false);
        assert!(ledger.get_latest(&key(1), &owner("0xa")).await.is_ok());
    }

    #[test]
    fn debug_format() {
        let debug = format!("{:?}", InMemoryLedger::new());
        assert!(debug.contains("InMemoryLedger"));
        assert!(debug.contains("chunked_addresses"));
    }
}
