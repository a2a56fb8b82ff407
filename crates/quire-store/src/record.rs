use bytes::Bytes;
use quire_types::{Key, Owner};
use serde::{Deserialize, Serialize};

/// A direct record's label and value, as returned by a read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordValue {
    pub label: String,
    pub value: Bytes,
}

impl RecordValue {
    pub fn new(label: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Shape of a chunked record at one version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkedMetadata {
    pub chunk_count: u32,
    pub label: String,
}

impl ChunkedMetadata {
    /// A zero count is the sentinel for "no chunked data at this key".
    pub fn is_empty(&self) -> bool {
        self.chunk_count == 0
    }
}

/// Acknowledgement of an appended record version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteReceipt {
    pub key: Key,
    pub owner: Owner,
    pub version_index: u64,
}
