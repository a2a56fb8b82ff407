use quire_types::{Key, Owner, TypeError};
use serde::{Deserialize, Serialize};

/// Which ledger backend a reference is fetched from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// Chunked records. The default; never written to the wire.
    #[default]
    Chunked,
    /// Direct records, written as `s="d"`.
    Direct,
}

impl Source {
    /// Wire value of the `s` attribute, or `None` when it is omitted.
    pub fn wire_value(&self) -> Option<&'static str> {
        match self {
            Self::Chunked => None,
            Self::Direct => Some("d"),
        }
    }

    /// Parse an `s` attribute value. Unknown values are not accepted.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "d" => Some(Self::Direct),
            _ => None,
        }
    }
}

/// A pointer from a manifest to a stored record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// The record key exactly as written in the `k` attribute.
    pub hash: String,
    /// Forward-compatibility tag, matched exactly and never parsed.
    pub version: String,
    /// Historical version to read instead of the latest.
    pub index: Option<u64>,
    /// Owner to read from instead of the inherited one.
    pub operator: Option<Owner>,
    pub source: Source,
}

impl Reference {
    pub fn new(hash: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            version: version.into(),
            index: None,
            operator: None,
            source: Source::Chunked,
        }
    }

    /// Reference a record by its key.
    pub fn to_key(key: &Key, version: impl Into<String>) -> Self {
        Self::new(key.to_hex(), version)
    }

    pub fn with_index(mut self, index: u64) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_operator(mut self, operator: Owner) -> Self {
        self.operator = Some(operator);
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    /// Parse the `k` attribute into a record key.
    pub fn key(&self) -> Result<Key, TypeError> {
        Key::from_hex(&self.hash)
    }
}
