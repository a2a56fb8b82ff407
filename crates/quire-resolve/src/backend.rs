use quire_manifest::Source;
use quire_pack::Packer;
use quire_store::LedgerClient;
use quire_types::{Key, Owner};

use crate::error::{ResolveError, ResolveResult};

/// The ledger store a reference is read from.
///
/// Selected once per reference from its source flag; both variants share one
/// fetch contract returning the record's decoded bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Direct records: the value is the content.
    Direct,
    /// Chunked records: the chunks are a packed segment.
    Chunked,
}

impl From<Source> for Backend {
    fn from(source: Source) -> Self {
        match source {
            Source::Direct => Self::Direct,
            Source::Chunked => Self::Chunked,
        }
    }
}

impl Backend {
    /// Fetch and decode the record at `(key, owner)`, at `index` if given.
    ///
    /// Returns `Ok(None)` when the record does not exist.
    pub async fn fetch(
        &self,
        client: &dyn LedgerClient,
        packer: &Packer,
        key: &Key,
        owner: &Owner,
        index: Option<u64>,
    ) -> ResolveResult<Option<Vec<u8>>> {
        match self {
            Self::Direct => {
                let record = match index {
                    Some(i) => client.get_at_index(key, owner, i).await?,
                    None => client.get_latest(key, owner).await?,
                };
                Ok(record.map(|r| r.value.to_vec()))
            }
            Self::Chunked => {
                let Some(meta) = client.get_chunked_metadata(key, owner, index).await? else {
                    return Ok(None);
                };
                if meta.is_empty() {
                    return Ok(None);
                }
                let chunks = client
                    .get_chunks(key, owner, 0, meta.chunk_count, index)
                    .await?;
                if chunks.len() != meta.chunk_count as usize {
                    return Err(ResolveError::IncompleteChunks {
                        key: *key,
                        expected: meta.chunk_count,
                        actual: chunks.len(),
                    });
                }
                Ok(Some(packer.unpack(&chunks)?))
            }
        }
    }
}
