use std::time::Duration;

use quire_types::Key;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("ledger error: {0}")]
    Store(#[from] quire_store::StoreError),

    #[error("pack error: {0}")]
    Pack(#[from] quire_pack::PackError),

    #[error("invalid reference key: {0}")]
    InvalidKey(#[from] quire_types::TypeError),

    #[error("record {key} reported {expected} chunks but returned {actual}")]
    IncompleteChunks {
        key: Key,
        expected: u32,
        actual: usize,
    },

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid resolver configuration: {0}")]
    Config(String),
}

pub type ResolveResult<T> = Result<T, ResolveError>;
