use quire_types::{Key, Owner};

/// Errors from ledger client operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No record exists at the given address.
    #[error("record not found: {key} under {owner}")]
    NotFound { key: Key, owner: Owner },

    /// Transport or RPC failure talking to the ledger.
    #[error("backend error: {0}")]
    Backend(String),

    /// The write exceeds one of the ledger's hard limits.
    #[error("ledger limit exceeded: {0}")]
    LimitExceeded(String),

    /// A chunk range that does not fit the stored record.
    #[error("invalid chunk range {start}..{end} for record with {count} chunks")]
    InvalidRange { start: u32, end: u32, count: u32 },
}

impl StoreError {
    /// Whether the caller may reasonably try the same operation again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Backend(_))
    }
}

/// Result alias for ledger operations.
pub type StoreResult<T> = Result<T, StoreError>;
