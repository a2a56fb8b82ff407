//! Ledger client boundary for Quire.
//!
//! The backing ledger is an external collaborator: an append-only key-value
//! store where every record is addressed by `(key, owner)` and every write
//! appends a new version. Two record shapes exist:
//!
//! - direct records, holding a single bounded value
//! - chunked records, holding an ordered array of bounded chunks
//!
//! All backends implement the async [`LedgerClient`] trait:
//!
//! - [`InMemoryLedger`] -- `HashMap`-based ledger for tests and embedding
//!
//! # Design Rules
//!
//! 1. Records are never mutated, only appended; "latest" is the highest index.
//! 2. Every write is independent and independently failable.
//! 3. Clients perform no implicit retries.
//! 4. Zero chunks means "no chunked data exists at this key".

pub mod error;
pub mod memory;
pub mod record;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryLedger, LedgerLimits};
pub use record::{ChunkedMetadata, RecordValue, WriteReceipt};
pub use traits::LedgerClient;
