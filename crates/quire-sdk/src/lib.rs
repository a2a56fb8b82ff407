//! High-level SDK for Quire.
//!
//! Stores payloads of any size on a ledger that caps every record, and reads
//! them back. The [`Quire`] facade wires the pipeline together:
//!
//! ```text
//! upload:   payload -> segments -> packed chunks -> leaf records
//!                                     \-> manifest (nested when large) -> root record
//!           units -> planner (skip what is already stored) -> dispatch writes
//!
//! download: root record -> resolver (expand references) -> payload
//! ```
//!
//! The ledger itself is injected as any [`LedgerClient`].

pub mod client;
pub mod config;
pub mod error;
pub mod prepare;

pub use client::{DispatchFailure, DispatchOutcome, Quire, UploadReport};
pub use config::QuireConfig;
pub use error::{SdkError, SdkResult};
pub use prepare::{KeyChoice, PreparedUpload, UploadOptions};

pub use quire_plan::{UnitId, UploadPlan, UploadUnit};
pub use quire_store::{InMemoryLedger, LedgerClient, LedgerLimits};
pub use quire_types::{Key, Owner};
