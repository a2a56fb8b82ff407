//! Manifest resolution for Quire.
//!
//! A [`Resolver`] expands content containing reference tags into the bytes
//! those references name, recursively, until no references remain or the
//! depth budget is spent.
//!
//! # Guarantees
//!
//! - Reference order is preserved: every tag is replaced in place.
//! - One bad reference never blanks a document: failed, absent or timed-out
//!   fetches are logged and replaced with empty bytes.
//! - Cycles terminate: each branch carries its own immutable [`VisitedSet`],
//!   and a reference already on the branch is replaced with a sentinel.
//! - Concurrency is bounded per layer: references are fetched in batches of
//!   `batch_size`, each batch finishing (including its sub-resolutions)
//!   before the next starts.

pub mod backend;
pub mod config;
pub mod error;
pub mod resolver;
pub mod visited;

pub use backend::Backend;
pub use config::ResolverConfig;
pub use error::{ResolveError, ResolveResult};
pub use resolver::Resolver;
pub use visited::{VisitKey, VisitedSet};
