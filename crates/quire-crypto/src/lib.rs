//! Content addressing for Quire.
//!
//! Provides domain-separated BLAKE3 hashing of segment bytes and of ordered
//! key lists. Hashing is pure: the same bytes always produce the same
//! [`Key`](quire_types::Key), which is what makes upload deduplication sound.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod hasher;

pub use hasher::ContentHasher;
