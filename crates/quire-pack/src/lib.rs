//! Segmentation and packing for Quire.
//!
//! Turns arbitrarily large payloads into records the ledger will accept, and
//! back again.
//!
//! # Architecture
//!
//! - **Segmenter**: splits a payload into size-bounded, binary-safe segments,
//!   eagerly from a slice or lazily from any [`SliceSource`]
//! - **Packer**: base64-encodes a segment, compresses it with zstd and splits
//!   the compressed bytes into fixed-size chunks; `unpack` reverses this
//! - **SliceSource**: randomly sliceable inputs (in-memory bytes, files read
//!   by range) so large inputs never have to sit fully in the heap
//!
//! Zero chunks is the ledger's sentinel for "nothing stored here", so packing
//! always produces at least one chunk, even for an empty segment.

pub mod config;
pub mod error;
pub mod packer;
pub mod segment;
pub mod source;

pub use config::{PackConfig, SegmentConfig};
pub use error::{PackError, PackResult};
pub use packer::Packer;
pub use segment::{PayloadKind, Segment, SegmentStream, Segmenter};
pub use source::{FileSource, SliceSource};
