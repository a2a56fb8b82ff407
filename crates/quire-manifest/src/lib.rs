//! Manifest format for Quire.
//!
//! A manifest is a text blob of concatenated, self-closing reference tags:
//!
//! ```text
//! <ref k="<hash>" v="<version>" [i="<index>"] [o="<owner>"] [s="d"] />
//! ```
//!
//! Each tag names a record to splice in at that position. Order is
//! significant and preserved exactly. Manifests carry no type flag: content is
//! a manifest iff it contains at least one well-formed tag.
//!
//! ```rust
//! use quire_manifest::{codec, Reference};
//! use quire_types::Owner;
//!
//! let refs = vec![Reference::new("0xAA", "0.0.1")
//!     .with_index(0)
//!     .with_operator(Owner::new("0xOP").unwrap())];
//! let text = codec::encode(&refs).unwrap();
//! assert_eq!(text, r#"<ref k="0xAA" v="0.0.1" i="0" o="0xop" />"#);
//! assert_eq!(codec::decode(&text), refs);
//! ```

pub mod codec;
pub mod error;
pub mod reference;

pub use codec::{decode, detect, encode, scan, TagSpan};
pub use error::{ManifestError, ManifestResult};
pub use reference::{Reference, Source};
