//! Foundation types for Quire.
//!
//! Every record in the backing ledger is addressed by a [`Key`] inside an
//! [`Owner`] namespace. Identical keys under different owners are unrelated
//! records. Every other Quire crate depends on `quire-types`.
//!
//! # Key Types
//!
//! - [`Key`]: fixed-width 32-byte record identifier
//! - [`Owner`]: canonical (lowercase) account namespace

pub mod error;
pub mod key;
pub mod owner;

pub use error::TypeError;
pub use key::Key;
pub use owner::Owner;
