use quire_types::{Key, Owner};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("record not found: {key} (owner {owner})")]
    NotFound { key: Key, owner: Owner },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("pack error: {0}")]
    Pack(#[from] quire_pack::PackError),

    #[error("manifest error: {0}")]
    Manifest(#[from] quire_manifest::ManifestError),

    #[error("store error: {0}")]
    Store(#[from] quire_store::StoreError),

    #[error("resolve error: {0}")]
    Resolve(#[from] quire_resolve::ResolveError),

    #[error("plan error: {0}")]
    Plan(#[from] quire_plan::PlanError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;
