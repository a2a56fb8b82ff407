use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    /// An attribute value cannot be written inside a tag.
    #[error("invalid {attribute} attribute {value:?}: {reason}")]
    InvalidAttribute {
        attribute: &'static str,
        value: String,
        reason: String,
    },
}

pub type ManifestResult<T> = Result<T, ManifestError>;
