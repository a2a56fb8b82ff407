use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    /// A size or chunk-count limit would be exceeded, or the configuration
    /// cannot honour its own limits. Raised before any write is attempted.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    /// The decompressed text is not valid for the canonical encoding.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Unpack was asked to reassemble zero chunks.
    #[error("no chunks to unpack")]
    NoChunks,

    #[error("read out of bounds: {start}..{end} of {len}")]
    OutOfBounds { start: u64, end: u64, len: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PackResult<T> = Result<T, PackError>;
