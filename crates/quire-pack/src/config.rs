use serde::{Deserialize, Serialize};

use crate::error::{PackError, PackResult};

/// Segment size limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Maximum bytes per text segment.
    pub max_text_bytes: usize,
    /// Maximum bytes per binary segment. Must be a multiple of 3 so that
    /// base64 encodings of consecutive segments concatenate without interior
    /// padding.
    pub max_binary_bytes: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_text_bytes: 80_000,
            max_binary_bytes: 79_998,
        }
    }
}

impl SegmentConfig {
    /// Largest segment either payload kind can produce.
    pub fn max_segment_bytes(&self) -> usize {
        self.max_text_bytes.max(self.max_binary_bytes)
    }

    pub fn validate(&self) -> PackResult<()> {
        // A text segment must be able to hold any single UTF-8 character.
        if self.max_text_bytes < 4 {
            return Err(PackError::Validation(format!(
                "max_text_bytes must be at least 4, got {}",
                self.max_text_bytes
            )));
        }
        if self.max_binary_bytes == 0 || self.max_binary_bytes % 3 != 0 {
            return Err(PackError::Validation(format!(
                "max_binary_bytes must be a non-zero multiple of 3, got {}",
                self.max_binary_bytes
            )));
        }
        Ok(())
    }
}

/// Packing limits and compression settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackConfig {
    /// Size of every chunk except possibly the last.
    pub chunk_size: usize,
    /// Maximum chunks a single packed segment may produce.
    pub max_chunks: usize,
    /// zstd compression level.
    pub compression_level: i32,
    /// Largest segment the packer accepts.
    pub max_segment_bytes: usize,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            chunk_size: 20_000,
            max_chunks: 255,
            compression_level: 3,
            max_segment_bytes: 80_000,
        }
    }
}

impl PackConfig {
    /// Length of the canonical text encoding of `len` raw bytes.
    pub fn encoded_len(len: usize) -> usize {
        len.div_ceil(3) * 4
    }

    /// Upper bound on the compressed size of a max-size segment.
    pub fn worst_case_compressed_bytes(&self) -> usize {
        // Frame checksum is 4 bytes on top of the library's bound.
        zstd::zstd_safe::compress_bound(Self::encoded_len(self.max_segment_bytes)) + 4
    }

    /// Upper bound on the number of chunks a max-size segment packs into.
    pub fn worst_case_chunks(&self) -> usize {
        self.worst_case_compressed_bytes()
            .div_ceil(self.chunk_size.max(1))
    }

    /// Check that every segment within `max_segment_bytes` is guaranteed to
    /// fit in `max_chunks` chunks, whatever its content.
    pub fn validate(&self) -> PackResult<()> {
        if self.chunk_size == 0 {
            return Err(PackError::Validation("chunk_size must be non-zero".into()));
        }
        if self.max_chunks == 0 {
            return Err(PackError::Validation("max_chunks must be non-zero".into()));
        }
        if !(1..=22).contains(&self.compression_level) {
            return Err(PackError::Validation(format!(
                "compression_level must be within 1..=22, got {}",
                self.compression_level
            )));
        }
        let worst = self.worst_case_chunks();
        if worst > self.max_chunks {
            return Err(PackError::Validation(format!(
                "a {} byte segment may need {worst} chunks of {} bytes, above the {} chunk limit",
                self.max_segment_bytes, self.chunk_size, self.max_chunks
            )));
        }
        Ok(())
    }
}
