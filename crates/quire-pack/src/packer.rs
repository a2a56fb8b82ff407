use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;

use crate::config::PackConfig;
use crate::error::{PackError, PackResult};

/// Compresses segments into bounded chunks and back.
///
/// Packing is `base64 → zstd (with frame checksum) → fixed-size split`.
/// Unpacking concatenates, decompresses and decodes, and fails loudly on any
/// corruption: the frame checksum catches damaged chunks, and the decoded
/// size is capped so a hostile record cannot expand without bound.
#[derive(Clone, Debug)]
pub struct Packer {
    config: PackConfig,
}

impl Packer {
    /// Create a packer, proving first that the configuration can honour its
    /// own chunk limit for every segment it accepts.
    pub fn new(config: PackConfig) -> PackResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PackConfig {
        &self.config
    }

    /// Pack one segment into ordered chunks.
    ///
    /// Always returns at least one chunk.
    pub fn pack(&self, segment: &[u8]) -> PackResult<Vec<Bytes>> {
        if segment.len() > self.config.max_segment_bytes {
            return Err(PackError::Validation(format!(
                "segment of {} bytes exceeds the {} byte limit",
                segment.len(),
                self.config.max_segment_bytes
            )));
        }

        let text = STANDARD.encode(segment);
        let compressed = self.compress(text.as_bytes())?;

        let chunks: Vec<Bytes> = if compressed.is_empty() {
            vec![Bytes::new()]
        } else {
            let compressed = Bytes::from(compressed);
            (0..compressed.len())
                .step_by(self.config.chunk_size)
                .map(|start| {
                    let end = (start + self.config.chunk_size).min(compressed.len());
                    compressed.slice(start..end)
                })
                .collect()
        };

        if chunks.len() > self.config.max_chunks {
            return Err(PackError::Validation(format!(
                "segment packs into {} chunks, above the {} chunk limit",
                chunks.len(),
                self.config.max_chunks
            )));
        }
        tracing::trace!(
            segment_bytes = segment.len(),
            chunks = chunks.len(),
            "packed segment"
        );
        Ok(chunks)
    }

    /// Reassemble a segment from its chunks.
    pub fn unpack(&self, chunks: &[Bytes]) -> PackResult<Vec<u8>> {
        if chunks.is_empty() {
            return Err(PackError::NoChunks);
        }
        let total: usize = chunks.iter().map(Bytes::len).sum();
        let mut compressed = Vec::with_capacity(total);
        for chunk in chunks {
            compressed.extend_from_slice(chunk);
        }

        let text = self.decompress(&compressed)?;
        STANDARD
            .decode(&text)
            .map_err(|e| PackError::Decode(e.to_string()))
    }

    fn compress(&self, text: &[u8]) -> PackResult<Vec<u8>> {
        let mut encoder = zstd::stream::Encoder::new(Vec::new(), self.config.compression_level)
            .map_err(|e| PackError::CompressionFailed(e.to_string()))?;
        encoder
            .include_checksum(true)
            .map_err(|e| PackError::CompressionFailed(e.to_string()))?;
        encoder
            .write_all(text)
            .map_err(|e| PackError::CompressionFailed(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| PackError::CompressionFailed(e.to_string()))
    }

    fn decompress(&self, compressed: &[u8]) -> PackResult<Vec<u8>> {
        let limit = PackConfig::encoded_len(self.config.max_segment_bytes);
        let decoder = zstd::stream::Decoder::new(compressed)
            .map_err(|e| PackError::DecompressionFailed(e.to_string()))?;
        let mut text = Vec::new();
        decoder
            .take(limit as u64 + 1)
            .read_to_end(&mut text)
            .map_err(|e| PackError::DecompressionFailed(e.to_string()))?;
        if text.len() > limit {
            return Err(PackError::DecompressionFailed(format!(
                "decompressed text exceeds {limit} bytes"
            )));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn packer() -> Packer {
        Packer::new(PackConfig::default()).unwrap()
    }

    /// Deterministic, poorly compressible bytes.
    fn noise(len: usize) -> Vec<u8> {
        let mut state = 0x2545_f491_4f6c_dd1du64;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state >> 24) as u8
            })
            .collect()
    }

    #[test]
    fn empty_segment_packs_into_exactly_one_chunk() {
        let chunks = packer().pack(b"").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(packer().unpack(&chunks).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn roundtrip_text() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let chunks = packer().pack(data).unwrap();
        assert_eq!(packer().unpack(&chunks).unwrap(), data.to_vec());
    }

    #[test]
    fn compressible_segment_fits_in_one_chunk() {
        let data = vec![b'a'; 80_000];
        let chunks = packer().pack(&data).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(packer().unpack(&chunks).unwrap(), data);
    }

    #[test]
    fn incompressible_max_segment_stays_under_chunk_limit() {
        let data = noise(79_998);
        let chunks = packer().pack(&data).unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks.len() <= 255);
        let (last, full) = chunks.split_last().unwrap();
        assert!(full.iter().all(|c| c.len() == 20_000));
        assert!(last.len() <= 20_000 && !last.is_empty());
        assert_eq!(packer().unpack(&chunks).unwrap(), data);
    }

    #[test]
    fn oversized_segment_is_a_validation_error() {
        let err = packer().pack(&vec![0u8; 80_001]).unwrap_err();
        assert!(matches!(err, PackError::Validation(_)));
    }

    #[test]
    fn chunk_limit_guards_pack() {
        // Bypasses `Packer::new` so the runtime guard itself is exercised.
        let packer = Packer {
            config: PackConfig {
                chunk_size: 16,
                max_chunks: 2,
                ..PackConfig::default()
            },
        };
        let err = packer.pack(&noise(1_000)).unwrap_err();
        match err {
            PackError::Validation(msg) => assert!(msg.contains("chunk limit")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn misconfigured_packer_is_rejected_up_front() {
        let result = Packer::new(PackConfig {
            chunk_size: 16,
            ..PackConfig::default()
        });
        assert!(matches!(result, Err(PackError::Validation(_))));
    }

    #[test]
    fn unpack_zero_chunks_fails() {
        assert!(matches!(packer().unpack(&[]), Err(PackError::NoChunks)));
    }

    #[test]
    fn unpack_garbage_fails_with_decompression_error() {
        let garbage = vec![Bytes::from_static(b"definitely not zstd")];
        assert!(matches!(
            packer().unpack(&garbage),
            Err(PackError::DecompressionFailed(_))
        ));
    }

    #[test]
    fn unpack_corrupted_chunk_fails() {
        let data = noise(5_000);
        let mut chunks = packer().pack(&data).unwrap();
        let mut damaged = chunks[0].to_vec();
        let mid = damaged.len() / 2;
        damaged[mid] ^= 0xFF;
        chunks[0] = Bytes::from(damaged);
        assert!(matches!(
            packer().unpack(&chunks),
            Err(PackError::DecompressionFailed(_))
        ));
    }

    #[test]
    fn unpack_truncated_chunks_fails() {
        let data = noise(79_998);
        let chunks = packer().pack(&data).unwrap();
        assert!(packer().unpack(&chunks[..chunks.len() - 1]).is_err());
    }

    #[test]
    fn unpack_non_base64_text_fails_with_decode_error() {
        let p = packer();
        let compressed = p.compress(b"not base64!").unwrap();
        let err = p.unpack(&[Bytes::from(compressed)]).unwrap_err();
        assert!(matches!(err, PackError::Decode(_)));
    }

    #[test]
    fn unpack_caps_decompressed_size() {
        let p = Packer::new(PackConfig {
            max_segment_bytes: 30,
            ..PackConfig::default()
        })
        .unwrap();
        let oversized = packer().pack(&[b'z'; 300]).unwrap();
        assert!(matches!(
            p.unpack(&oversized),
            Err(PackError::DecompressionFailed(_))
        ));
    }

    #[test]
    fn packing_is_deterministic() {
        let data = noise(10_000);
        assert_eq!(packer().pack(&data).unwrap(), packer().pack(&data).unwrap());
    }

    proptest! {
        #[test]
        fn unpack_reverses_pack(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let p = packer();
            let chunks = p.pack(&data).unwrap();
            prop_assert!(!chunks.is_empty());
            prop_assert_eq!(p.unpack(&chunks).unwrap(), data);
        }
    }
}
