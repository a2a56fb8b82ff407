use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::config::SegmentConfig;
use crate::error::{PackError, PackResult};
use crate::source::SliceSource;

/// How a payload's bytes are to be interpreted when segmenting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadKind {
    /// UTF-8 text; segments are cut on character boundaries.
    Text,
    /// Arbitrary bytes; segments use the 3-aligned size limit.
    Binary,
}

impl PayloadKind {
    pub fn from_is_binary(is_binary: bool) -> Self {
        if is_binary {
            Self::Binary
        } else {
            Self::Text
        }
    }
}

/// A bounded slice of the original payload, prior to compression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Position of this segment in the payload, starting at 0.
    pub index: usize,
    /// Byte offset of this segment within the payload.
    pub offset: u64,
    pub kind: PayloadKind,
    pub data: Bytes,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Splits payloads into size-bounded segments.
#[derive(Clone, Debug)]
pub struct Segmenter {
    config: SegmentConfig,
}

impl Segmenter {
    pub fn new(config: SegmentConfig) -> PackResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }

    /// Segment size limit for a payload kind.
    pub fn max_segment_bytes(&self, kind: PayloadKind) -> usize {
        match kind {
            PayloadKind::Text => self.config.max_text_bytes,
            PayloadKind::Binary => self.config.max_binary_bytes,
        }
    }

    /// Split an in-memory payload.
    ///
    /// Text payloads must be valid UTF-8. An empty payload yields exactly one
    /// empty segment.
    pub fn split(&self, payload: &[u8], is_binary: bool) -> PackResult<Vec<Segment>> {
        self.stream(payload, PayloadKind::from_is_binary(is_binary))
            .collect()
    }

    /// Lazily segment a randomly sliceable source.
    ///
    /// Each call to `next()` reads only the next segment's range from the
    /// source.
    pub fn stream<S: SliceSource>(&self, source: S, kind: PayloadKind) -> SegmentStream<S> {
        SegmentStream {
            source,
            kind,
            max: self.max_segment_bytes(kind),
            offset: 0,
            index: 0,
            done: false,
        }
    }
}

/// Iterator over the segments of a [`SliceSource`].
///
/// Finite and not restartable: once exhausted, or after the first error, it
/// yields nothing more.
pub struct SegmentStream<S> {
    source: S,
    kind: PayloadKind,
    max: usize,
    offset: u64,
    index: usize,
    done: bool,
}

impl<S: SliceSource> SegmentStream<S> {
    fn next_segment(&mut self) -> PackResult<Option<Segment>> {
        let len = self.source.len();
        if self.offset >= len && !(len == 0 && self.index == 0) {
            return Ok(None);
        }
        let end = (self.offset + self.max as u64).min(len);
        let mut data = self.source.read_range(self.offset, end)?;

        if self.kind == PayloadKind::Text {
            let at_end = end == len;
            let valid = text_prefix_len(&data, at_end).map_err(|valid_up_to| {
                PackError::Validation(format!(
                    "text payload is not valid UTF-8 at byte {}",
                    self.offset + valid_up_to as u64
                ))
            })?;
            data.truncate(valid);
        }

        let segment = Segment {
            index: self.index,
            offset: self.offset,
            kind: self.kind,
            data,
        };
        self.offset += segment.len() as u64;
        self.index += 1;
        Ok(Some(segment))
    }
}

/// Length of the longest prefix of `data` that ends on a UTF-8 character
/// boundary. A character cut off by the segment limit is left for the next
/// segment, unless the source ends there.
fn text_prefix_len(data: &[u8], at_end: bool) -> Result<usize, usize> {
    match std::str::from_utf8(data) {
        Ok(_) => Ok(data.len()),
        Err(e) if e.error_len().is_none() && !at_end && e.valid_up_to() > 0 => {
            Ok(e.valid_up_to())
        }
        Err(e) => Err(e.valid_up_to()),
    }
}

impl<S: SliceSource> Iterator for SegmentStream<S> {
    type Item = PackResult<Segment>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_segment() {
            Ok(Some(segment)) => Some(Ok(segment)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
