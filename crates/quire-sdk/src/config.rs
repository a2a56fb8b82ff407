use std::path::Path;

use quire_pack::{PackConfig, SegmentConfig};
use quire_resolve::ResolverConfig;
use quire_store::LedgerLimits;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Complete Quire configuration. Every field has a default, so a TOML file
/// only needs the values it changes:
///
/// ```toml
/// manifest_version = "0.0.1"
///
/// [pack]
/// compression_level = 9
///
/// [resolver]
/// batch_size = 6
/// fetch_timeout_ms = 5000
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuireConfig {
    /// Version tag written into every reference.
    pub manifest_version: String,
    /// Label for segment records.
    pub leaf_label: String,
    /// Label for manifest records.
    pub manifest_label: String,
    pub segment: SegmentConfig,
    pub pack: PackConfig,
    pub resolver: ResolverConfig,
    /// Limits of the target ledger, checked against the packing settings.
    pub ledger: LedgerLimits,
}

impl Default for QuireConfig {
    fn default() -> Self {
        Self {
            manifest_version: "0.0.1".into(),
            leaf_label: "quire:segment".into(),
            manifest_label: "quire:manifest".into(),
            segment: SegmentConfig::default(),
            pack: PackConfig::default(),
            resolver: ResolverConfig::default(),
            ledger: LedgerLimits::default(),
        }
    }
}

impl QuireConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// Validate every section, then the constraints between them.
    pub fn validate(&self) -> SdkResult<()> {
        for (name, value) in [
            ("manifest_version", &self.manifest_version),
            ("leaf_label", &self.leaf_label),
            ("manifest_label", &self.manifest_label),
        ] {
            if value.is_empty() {
                return Err(SdkError::Config(format!("{name} must not be empty")));
            }
        }
        self.segment.validate()?;
        self.pack.validate()?;
        self.resolver.validate()?;

        if self.segment.max_segment_bytes() > self.pack.max_segment_bytes {
            return Err(SdkError::Config(format!(
                "segments of up to {} bytes exceed the packer limit of {}",
                self.segment.max_segment_bytes(),
                self.pack.max_segment_bytes
            )));
        }
        if self.pack.chunk_size > self.ledger.max_chunk_bytes {
            return Err(SdkError::Config(format!(
                "chunk_size {} exceeds the ledger chunk limit of {}",
                self.pack.chunk_size, self.ledger.max_chunk_bytes
            )));
        }
        if self.pack.max_chunks > self.ledger.max_chunks {
            return Err(SdkError::Config(format!(
                "max_chunks {} exceeds the ledger limit of {}",
                self.pack.max_chunks, self.ledger.max_chunks
            )));
        }
        Ok(())
    }
}
