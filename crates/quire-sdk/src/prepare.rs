use std::collections::{HashMap, HashSet};

use quire_crypto::ContentHasher;
use quire_manifest::{codec, Reference};
use quire_pack::{PackResult, Packer, Segment};
use quire_plan::{UnitId, UnitPayload, UploadUnit};
use quire_types::{Key, Owner};
use tracing::debug;

use crate::config::QuireConfig;
use crate::error::{SdkError, SdkResult};

/// How the root record of an upload is keyed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyChoice {
    /// Hash of the ordered top-level references.
    #[default]
    Derived,
    /// A caller-chosen key, for stable names across versions.
    Explicit(Key),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadOptions {
    pub owner: Owner,
    pub is_binary: bool,
    pub key: KeyChoice,
}

impl UploadOptions {
    /// Text upload under `owner` with a derived root key.
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            is_binary: false,
            key: KeyChoice::Derived,
        }
    }

    pub fn binary(mut self) -> Self {
        self.is_binary = true;
        self
    }

    pub fn with_key(mut self, key: Key) -> Self {
        self.key = KeyChoice::Explicit(key);
        self
    }
}

/// Everything an upload would write, before any ledger access.
#[derive(Clone, Debug)]
pub struct PreparedUpload {
    /// Key of the root manifest record.
    pub root: Key,
    pub owner: Owner,
    /// Manifests then leaves; identical segments appear once.
    pub units: Vec<UploadUnit>,
    /// Decoded manifest text, for comparison with stored records. Leaves
    /// are content-addressed and checked on existence alone, so segment
    /// bytes are never held here.
    pub expected: HashMap<UnitId, Vec<u8>>,
}

impl PreparedUpload {
    pub fn manifest_count(&self) -> usize {
        self.units.iter().filter(|u| u.is_manifest()).count()
    }

    pub fn leaf_count(&self) -> usize {
        self.units.len() - self.manifest_count()
    }
}

/// Turns segments into upload units.
#[derive(Clone, Debug)]
pub(crate) struct Preparer {
    packer: Packer,
    manifest_version: String,
    leaf_label: String,
    manifest_label: String,
    /// Largest manifest text stored as one record.
    max_manifest_bytes: usize,
}

/// One reference in a manifest layer: the record's key and its unit.
type Entry = (Key, UnitId);

impl Preparer {
    pub(crate) fn new(config: &QuireConfig, packer: Packer) -> Self {
        Self {
            packer,
            manifest_version: config.manifest_version.clone(),
            leaf_label: config.leaf_label.clone(),
            manifest_label: config.manifest_label.clone(),
            max_manifest_bytes: config.segment.max_text_bytes,
        }
    }

    pub(crate) fn prepare<I>(&self, segments: I, options: &UploadOptions) -> SdkResult<PreparedUpload>
    where
        I: IntoIterator<Item = PackResult<Segment>>,
    {
        let owner = &options.owner;
        let mut leaves = Vec::new();
        let mut expected = HashMap::new();
        let mut seen = HashSet::new();
        let mut layer: Vec<Entry> = Vec::new();

        for segment in segments {
            let segment = segment?;
            let key = ContentHasher::SEGMENT.hash(&segment.data);
            let id = UnitId::new(format!("segment:{}", key.to_hex()));
            if seen.insert(key) {
                let chunks = self.packer.pack(&segment.data)?;
                leaves.push(
                    UploadUnit::leaf(
                        id.clone(),
                        key,
                        owner.clone(),
                        self.leaf_label.as_str(),
                        UnitPayload::Chunked(chunks),
                    )
                    .content_addressed(),
                );
            }
            layer.push((key, id));
        }

        let mut manifests = Vec::new();
        let mut seen_manifests = HashSet::new();
        loop {
            let text = self.encode_layer(&layer)?;
            if text.len() <= self.max_manifest_bytes {
                let root = match options.key {
                    KeyChoice::Explicit(key) => key,
                    KeyChoice::Derived => layer_hash(&layer),
                };
                let id = UnitId::new(format!("root:{}", root.to_hex()));
                manifests.push(self.manifest_unit(id.clone(), root, owner, &layer, &text)?);
                expected.insert(id, text.into_bytes());

                // Deepest manifests were built first; list the root first.
                manifests.reverse();
                debug!(
                    root = %root.short_hex(),
                    leaves = leaves.len(),
                    manifests = manifests.len(),
                    "prepared upload"
                );
                let mut units = manifests;
                units.extend(leaves);
                return Ok(PreparedUpload {
                    root,
                    owner: owner.clone(),
                    units,
                    expected,
                });
            }

            let per_group = self.refs_per_manifest(&layer)?;
            let mut next = Vec::with_capacity(layer.len().div_ceil(per_group));
            for group in layer.chunks(per_group) {
                let key = layer_hash(group);
                let id = UnitId::new(format!("manifest:{}", key.to_hex()));
                if seen_manifests.insert(key) {
                    let text = self.encode_layer(group)?;
                    let unit = self.manifest_unit(id.clone(), key, owner, group, &text)?;
                    // Built bottom-up, reversed at the end.
                    manifests.push(unit);
                    expected.insert(id.clone(), text.into_bytes());
                }
                next.push((key, id));
            }
            debug!(from = layer.len(), to = next.len(), "nested manifest layer");
            layer = next;
        }
    }

    fn encode_layer(&self, layer: &[Entry]) -> SdkResult<String> {
        let refs: Vec<Reference> = layer
            .iter()
            .map(|(key, _)| Reference::to_key(key, self.manifest_version.as_str()))
            .collect();
        Ok(codec::encode(&refs)?)
    }

    /// References that fit in one manifest record. Every tag in a layer has
    /// the same length, so one encoded tag sizes them all.
    fn refs_per_manifest(&self, layer: &[Entry]) -> SdkResult<usize> {
        let tag_len = self.encode_layer(&layer[..1])?.len();
        let per_group = self.max_manifest_bytes / tag_len;
        if per_group < 2 {
            return Err(SdkError::Config(format!(
                "max_text_bytes {} cannot hold two {tag_len}-byte references",
                self.max_manifest_bytes
            )));
        }
        Ok(per_group)
    }

    fn manifest_unit(
        &self,
        id: UnitId,
        key: Key,
        owner: &Owner,
        layer: &[Entry],
        text: &str,
    ) -> SdkResult<UploadUnit> {
        let chunks = self.packer.pack(text.as_bytes())?;
        Ok(UploadUnit::manifest(
            id,
            key,
            owner.clone(),
            self.manifest_label.as_str(),
            layer.iter().map(|(_, id)| id.clone()),
            UnitPayload::Chunked(chunks),
        ))
    }
}

fn layer_hash(layer: &[Entry]) -> Key {
    let keys: Vec<Key> = layer.iter().map(|(key, _)| *key).collect();
    ContentHasher::MANIFEST.top_level_hash(&keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_pack::{PackConfig, Segmenter};
    use quire_plan::UnitKind;

    fn preparer(config: &QuireConfig) -> Preparer {
        Preparer::new(config, Packer::new(config.pack.clone()).unwrap())
    }

    fn prepare(config: &QuireConfig, payload: &[u8], options: &UploadOptions) -> PreparedUpload {
        let segmenter = Segmenter::new(config.segment.clone()).unwrap();
        let segments = segmenter.split(payload, options.is_binary).unwrap();
        preparer(config)
            .prepare(segments.into_iter().map(Ok), options)
            .unwrap()
    }

    fn options() -> UploadOptions {
        UploadOptions::new(Owner::new("0xa").unwrap())
    }

    fn manifest_refs(prepared: &PreparedUpload, unit: &UploadUnit) -> Vec<Reference> {
        let text = std::str::from_utf8(&prepared.expected[&unit.id]).unwrap();
        codec::decode(text)
    }

    #[test]
    fn single_segment_upload() {
        let config = QuireConfig::default();
        let prepared = prepare(&config, b"hello", &options());
        assert_eq!(prepared.manifest_count(), 1);
        assert_eq!(prepared.leaf_count(), 1);

        let root = &prepared.units[0];
        assert_eq!(root.key, prepared.root);
        let leaf_key = ContentHasher::SEGMENT.hash(b"hello");
        assert_eq!(manifest_refs(&prepared, root), vec![Reference::to_key(&leaf_key, "0.0.1")]);
        assert_eq!(prepared.root, ContentHasher::MANIFEST.top_level_hash(&[leaf_key]));

        let leaf = &prepared.units[1];
        assert_eq!(leaf.key, leaf_key);
        assert_eq!(leaf.kind, UnitKind::Leaf { content_addressed: true });
    }

    #[test]
    fn only_manifest_content_is_retained() {
        let config = QuireConfig::default();
        let payload: Vec<u8> = (0..400_000u32).map(|i| b'a' + (i % 26) as u8).collect();
        let prepared = prepare(&config, &payload, &options());
        assert_eq!(prepared.leaf_count(), 5);
        for unit in &prepared.units {
            assert_eq!(prepared.expected.contains_key(&unit.id), unit.is_manifest());
        }
        let retained: usize = prepared.expected.values().map(Vec::len).sum();
        assert!(retained < 1_000);
    }

    #[test]
    fn identical_segments_are_stored_once() {
        let config = QuireConfig::default();
        let payload = vec![b'a'; 240_000];
        let prepared = prepare(&config, &payload, &options());
        assert_eq!(prepared.leaf_count(), 1);
        let refs = manifest_refs(&prepared, &prepared.units[0]);
        assert_eq!(refs.len(), 3);
        assert!(refs.iter().all(|r| r == &refs[0]));
    }

    #[test]
    fn explicit_root_key() {
        let config = QuireConfig::default();
        let key = Key::from_hash([7; 32]);
        let prepared = prepare(&config, b"named", &options().with_key(key));
        assert_eq!(prepared.root, key);
        assert_eq!(prepared.units[0].key, key);
    }

    #[test]
    fn empty_payload_still_has_one_leaf() {
        let config = QuireConfig::default();
        let prepared = prepare(&config, b"", &options());
        assert_eq!(prepared.leaf_count(), 1);
        assert_eq!(prepared.manifest_count(), 1);
    }

    #[test]
    fn large_manifests_are_nested() {
        let mut config = QuireConfig::default();
        config.segment.max_text_bytes = 300;
        let payload: Vec<u8> = (0..3_000u32).map(|i| b'a' + (i % 26) as u8).collect();
        let prepared = prepare(&config, &payload, &options());

        assert_eq!(prepared.leaf_count(), 10);
        // 10 leaves -> 4 sub-manifests -> 2 sub-manifests -> root.
        assert_eq!(prepared.manifest_count(), 7);
        for unit in prepared.units.iter().filter(|u| u.is_manifest()) {
            assert!(prepared.expected[&unit.id].len() <= 300);
        }

        let root = &prepared.units[0];
        assert_eq!(root.key, prepared.root);
        let children: Vec<&UnitId> = root.dependencies().collect();
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|id| id.as_str().starts_with("manifest:")));

        // Every dependency appears in the unit set.
        let ids: HashSet<&UnitId> = prepared.units.iter().map(|u| &u.id).collect();
        for unit in &prepared.units {
            assert!(unit.dependencies().all(|d| ids.contains(d)));
        }
    }

    #[test]
    fn tiny_text_limit_cannot_nest() {
        let mut config = QuireConfig::default();
        config.segment.max_text_bytes = 100;
        config.pack = PackConfig::default();
        let payload: Vec<u8> = (0..1_000u32).map(|i| b'a' + (i % 26) as u8).collect();
        let segmenter = Segmenter::new(config.segment.clone()).unwrap();
        let segments = segmenter.split(&payload, false).unwrap();
        let err = preparer(&config)
            .prepare(segments.into_iter().map(Ok), &options())
            .unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
    }

    #[test]
    fn segment_errors_propagate() {
        let config = QuireConfig::default();
        let segments = vec![Err(quire_pack::PackError::Validation("bad".into()))];
        let err = preparer(&config).prepare(segments, &options()).unwrap_err();
        assert!(matches!(err, SdkError::Pack(_)));
    }
}
