use quire_types::Key;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag that is prepended to every hash
/// computation, so a segment and a manifest with identical bytes never share
/// a key. Leaf segments are always keyed by their bytes alone: the owner is
/// part of record addressing and is never mixed into the hash.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for leaf segments (the raw, uncompressed segment bytes).
    pub const SEGMENT: Self = Self {
        domain: "quire-segment-v1",
    };
    /// Hasher for manifests and top-level hashes over ordered key lists.
    pub const MANIFEST: Self = Self {
        domain: "quire-manifest-v1",
    };

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Key {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Key::from_hash(*hasher.finalize().as_bytes())
    }

    /// Hash the concatenation of an ordered list of keys.
    ///
    /// Order-sensitive: swapping two keys changes the result.
    pub fn top_level_hash(&self, ordered: &[Key]) -> Key {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        for key in ordered {
            hasher.update(key.as_bytes());
        }
        Key::from_hash(*hasher.finalize().as_bytes())
    }
}
