use std::collections::BTreeSet;
use std::fmt;

use bytes::Bytes;
use quire_types::{Key, Owner};
use serde::{Deserialize, Serialize};

/// Caller-chosen identifier of an upload unit, unique within one plan.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for UnitId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnitKind {
    /// A record holding content.
    Leaf {
        /// The key is derived from the content, so existence implies a match.
        content_addressed: bool,
    },
    /// A record whose content references other units.
    Manifest { depends_on: BTreeSet<UnitId> },
}

/// The bytes a unit writes, in the shape the ledger stores them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnitPayload {
    /// A single value, written with `write`.
    Direct(Bytes),
    /// Packed chunks, written with `write_chunked`.
    Chunked(Vec<Bytes>),
}

/// One ledger write that an upload may need.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadUnit {
    pub id: UnitId,
    pub key: Key,
    pub owner: Owner,
    pub label: String,
    pub kind: UnitKind,
    pub payload: UnitPayload,
}

impl UploadUnit {
    pub fn leaf(
        id: impl Into<UnitId>,
        key: Key,
        owner: Owner,
        label: impl Into<String>,
        payload: UnitPayload,
    ) -> Self {
        Self {
            id: id.into(),
            key,
            owner,
            label: label.into(),
            kind: UnitKind::Leaf {
                content_addressed: false,
            },
            payload,
        }
    }

    pub fn manifest(
        id: impl Into<UnitId>,
        key: Key,
        owner: Owner,
        label: impl Into<String>,
        depends_on: impl IntoIterator<Item = UnitId>,
        payload: UnitPayload,
    ) -> Self {
        Self {
            id: id.into(),
            key,
            owner,
            label: label.into(),
            kind: UnitKind::Manifest {
                depends_on: depends_on.into_iter().collect(),
            },
            payload,
        }
    }

    /// Mark a leaf as content-addressed. No effect on manifests.
    pub fn content_addressed(mut self) -> Self {
        if let UnitKind::Leaf { content_addressed } = &mut self.kind {
            *content_addressed = true;
        }
        self
    }

    pub fn is_manifest(&self) -> bool {
        matches!(self.kind, UnitKind::Manifest { .. })
    }

    /// Units this one depends on. Always empty for leaves.
    pub fn dependencies(&self) -> impl Iterator<Item = &UnitId> {
        let deps = match &self.kind {
            UnitKind::Manifest { depends_on } => Some(depends_on.iter()),
            UnitKind::Leaf { .. } => None,
        };
        deps.into_iter().flatten()
    }
}

/// Outcome of planning: what to write and what the ledger already holds.
///
/// Both lists hold manifests first, then leaves, each in input order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadPlan {
    pub to_send: Vec<UploadUnit>,
    pub to_skip: Vec<UploadUnit>,
}

impl UploadPlan {
    /// True when nothing needs writing.
    pub fn is_noop(&self) -> bool {
        self.to_send.is_empty()
    }
}
