use std::collections::HashSet;
use std::sync::Arc;

use quire_types::{Key, Owner};

/// Identity of one reference expansion: which record, under which owner,
/// at which version.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VisitKey {
    pub key: Key,
    pub owner: Owner,
    pub index: Option<u64>,
}

impl VisitKey {
    pub fn new(key: Key, owner: Owner, index: Option<u64>) -> Self {
        Self { key, owner, index }
    }
}

/// Immutable set of expansions already on the current resolution branch.
///
/// There is no way to insert into a `VisitedSet` in place: [`with`] returns
/// an extended copy, leaving the original untouched. Sibling branches each
/// extend their parent's set independently, so work on one branch can never
/// mark another as visited.
///
/// [`with`]: VisitedSet::with
#[derive(Clone, Debug, Default)]
pub struct VisitedSet(Arc<HashSet<VisitKey>>);

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of this set that also contains `key`.
    pub fn with(&self, key: VisitKey) -> Self {
        let mut set = (*self.0).clone();
        set.insert(key);
        Self(Arc::new(set))
    }

    pub fn contains(&self, key: &VisitKey) -> bool {
        self.0.contains(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
