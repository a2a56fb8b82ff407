use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use quire_pack::{PackResult, Packer};
use quire_resolve::Backend;
use quire_store::LedgerClient;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{PlanError, PlanResult};
use crate::unit::{UnitId, UnitKind, UnitPayload, UploadPlan, UploadUnit};

/// Splits upload units into those the ledger still needs and those it
/// already holds.
pub struct UploadPlanner {
    client: Arc<dyn LedgerClient>,
    packer: Packer,
}

impl UploadPlanner {
    pub fn new(client: Arc<dyn LedgerClient>, packer: Packer) -> Self {
        Self { client, packer }
    }

    /// Classify every unit as send or skip.
    ///
    /// `expected` maps unit ids to the decoded content the stored record must
    /// match; units without an entry are compared against their own decoded
    /// payload. The unit set is validated before the ledger is queried.
    pub async fn plan(
        &self,
        units: Vec<UploadUnit>,
        expected: &HashMap<UnitId, Vec<u8>>,
    ) -> PlanResult<UploadPlan> {
        let (index, manifest_order) = manifest_order(&units)?;
        let mut skip = vec![false; units.len()];

        let mut tasks = JoinSet::new();
        for (pos, unit) in units.iter().enumerate().filter(|(_, u)| !u.is_manifest()) {
            let client = Arc::clone(&self.client);
            let packer = self.packer.clone();
            let unit = unit.clone();
            let expected = expected.get(&unit.id).cloned();
            tasks.spawn(async move {
                let present =
                    stored_matches(client.as_ref(), &packer, &unit, expected.as_deref()).await;
                (pos, present)
            });
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((pos, present)) => skip[pos] = present,
                Err(e) => warn!(error = %e, "leaf check failed; assuming absent"),
            }
        }

        for pos in manifest_order {
            let unit = &units[pos];
            let deps_skipped = unit.dependencies().all(|dep| skip[index[dep]]);
            skip[pos] = if deps_skipped {
                stored_matches(
                    self.client.as_ref(),
                    &self.packer,
                    unit,
                    expected.get(&unit.id).map(Vec::as_slice),
                )
                .await
            } else {
                debug!(unit = %unit.id, "dependency changed; sending manifest");
                false
            };
        }

        let (manifests, leaves): (Vec<_>, Vec<_>) = units
            .into_iter()
            .zip(skip)
            .partition(|(unit, _)| unit.is_manifest());
        let mut plan = UploadPlan::default();
        for (unit, skip) in manifests.into_iter().chain(leaves) {
            if skip {
                plan.to_skip.push(unit);
            } else {
                plan.to_send.push(unit);
            }
        }
        debug!(
            send = plan.to_send.len(),
            skip = plan.to_skip.len(),
            "planned upload"
        );
        Ok(plan)
    }
}

/// Whether the ledger already holds `unit` with the expected content.
///
/// Any failure to read or decode counts as "not held".
async fn stored_matches(
    client: &dyn LedgerClient,
    packer: &Packer,
    unit: &UploadUnit,
    expected: Option<&[u8]>,
) -> bool {
    let backend = match unit.payload {
        UnitPayload::Direct(_) => Backend::Direct,
        UnitPayload::Chunked(_) => Backend::Chunked,
    };

    if let UnitKind::Leaf {
        content_addressed: true,
    } = unit.kind
    {
        return exists(client, backend, unit).await;
    }

    let stored = match backend.fetch(client, packer, &unit.key, &unit.owner, None).await {
        Ok(Some(stored)) => stored,
        Ok(None) => {
            debug!(unit = %unit.id, "not stored");
            return false;
        }
        Err(e) => {
            warn!(unit = %unit.id, error = %e, "could not read stored unit; assuming absent");
            return false;
        }
    };

    let expected = match expected {
        Some(bytes) => Cow::Borrowed(bytes),
        None => match decode_payload(packer, &unit.payload) {
            Ok(bytes) => Cow::Owned(bytes),
            Err(e) => {
                warn!(unit = %unit.id, error = %e, "could not decode unit payload; assuming absent");
                return false;
            }
        },
    };
    let matches = stored == *expected;
    if !matches {
        debug!(unit = %unit.id, "stored content differs");
    }
    matches
}

async fn exists(client: &dyn LedgerClient, backend: Backend, unit: &UploadUnit) -> bool {
    let found = match backend {
        Backend::Direct => client
            .get_latest(&unit.key, &unit.owner)
            .await
            .map(|record| record.is_some()),
        Backend::Chunked => client
            .get_chunked_metadata(&unit.key, &unit.owner, None)
            .await
            .map(|meta| meta.is_some_and(|m| !m.is_empty())),
    };
    match found {
        Ok(found) => found,
        Err(e) => {
            warn!(unit = %unit.id, error = %e, "existence check failed; assuming absent");
            false
        }
    }
}

fn decode_payload(packer: &Packer, payload: &UnitPayload) -> PackResult<Vec<u8>> {
    match payload {
        UnitPayload::Direct(bytes) => Ok(bytes.to_vec()),
        UnitPayload::Chunked(chunks) => packer.unpack(chunks),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    New,
    Active,
    Done,
}

/// Validate the unit set and order manifests so each follows the manifests
/// it depends on.
fn manifest_order(units: &[UploadUnit]) -> PlanResult<(HashMap<&UnitId, usize>, Vec<usize>)> {
    let mut index = HashMap::with_capacity(units.len());
    for (pos, unit) in units.iter().enumerate() {
        if index.insert(&unit.id, pos).is_some() {
            return Err(PlanError::DuplicateUnit(unit.id.clone()));
        }
    }
    for unit in units {
        if let Some(dep) = unit.dependencies().find(|dep| !index.contains_key(dep)) {
            return Err(PlanError::UnknownDependency {
                unit: unit.id.clone(),
                dependency: dep.clone(),
            });
        }
    }

    let mut marks = vec![Mark::New; units.len()];
    let mut order = Vec::new();
    for pos in 0..units.len() {
        if units[pos].is_manifest() {
            visit(pos, units, &index, &mut marks, &mut order)?;
        }
    }
    Ok((index, order))
}

fn visit(
    pos: usize,
    units: &[UploadUnit],
    index: &HashMap<&UnitId, usize>,
    marks: &mut [Mark],
    order: &mut Vec<usize>,
) -> PlanResult<()> {
    match marks[pos] {
        Mark::Done => return Ok(()),
        Mark::Active => return Err(PlanError::DependencyCycle(units[pos].id.clone())),
        Mark::New => {}
    }
    marks[pos] = Mark::Active;
    for dep in units[pos].dependencies() {
        let dep = index[dep];
        if units[dep].is_manifest() {
            visit(dep, units, index, marks, order)?;
        }
    }
    marks[pos] = Mark::Done;
    order.push(pos);
    Ok(())
}
