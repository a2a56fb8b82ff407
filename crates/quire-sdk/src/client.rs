use std::path::Path;
use std::sync::Arc;

use quire_manifest::Source;
use quire_pack::{FileSource, Packer, PayloadKind, Segmenter, SliceSource};
use quire_plan::{UnitId, UnitPayload, UploadPlan, UploadPlanner, UploadUnit};
use quire_resolve::Resolver;
use quire_store::{LedgerClient, StoreError, WriteReceipt};
use quire_types::{Key, Owner};
use tracing::{info, warn};

use crate::config::QuireConfig;
use crate::error::{SdkError, SdkResult};
use crate::prepare::{PreparedUpload, Preparer, UploadOptions};

/// A write that the ledger rejected.
#[derive(Debug)]
pub struct DispatchFailure {
    pub id: UnitId,
    pub error: StoreError,
}

/// Result of dispatching a plan.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub sent: Vec<WriteReceipt>,
    pub sent_ids: Vec<UnitId>,
    pub failed: Vec<DispatchFailure>,
}

/// Summary of an upload.
#[derive(Debug)]
pub struct UploadReport {
    pub root: Key,
    pub owner: Owner,
    pub sent: Vec<UnitId>,
    pub skipped: Vec<UnitId>,
    pub failed: Vec<DispatchFailure>,
}

impl UploadReport {
    /// True when every planned write succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// High-level Quire API over an injected ledger.
pub struct Quire {
    client: Arc<dyn LedgerClient>,
    config: QuireConfig,
    segmenter: Segmenter,
    preparer: Preparer,
    planner: UploadPlanner,
    resolver: Resolver,
}

impl Quire {
    /// Build a client, validating the whole configuration first.
    pub fn new(client: Arc<dyn LedgerClient>, config: QuireConfig) -> SdkResult<Self> {
        config.validate()?;
        let segmenter = Segmenter::new(config.segment.clone())?;
        let packer = Packer::new(config.pack.clone())?;
        let preparer = Preparer::new(&config, packer.clone());
        let planner = UploadPlanner::new(Arc::clone(&client), packer.clone());
        let resolver = Resolver::new(Arc::clone(&client), packer, config.resolver.clone())?;
        Ok(Self {
            client,
            config,
            segmenter,
            preparer,
            planner,
            resolver,
        })
    }

    pub fn with_defaults(client: Arc<dyn LedgerClient>) -> SdkResult<Self> {
        Self::new(client, QuireConfig::default())
    }

    pub fn config(&self) -> &QuireConfig {
        &self.config
    }

    // ---- Upload ----

    /// Segment, pack and address an in-memory payload. No ledger access.
    pub fn prepare(&self, payload: &[u8], options: &UploadOptions) -> SdkResult<PreparedUpload> {
        let segments = self.segmenter.split(payload, options.is_binary)?;
        self.preparer.prepare(segments.into_iter().map(Ok), options)
    }

    /// Like [`prepare`](Self::prepare), reading lazily from `source`.
    pub fn prepare_stream<S: SliceSource>(
        &self,
        source: S,
        options: &UploadOptions,
    ) -> SdkResult<PreparedUpload> {
        let kind = PayloadKind::from_is_binary(options.is_binary);
        self.preparer
            .prepare(self.segmenter.stream(source, kind), options)
    }

    /// Prepare a file, reading one segment range at a time.
    pub fn prepare_file(
        &self,
        path: impl AsRef<Path>,
        options: &UploadOptions,
    ) -> SdkResult<PreparedUpload> {
        let source = FileSource::open(path)?;
        self.prepare_stream(source, options)
    }

    /// Classify prepared units against what the ledger already holds.
    pub async fn plan(&self, prepared: &PreparedUpload) -> SdkResult<UploadPlan> {
        Ok(self
            .planner
            .plan(prepared.units.clone(), &prepared.expected)
            .await?)
    }

    /// Issue each write in the plan once, in plan order.
    ///
    /// Failures are collected, never retried, and do not stop later writes.
    pub async fn dispatch(&self, plan: &UploadPlan) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for unit in &plan.to_send {
            match self.write_unit(unit).await {
                Ok(receipt) => {
                    outcome.sent.push(receipt);
                    outcome.sent_ids.push(unit.id.clone());
                }
                Err(error) => {
                    warn!(unit = %unit.id, error = %error, "write failed");
                    outcome.failed.push(DispatchFailure {
                        id: unit.id.clone(),
                        error,
                    });
                }
            }
        }
        outcome
    }

    async fn write_unit(&self, unit: &UploadUnit) -> Result<WriteReceipt, StoreError> {
        match &unit.payload {
            UnitPayload::Direct(value) => {
                self.client
                    .write(&unit.key, &unit.owner, &unit.label, value.clone())
                    .await
            }
            UnitPayload::Chunked(chunks) => {
                self.client
                    .write_chunked(&unit.key, &unit.owner, &unit.label, chunks.clone())
                    .await
            }
        }
    }

    /// Prepare, plan and dispatch an in-memory payload.
    pub async fn upload(&self, payload: &[u8], options: &UploadOptions) -> SdkResult<UploadReport> {
        let prepared = self.prepare(payload, options)?;
        self.upload_prepared(prepared).await
    }

    /// Plan and dispatch an already prepared upload.
    pub async fn upload_prepared(&self, prepared: PreparedUpload) -> SdkResult<UploadReport> {
        let plan = self.plan(&prepared).await?;
        let outcome = self.dispatch(&plan).await;
        let report = UploadReport {
            root: prepared.root,
            owner: prepared.owner,
            sent: outcome.sent_ids,
            skipped: plan.to_skip.into_iter().map(|u| u.id).collect(),
            failed: outcome.failed,
        };
        info!(
            root = %report.root,
            sent = report.sent.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "upload finished"
        );
        Ok(report)
    }

    // ---- Download ----

    /// Fetch the root record at `key` and resolve it back into the payload.
    pub async fn download(
        &self,
        key: &Key,
        owner: &Owner,
        index: Option<u64>,
    ) -> SdkResult<Vec<u8>> {
        let content = self
            .resolver
            .resolve_record(key, owner, index, Source::Chunked)
            .await?
            .ok_or_else(|| SdkError::NotFound {
                key: *key,
                owner: owner.clone(),
            })?;
        info!(root = %key, bytes = content.len(), "download finished");
        Ok(content)
    }
}

impl std::fmt::Debug for Quire {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Quire")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
