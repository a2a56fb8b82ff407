use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use quire_manifest::{codec, Reference, Source, TagSpan};
use quire_pack::Packer;
use quire_store::LedgerClient;
use quire_types::{Key, Owner};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::config::ResolverConfig;
use crate::error::{ResolveError, ResolveResult};
use crate::visited::{VisitKey, VisitedSet};

type BoxedLayer = Pin<Box<dyn Future<Output = Vec<u8>> + Send>>;

/// Recursively expands reference tags into the content they name.
///
/// Cheap to clone; clones share the ledger client.
#[derive(Clone)]
pub struct Resolver {
    inner: Arc<Inner>,
}

struct Inner {
    client: Arc<dyn LedgerClient>,
    packer: Packer,
    config: ResolverConfig,
}

/// Owners in scope for one layer.
#[derive(Clone)]
struct Scope {
    fallback: Owner,
    inherited: Option<Owner>,
}

impl Scope {
    fn owner_for(&self, reference: &Reference) -> Owner {
        reference
            .operator
            .clone()
            .or_else(|| self.inherited.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Resolver {
    pub fn new(
        client: Arc<dyn LedgerClient>,
        packer: Packer,
        config: ResolverConfig,
    ) -> ResolveResult<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                client,
                packer,
                config,
            }),
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.inner.config
    }

    /// Expand every reference in `content`, up to `max_depth` layers.
    ///
    /// Content that is not UTF-8 or holds no tags is returned unchanged, as
    /// is anything once the depth budget is spent. References that fail to
    /// resolve become empty bytes; references already in `visited` on the
    /// current branch become the cycle sentinel.
    pub async fn resolve(
        &self,
        content: Vec<u8>,
        default_owner: &Owner,
        max_depth: u32,
        visited: VisitedSet,
    ) -> Vec<u8> {
        let scope = Scope {
            fallback: default_owner.clone(),
            inherited: None,
        };
        self.clone()
            .resolve_layer(content, scope, max_depth, visited)
            .await
    }

    /// Fetch a record and fully resolve it with the configured depth.
    ///
    /// Returns `Ok(None)` if the record itself does not exist. Failures below
    /// the root are substituted, never returned.
    pub async fn resolve_record(
        &self,
        key: &Key,
        owner: &Owner,
        index: Option<u64>,
        source: Source,
    ) -> ResolveResult<Option<Vec<u8>>> {
        let Some(content) = self.fetch(Backend::from(source), key, owner, index).await? else {
            return Ok(None);
        };
        let visited = VisitedSet::new().with(VisitKey::new(*key, owner.clone(), index));
        let resolved = self
            .resolve(content, owner, self.inner.config.max_depth, visited)
            .await;
        Ok(Some(resolved))
    }

    fn resolve_layer(
        self,
        content: Vec<u8>,
        scope: Scope,
        depth: u32,
        visited: VisitedSet,
    ) -> BoxedLayer {
        Box::pin(async move {
            if depth == 0 {
                return content;
            }
            let Ok(text) = std::str::from_utf8(&content) else {
                return content;
            };
            let spans: Vec<TagSpan> = codec::scan(text).collect();
            if spans.is_empty() {
                return content;
            }

            let batch_size = self.inner.config.batch_size;
            let mut resolved = vec![Vec::new(); spans.len()];
            for (batch_no, batch) in spans.chunks(batch_size).enumerate() {
                let mut tasks = JoinSet::new();
                for (offset, span) in batch.iter().enumerate() {
                    let slot = batch_no * batch_size + offset;
                    let this = self.clone();
                    let reference = span.reference.clone();
                    let scope = scope.clone();
                    let visited = visited.clone();
                    tasks.spawn(async move {
                        let bytes = this.resolve_reference(reference, scope, depth, visited).await;
                        (slot, bytes)
                    });
                }
                while let Some(joined) = tasks.join_next().await {
                    match joined {
                        Ok((slot, bytes)) => resolved[slot] = bytes,
                        Err(e) => warn!(error = %e, "reference task failed; substituting empty"),
                    }
                }
            }
            debug!(depth, references = spans.len(), "resolved layer");
            splice(&content, &spans, resolved)
        })
    }

    async fn resolve_reference(
        self,
        reference: Reference,
        scope: Scope,
        depth: u32,
        visited: VisitedSet,
    ) -> Vec<u8> {
        let key = match reference.key() {
            Ok(key) => key,
            Err(e) => {
                warn!(hash = %reference.hash, error = %e, "unreadable reference key; substituting empty");
                return Vec::new();
            }
        };
        let owner = scope.owner_for(&reference);
        let visit = VisitKey::new(key, owner.clone(), reference.index);
        if visited.contains(&visit) {
            debug!(key = %key.short_hex(), owner = %owner, "cycle detected");
            return self.inner.config.cycle_sentinel.as_bytes().to_vec();
        }

        let backend = Backend::from(reference.source);
        match self.fetch(backend, &key, &owner, reference.index).await {
            Ok(Some(content)) => {
                let child = Scope {
                    fallback: scope.fallback,
                    inherited: Some(owner),
                };
                self.resolve_layer(content, child, depth - 1, visited.with(visit))
                    .await
            }
            Ok(None) => {
                warn!(key = %key.short_hex(), owner = %owner, "referenced record not found; substituting empty");
                Vec::new()
            }
            Err(e) => {
                warn!(key = %key.short_hex(), owner = %owner, error = %e, "fetch failed; substituting empty");
                Vec::new()
            }
        }
    }

    async fn fetch(
        &self,
        backend: Backend,
        key: &Key,
        owner: &Owner,
        index: Option<u64>,
    ) -> ResolveResult<Option<Vec<u8>>> {
        let fetch = backend.fetch(
            self.inner.client.as_ref(),
            &self.inner.packer,
            key,
            owner,
            index,
        );
        match self.inner.config.fetch_timeout() {
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .map_err(|_| ResolveError::Timeout(limit))?,
            None => fetch.await,
        }
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Replace each span of `content` with its resolved bytes.
fn splice(content: &[u8], spans: &[TagSpan], resolved: Vec<Vec<u8>>) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len());
    let mut cursor = 0;
    for (span, bytes) in spans.iter().zip(resolved) {
        out.extend_from_slice(&content[cursor..span.range.start]);
        out.extend_from_slice(&bytes);
        cursor = span.range.end;
    }
    out.extend_from_slice(&content[cursor..]);
    out
}
