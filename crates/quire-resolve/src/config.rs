use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, ResolveResult};

/// Resolver tuning knobs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// References fetched concurrently per batch within one layer.
    pub batch_size: usize,
    /// Default number of expansion layers for record resolution.
    pub max_depth: u32,
    /// Per-fetch timeout in milliseconds. `None` waits indefinitely.
    pub fetch_timeout_ms: Option<u64>,
    /// Bytes substituted for a reference that would close a cycle.
    pub cycle_sentinel: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            max_depth: 8,
            fetch_timeout_ms: None,
            cycle_sentinel: String::new(),
        }
    }
}

impl ResolverConfig {
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> ResolveResult<()> {
        if self.batch_size == 0 {
            return Err(ResolveError::Config("batch_size must be at least 1".into()));
        }
        if self.fetch_timeout_ms == Some(0) {
            return Err(ResolveError::Config(
                "fetch_timeout_ms must be positive when set".into(),
            ));
        }
        Ok(())
    }
}
