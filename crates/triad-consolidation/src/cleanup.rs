//! The cleanup stage.
//!
//! Disabled by default ([`NoopCleanup`]). [`AgeBasedCleanup`] prunes
//! records older than a maximum age from each configured store; switching
//! between them changes nothing for callers of the consolidator.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::collaborators::PrunableStore;
use crate::error::{ConsolidationError, ConsolidationResult};

/// What one cleanup pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupOutcome {
    pub skipped: bool,
    /// Store name → records pruned.
    pub pruned: Vec<(String, u64)>,
}

impl CleanupOutcome {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            pruned: Vec::new(),
        }
    }

    pub fn total_pruned(&self) -> u64 {
        self.pruned.iter().map(|(_, n)| n).sum()
    }
}

#[async_trait]
pub trait CleanupStage: Send + Sync {
    async fn cleanup(&self) -> ConsolidationResult<CleanupOutcome>;
}

/// Cleanup that does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCleanup;

#[async_trait]
impl CleanupStage for NoopCleanup {
    async fn cleanup(&self) -> ConsolidationResult<CleanupOutcome> {
        debug!("Cleanup disabled; skipping");
        Ok(CleanupOutcome::skipped())
    }
}

/// Prune every store of records older than `max_age`.
pub struct AgeBasedCleanup {
    stores: Vec<Arc<dyn PrunableStore>>,
    max_age: Duration,
}

impl AgeBasedCleanup {
    pub fn new(stores: Vec<Arc<dyn PrunableStore>>, max_age: Duration) -> ConsolidationResult<Self> {
        if max_age <= Duration::zero() {
            return Err(ConsolidationError::InvalidConfig(
                "cleanup max age must be positive".into(),
            ));
        }
        Ok(Self { stores, max_age })
    }
}

#[async_trait]
impl CleanupStage for AgeBasedCleanup {
    async fn cleanup(&self) -> ConsolidationResult<CleanupOutcome> {
        let cutoff = Utc::now() - self.max_age;
        let mut outcome = CleanupOutcome::default();

        for store in &self.stores {
            let pruned = store.prune_older_than(cutoff).await.map_err(|e| {
                ConsolidationError::Cleanup(format!("{}: {}", store.name(), e))
            })?;
            info!(store = store.name(), pruned, cutoff = %cutoff, "Pruned stale records");
            outcome.pruned.push((store.name().to_string(), pruned));
        }
        Ok(outcome)
    }
}
