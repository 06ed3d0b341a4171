//! Contracts for the analyzer-owned stores consolidation reads.
//!
//! The embedding store and the linguistic-concept store belong to the
//! external analyzers. Consolidation only asks them for record counts and,
//! when cleanup is enabled, to prune old records.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{ConsolidationError, ConsolidationResult};

/// Read access to a collaborator store's record count.
///
/// The count is signed on purpose: a negative value is reported as an
/// inconsistency rather than rejected at the type level.
#[async_trait]
pub trait RecordCounter: Send + Sync {
    fn name(&self) -> &str;

    async fn record_count(&self) -> ConsolidationResult<i64>;
}

/// Age-based pruning of a collaborator store.
#[async_trait]
pub trait PrunableStore: Send + Sync {
    fn name(&self) -> &str;

    /// Remove records created before `cutoff`; returns how many went.
    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> ConsolidationResult<u64>;
}

/// A counter with a settable value, for wiring without a real store.
pub struct FixedCounter {
    name: String,
    count: AtomicI64,
}

impl FixedCounter {
    pub fn new(name: impl Into<String>, count: i64) -> Self {
        Self {
            name: name.into(),
            count: AtomicI64::new(count),
        }
    }

    pub fn set(&self, count: i64) {
        self.count.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordCounter for FixedCounter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn record_count(&self) -> ConsolidationResult<i64> {
        Ok(self.count.load(Ordering::SeqCst))
    }
}

/// A counter for a store that is not reachable.
pub struct UnavailableCounter {
    name: String,
}

impl UnavailableCounter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl RecordCounter for UnavailableCounter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn record_count(&self) -> ConsolidationResult<i64> {
        Err(ConsolidationError::Collaborator(format!(
            "{} store is not available",
            self.name
        )))
    }
}
