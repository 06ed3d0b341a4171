//! One consolidation run: validation, cleanup, reconciliation.
//!
//! Reconciliation is observational. It reads a snapshot of every profile,
//! computes aggregate statistics and persists a report; no profile's EMA
//! state is ever rewritten here.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use triad_alignment::AlignmentStore;
use triad_types::{AlignmentStats, ConsolidationReport, ValidationStatus};

use crate::cleanup::{CleanupOutcome, CleanupStage, NoopCleanup};
use crate::collaborators::RecordCounter;
use crate::error::{ConsolidationError, ConsolidationResult};
use crate::reports::ReportSink;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsolidationStage {
    Validation,
    Cleanup,
    Reconciliation,
}

impl ConsolidationStage {
    pub fn as_str(&self) -> &str {
        match self {
            ConsolidationStage::Validation => "validation",
            ConsolidationStage::Cleanup => "cleanup",
            ConsolidationStage::Reconciliation => "reconciliation",
        }
    }
}

impl fmt::Display for ConsolidationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the validation stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub embedding_count: Option<u64>,
    pub concept_count: Option<u64>,
    pub status: ValidationStatus,
}

/// Runs the three stages against the alignment store and collaborators.
pub struct Consolidator {
    store: Arc<dyn AlignmentStore>,
    embeddings: Arc<dyn RecordCounter>,
    concepts: Arc<dyn RecordCounter>,
    cleanup: Arc<dyn CleanupStage>,
    sink: Arc<dyn ReportSink>,
}

impl Consolidator {
    pub fn new(
        store: Arc<dyn AlignmentStore>,
        embeddings: Arc<dyn RecordCounter>,
        concepts: Arc<dyn RecordCounter>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            store,
            embeddings,
            concepts,
            cleanup: Arc::new(NoopCleanup),
            sink,
        }
    }

    pub fn with_cleanup(mut self, cleanup: Arc<dyn CleanupStage>) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn sink(&self) -> &Arc<dyn ReportSink> {
        &self.sink
    }

    /// Execute all stages. The report is persisted last, so a failure in
    /// any stage leaves no trace in the sink.
    pub async fn run(&self) -> ConsolidationResult<ConsolidationReport> {
        info!("Consolidation run starting");

        info!(stage = %ConsolidationStage::Validation, "Consolidation stage");
        let validation = self.validate().await;
        if let ValidationStatus::Degraded { reasons } = &validation.status {
            warn!(reasons = ?reasons, "Collaborator validation degraded");
        }

        info!(stage = %ConsolidationStage::Cleanup, "Consolidation stage");
        let cleanup = self
            .cleanup
            .cleanup()
            .await
            .map_err(|e| stage_failed(ConsolidationStage::Cleanup, e))?;
        log_cleanup(&cleanup);

        info!(stage = %ConsolidationStage::Reconciliation, "Consolidation stage");
        let report = self
            .reconcile(validation)
            .await
            .map_err(|e| stage_failed(ConsolidationStage::Reconciliation, e))?;

        info!(
            run_id = %report.run_id,
            total_users = report.total_users,
            mean_alignment = report.mean_alignment,
            degraded = report.validation.is_degraded(),
            "Consolidation run complete"
        );
        Ok(report)
    }

    /// Read both collaborator counts. Failures degrade, never abort.
    pub async fn validate(&self) -> ValidationOutcome {
        let mut reasons = Vec::new();
        let embedding_count = read_count(self.embeddings.as_ref(), &mut reasons).await;
        let concept_count = read_count(self.concepts.as_ref(), &mut reasons).await;

        let status = if reasons.is_empty() {
            ValidationStatus::Valid
        } else {
            ValidationStatus::Degraded { reasons }
        };
        ValidationOutcome {
            embedding_count,
            concept_count,
            status,
        }
    }

    async fn reconcile(
        &self,
        validation: ValidationOutcome,
    ) -> ConsolidationResult<ConsolidationReport> {
        let profiles = self.store.snapshot().await?;
        for p in &profiles {
            tracing::debug!(
                user_id = %p.user_id,
                alignment_score = p.alignment_score,
                interaction_count = p.interaction_count,
                "Profile observed"
            );
        }

        let stats = AlignmentStats::from_profiles(&profiles);
        let report = ConsolidationReport::from_stats(
            &stats,
            Utc::now(),
            validation.embedding_count,
            validation.concept_count,
            validation.status,
        );
        self.sink.persist(&report).await?;
        Ok(report)
    }
}

async fn read_count(counter: &dyn RecordCounter, reasons: &mut Vec<String>) -> Option<u64> {
    match counter.record_count().await {
        Ok(n) if n >= 0 => {
            info!(store = counter.name(), count = n, "Validated collaborator records");
            Some(n as u64)
        }
        Ok(n) => {
            reasons.push(format!("{} store reported negative count {}", counter.name(), n));
            None
        }
        Err(e) => {
            reasons.push(format!("{} store unreadable: {}", counter.name(), e));
            None
        }
    }
}

fn log_cleanup(outcome: &CleanupOutcome) {
    if outcome.skipped {
        info!("Cleanup skipped");
    } else {
        info!(pruned = outcome.total_pruned(), "Cleanup complete");
    }
}

fn stage_failed(stage: ConsolidationStage, e: ConsolidationError) -> ConsolidationError {
    ConsolidationError::StageFailed {
        stage,
        reason: e.to_string(),
    }
}
