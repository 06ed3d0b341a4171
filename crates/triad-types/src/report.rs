use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::profile::AlignmentStats;

/// Outcome of the collaborator-store validation stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ValidationStatus {
    /// All record counts were readable and non-negative.
    Valid,
    /// At least one count was unreadable or inconsistent.
    Degraded { reasons: Vec<String> },
}

impl ValidationStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ValidationStatus::Degraded { .. })
    }
}

/// Aggregate snapshot written by each successful consolidation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationReport {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub total_users: usize,
    pub mean_alignment: f64,
    pub min_alignment: f64,
    pub max_alignment: f64,
    pub total_interactions: u64,
    /// Embedding-store record count, if it could be read.
    pub embedding_count: Option<u64>,
    /// Concept-store record count, if it could be read.
    pub concept_count: Option<u64>,
    pub validation: ValidationStatus,
}

impl ConsolidationReport {
    pub fn from_stats(
        stats: &AlignmentStats,
        timestamp: DateTime<Utc>,
        embedding_count: Option<u64>,
        concept_count: Option<u64>,
        validation: ValidationStatus,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            timestamp,
            total_users: stats.total_users,
            mean_alignment: stats.mean_alignment,
            min_alignment: stats.min_alignment,
            max_alignment: stats.max_alignment,
            total_interactions: stats.total_interactions,
            embedding_count,
            concept_count,
            validation,
        }
    }
}
