use thiserror::Error;

use triad_alignment::AlignmentError;

use crate::consolidator::ConsolidationStage;

/// Consolidation errors.
#[derive(Debug, Error)]
pub enum ConsolidationError {
    /// A stage failed; the run committed nothing.
    #[error("{stage} stage failed: {reason}")]
    StageFailed {
        stage: ConsolidationStage,
        reason: String,
    },

    #[error("collaborator store error: {0}")]
    Collaborator(String),

    #[error("cleanup error: {0}")]
    Cleanup(String),

    #[error("report sink error: {0}")]
    ReportSink(String),

    #[error("alignment store error: {0}")]
    Alignment(#[from] AlignmentError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid scheduler configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience type alias for consolidation results.
pub type ConsolidationResult<T> = Result<T, ConsolidationError>;
