use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use triad_alignment::AlignmentError;
use triad_consolidation::ConsolidationError;
use triad_fusion::FusionError;
use triad_policy::PolicyConfigError;

/// The three external analyzers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerKind {
    Emotion,
    Linguistic,
    Interaction,
}

impl AnalyzerKind {
    pub fn as_str(&self) -> &str {
        match self {
            AnalyzerKind::Emotion => "emotion",
            AnalyzerKind::Linguistic => "linguistic",
            AnalyzerKind::Interaction => "interaction",
        }
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An analyzer errored or timed out. Fatal for its input unit only.
#[derive(Debug, Error)]
pub enum AnalyzerFailure {
    #[error("{analyzer} analyzer failed: {reason}")]
    Failed {
        analyzer: AnalyzerKind,
        reason: String,
    },

    #[error("{analyzer} analyzer timed out after {}ms", .timeout.as_millis())]
    TimedOut {
        analyzer: AnalyzerKind,
        timeout: Duration,
    },
}

impl AnalyzerFailure {
    pub fn analyzer(&self) -> AnalyzerKind {
        match self {
            AnalyzerFailure::Failed { analyzer, .. } | AnalyzerFailure::TimedOut { analyzer, .. } => {
                *analyzer
            }
        }
    }
}

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Analyzer(#[from] AnalyzerFailure),

    #[error(transparent)]
    Policy(#[from] PolicyConfigError),

    #[error("alignment store error: {0}")]
    Alignment(#[from] AlignmentError),

    #[error(transparent)]
    Fusion(#[from] FusionError),

    #[error("consolidation error: {0}")]
    Consolidation(#[from] ConsolidationError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<config::ConfigError> for RuntimeError {
    fn from(e: config::ConfigError) -> Self {
        RuntimeError::Config(e.to_string())
    }
}

/// Convenience type alias for runtime results.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyzer_failure_display() {
        let e = AnalyzerFailure::TimedOut {
            analyzer: AnalyzerKind::Emotion,
            timeout: Duration::from_millis(250),
        };
        assert_eq!(e.to_string(), "emotion analyzer timed out after 250ms");
        assert_eq!(e.analyzer(), AnalyzerKind::Emotion);

        let e: RuntimeError = AnalyzerFailure::Failed {
            analyzer: AnalyzerKind::Linguistic,
            reason: "model not loaded".into(),
        }
        .into();
        assert_eq!(e.to_string(), "linguistic analyzer failed: model not loaded");
    }

    #[test]
    fn persistence_failure_surfaces() {
        let e: RuntimeError = AlignmentError::Persistence("disk full".into()).into();
        assert!(e.to_string().contains("disk full"));
    }
}
