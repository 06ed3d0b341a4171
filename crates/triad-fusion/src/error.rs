use thiserror::Error;

/// Errors from fusion configuration.
#[derive(Debug, Error)]
pub enum FusionError {
    #[error("invalid fusion weights: {0}")]
    InvalidWeights(String),
}

/// Convenience type alias for fusion results.
pub type FusionOutcome<T> = Result<T, FusionError>;
