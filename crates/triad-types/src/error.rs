use thiserror::Error;

/// Errors raised while constructing data-model values.
#[derive(Debug, Error)]
pub enum TypesError {
    #[error("mood vector must have {expected} components, got {actual}")]
    MoodDimension { expected: usize, actual: usize },

    #[error("mood vector component {index} is not finite: {value}")]
    NonFiniteComponent { index: usize, value: f64 },

    #[error("emotion score for '{label}' out of range: {value} (must be 0.0..=1.0)")]
    ScoreOutOfRange { label: String, value: f64 },

    #[error("dominant emotion '{label}' has no score")]
    UnknownDominant { label: String },

    #[error("mood vector must be unit length, got norm {norm}")]
    NonUnitMood { norm: f64 },
}

/// Convenience type alias for data-model results.
pub type TypesResult<T> = Result<T, TypesError>;
