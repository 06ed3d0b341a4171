use std::path::PathBuf;

use thiserror::Error;

/// Rule-set loading failures. Any of these prevents startup.
#[derive(Debug, Error)]
pub enum PolicyConfigError {
    #[error("cannot read rule set {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed rule set: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid rule set: {0}")]
    Invalid(String),
}

/// Convenience type alias for policy results.
pub type PolicyResult<T> = Result<T, PolicyConfigError>;
