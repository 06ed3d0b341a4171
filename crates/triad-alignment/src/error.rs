use thiserror::Error;

/// Alignment store errors.
#[derive(Debug, Error)]
pub enum AlignmentError {
    /// Profile state could not be durably written or read back.
    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("lock poisoned")]
    LockError,
}

impl AlignmentError {
    /// True for failures that mean state was not durably stored.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            AlignmentError::Persistence(_) | AlignmentError::Io(_) | AlignmentError::Serialization(_)
        )
    }
}

/// Convenience type alias for alignment results.
pub type AlignmentResult<T> = Result<T, AlignmentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let e = AlignmentError::Persistence("disk full".into());
        assert_eq!(e.to_string(), "persistence failure: disk full");

        let e = AlignmentError::InvalidInput("empty user id".into());
        assert!(e.to_string().contains("empty user id"));
    }

    #[test]
    fn io_errors_count_as_persistence() {
        let e: AlignmentError = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert!(e.is_persistence());
        assert!(!AlignmentError::LockError.is_persistence());
    }
}
