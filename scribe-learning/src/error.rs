//! Error types for the learning engine

use thiserror::Error;

/// Errors returned by a [`LearningBackend`](crate::backend::LearningBackend)
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Not authenticated with the backend")]
    Unauthenticated,

    #[error("Backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Failed to decode backend response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Whether the failure is about reaching the backend rather than the data.
    ///
    /// Connectivity failures are redirected into the offline queue.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Unauthenticated)
    }
}

/// Top-level error type for the learning engine
#[derive(Debug, Error)]
pub enum LearningError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Offline queue error: {0}")]
    Queue(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LearningError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_classification() {
        assert!(BackendError::Unavailable("timeout".into()).is_connectivity());
        assert!(BackendError::Unauthenticated.is_connectivity());
        assert!(
            !BackendError::Rejected {
                status: 400,
                message: "bad row".into()
            }
            .is_connectivity()
        );
        assert!(!BackendError::Decode("eof".into()).is_connectivity());
    }

    #[test]
    fn test_backend_error_converts() {
        let err: LearningError = BackendError::Unauthenticated.into();
        assert!(matches!(err, LearningError::Backend(_)));
        assert_eq!(
            err.to_string(),
            "Backend error: Not authenticated with the backend"
        );
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: LearningError = json_err.into();
        assert!(matches!(err, LearningError::Serialization(_)));
    }
}
