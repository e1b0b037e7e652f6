//! Backend error types

use quorum_core::ErrorKind;
use thiserror::Error;

/// Why a backend did not carry out an action
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend refused the action; nothing happened
    #[error("Backend rejected the action: {0}")]
    Rejected(String),

    /// The backend could not be reached; nothing happened
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete in time; the action may or may not have
    /// happened
    #[error("Backend timed out after {0}ms, outcome unknown")]
    Timeout(u64),
}

impl BackendError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ExecutionBackendError
    }

    /// False when the action may have been carried out despite the error
    pub fn outcome_known(&self) -> bool {
        !matches!(self, BackendError::Timeout(_))
    }

    /// Short machine-readable name of the failure class
    pub fn class(&self) -> &'static str {
        match self {
            BackendError::Rejected(_) => "rejected",
            BackendError::Unavailable(_) => "unavailable",
            BackendError::Timeout(_) => "timeout",
        }
    }
}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        BackendError::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        BackendError::Rejected(format!("unencodable action: {}", e))
    }
}

/// Result type for backend calls
pub type BackendResult<T> = Result<T, BackendError>;
