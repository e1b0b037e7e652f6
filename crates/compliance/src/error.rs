//! Compliance errors

use quorum_core::ErrorKind;
use quorum_policy::PolicyError;
use thiserror::Error;

/// Errors from the Compliance Engine
#[derive(Debug, Error)]
pub enum ComplianceError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Sanction list not found: {0}")]
    ListNotFound(String),

    #[error("Policy store error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl ComplianceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ComplianceError::ConfigError(_) => ErrorKind::InvalidPolicy,
            ComplianceError::ListNotFound(_) => ErrorKind::NotFound,
            ComplianceError::Policy(e) => e.kind(),
            ComplianceError::Database(_)
            | ComplianceError::IoError(_)
            | ComplianceError::SerdeError(_) => ErrorKind::Storage,
        }
    }
}

/// Result type for compliance operations
pub type ComplianceResult<T> = Result<T, ComplianceError>;
