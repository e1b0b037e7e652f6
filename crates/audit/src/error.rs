//! Audit errors

use quorum_core::ErrorKind;
use thiserror::Error;

/// Errors from an audit sink
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Audit sink unavailable: {0}")]
    Unavailable(String),
}

impl AuditError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Storage
    }
}

/// Result type for audit operations
pub type AuditResult<T> = Result<T, AuditError>;
