//! Policy store errors

use quorum_core::{AccountId, ErrorKind, PrincipalId};
use thiserror::Error;

use crate::types::ApprovalKind;

/// Errors from the policy store
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("No active {kind} policy configured for account {account}")]
    NotConfigured {
        account: AccountId,
        kind: ApprovalKind,
    },

    #[error("{principal} is already a {kind} member of {account}")]
    DuplicateMember {
        account: AccountId,
        principal: PrincipalId,
        kind: ApprovalKind,
    },

    #[error("{principal} is not a {kind} member of {account}")]
    MemberNotFound {
        account: AccountId,
        principal: PrincipalId,
        kind: ApprovalKind,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl PolicyError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        PolicyError::InvalidPolicy(reason.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PolicyError::InvalidPolicy(_) | PolicyError::DuplicateMember { .. } => {
                ErrorKind::InvalidPolicy
            }
            PolicyError::NotConfigured { .. } => ErrorKind::PolicyNotConfigured,
            PolicyError::MemberNotFound { .. } => ErrorKind::NotFound,
            PolicyError::Database(_) | PolicyError::Serialization(_) | PolicyError::Corrupt(_) => {
                ErrorKind::Storage
            }
        }
    }
}

/// Result type for policy store operations
pub type PolicyResult<T> = Result<T, PolicyError>;
