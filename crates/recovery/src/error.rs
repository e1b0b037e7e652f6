//! Recovery errors

use quorum_backend::BackendError;
use quorum_core::{AccountId, ErrorKind, PrincipalId};
use quorum_policy::PolicyError;
use thiserror::Error;

use crate::request::RecoveryStatus;

/// Errors from the recovery workflow
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("No active recovery policy for account {0}")]
    PolicyInactive(AccountId),

    #[error("{principal} is not authorized: {reason}")]
    Unauthorized { principal: PrincipalId, reason: String },

    #[error("{principal} already approved {id}")]
    AlreadyApproved { id: String, principal: PrincipalId },

    #[error("Recovery {0} already executed")]
    AlreadyExecuted(String),

    #[error("Recovery {id} is {status}, not approved")]
    NotApproved { id: String, status: RecoveryStatus },

    #[error("Recovery {id} is delayed for another {remaining_secs}s")]
    DelayNotElapsed { id: String, remaining_secs: i64 },

    #[error("Account {account} is in recovery cooldown for another {remaining_secs}s")]
    CooldownActive { account: AccountId, remaining_secs: i64 },

    #[error("Recovery {id} is {status}")]
    InvalidState { id: String, status: RecoveryStatus },

    #[error("Recovery request not found: {0}")]
    NotFound(String),

    #[error("Execution backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Policy store error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RecoveryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecoveryError::PolicyInactive(_) => ErrorKind::PolicyInactive,
            RecoveryError::Unauthorized { .. } => ErrorKind::Unauthorized,
            RecoveryError::AlreadyApproved { .. } => ErrorKind::AlreadyApproved,
            RecoveryError::AlreadyExecuted(_) => ErrorKind::AlreadyExecuted,
            RecoveryError::NotApproved { .. } => ErrorKind::NotApproved,
            RecoveryError::DelayNotElapsed { .. } => ErrorKind::DelayNotElapsed,
            RecoveryError::CooldownActive { .. } => ErrorKind::CooldownActive,
            RecoveryError::InvalidState { .. } => ErrorKind::InvalidState,
            RecoveryError::NotFound(_) => ErrorKind::NotFound,
            RecoveryError::Backend(e) => e.kind(),
            RecoveryError::Policy(e) => e.kind(),
            RecoveryError::Database(_) | RecoveryError::Serialization(_) => ErrorKind::Storage,
        }
    }

    pub fn unauthorized(principal: &PrincipalId, reason: impl Into<String>) -> Self {
        RecoveryError::Unauthorized {
            principal: principal.clone(),
            reason: reason.into(),
        }
    }
}

/// Result type for recovery operations
pub type RecoveryResult<T> = Result<T, RecoveryError>;
