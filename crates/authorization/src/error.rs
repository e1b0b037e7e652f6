//! Authorization errors

use quorum_backend::BackendError;
use quorum_compliance::ComplianceError;
use quorum_core::{AccountId, ErrorKind, PrincipalId};
use quorum_policy::PolicyError;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::pending::TransactionStatus;

/// Errors from the authorization workflow
#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("No active transaction policy for account {0}")]
    PolicyInactive(AccountId),

    #[error("Value {value} does not exceed the approval threshold {threshold}")]
    BelowThreshold { value: Decimal, threshold: Decimal },

    #[error("{principal} is not authorized: {reason}")]
    Unauthorized { principal: PrincipalId, reason: String },

    #[error("{principal} already approved {id}")]
    AlreadyApproved { id: String, principal: PrincipalId },

    #[error("Transaction {0} already executed")]
    AlreadyExecuted(String),

    #[error("Transaction {id} is {status}, not approved")]
    NotApproved { id: String, status: TransactionStatus },

    #[error("Transaction {0} has expired")]
    RequestExpired(String),

    #[error("Transaction {id} is time-locked for another {remaining_secs}s")]
    TimelockNotElapsed { id: String, remaining_secs: i64 },

    #[error("Transaction {id} is {status}")]
    InvalidState { id: String, status: TransactionStatus },

    #[error("Transaction not found: {0}")]
    NotFound(String),

    #[error("Party {party} is on sanction list {list}")]
    SanctionedParty { party: String, list: String },

    #[error("Identity of {0} is not verified")]
    IdentityNotVerified(PrincipalId),

    #[error("Risk score {score} reaches the rejection threshold")]
    RiskRejected { score: u32 },

    #[error("Execution backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Policy store error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Compliance error: {0}")]
    Compliance(#[from] ComplianceError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuthorizationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthorizationError::PolicyInactive(_) => ErrorKind::PolicyInactive,
            AuthorizationError::BelowThreshold { .. } => ErrorKind::BelowThreshold,
            AuthorizationError::Unauthorized { .. } => ErrorKind::Unauthorized,
            AuthorizationError::AlreadyApproved { .. } => ErrorKind::AlreadyApproved,
            AuthorizationError::AlreadyExecuted(_) => ErrorKind::AlreadyExecuted,
            AuthorizationError::NotApproved { .. } => ErrorKind::NotApproved,
            AuthorizationError::RequestExpired(_) => ErrorKind::RequestExpired,
            AuthorizationError::TimelockNotElapsed { .. } => ErrorKind::TimelockNotElapsed,
            AuthorizationError::InvalidState { .. } => ErrorKind::InvalidState,
            AuthorizationError::NotFound(_) => ErrorKind::NotFound,
            AuthorizationError::SanctionedParty { .. } => ErrorKind::SanctionedParty,
            AuthorizationError::IdentityNotVerified(_) => ErrorKind::IdentityNotVerified,
            AuthorizationError::RiskRejected { .. } => ErrorKind::RiskRejected,
            AuthorizationError::Backend(e) => e.kind(),
            AuthorizationError::Policy(e) => e.kind(),
            AuthorizationError::Compliance(e) => e.kind(),
            AuthorizationError::Database(_) | AuthorizationError::Serialization(_) => {
                ErrorKind::Storage
            }
        }
    }

    pub fn unauthorized(principal: &PrincipalId, reason: impl Into<String>) -> Self {
        AuthorizationError::Unauthorized {
            principal: principal.clone(),
            reason: reason.into(),
        }
    }
}

/// Result type for authorization operations
pub type AuthorizationResult<T> = Result<T, AuthorizationError>;
