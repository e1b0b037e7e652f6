//! Backend contract

use quorum_core::{AccountId, PrincipalId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BackendResult;

/// An approved transaction handed to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Id of the authorizing request, usable as an idempotency key
    pub request_id: String,
    pub account: AccountId,
    pub target: String,
    pub value: Decimal,
    pub payload: String,
}

/// An approved ownership change handed to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipTransfer {
    pub request_id: String,
    pub account: AccountId,
    pub new_owner: PrincipalId,
    /// Set when the transfer bypassed the recovery policy
    #[serde(default)]
    pub emergency: bool,
}

/// Backend acknowledgement of a carried-out action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub reference: String,
}

/// One line of the backend journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalRecord {
    Action {
        reference: String,
        #[serde(flatten)]
        action: ActionRequest,
        recorded_at: Timestamp,
    },
    OwnershipTransfer {
        reference: String,
        #[serde(flatten)]
        transfer: OwnershipTransfer,
        recorded_at: Timestamp,
    },
}

impl JournalRecord {
    pub fn reference(&self) -> &str {
        match self {
            JournalRecord::Action { reference, .. } => reference,
            JournalRecord::OwnershipTransfer { reference, .. } => reference,
        }
    }

    pub fn request_id(&self) -> &str {
        match self {
            JournalRecord::Action { action, .. } => &action.request_id,
            JournalRecord::OwnershipTransfer { transfer, .. } => &transfer.request_id,
        }
    }
}

/// Carries out approved actions
///
/// Calls are synchronous and may block. The engines never retry; a
/// [`crate::BackendError::Timeout`] leaves the outcome to be reconciled by
/// the caller.
pub trait ExecutionBackend: Send + Sync {
    fn execute_action(&self, action: &ActionRequest) -> BackendResult<Receipt>;

    fn transfer_ownership(&self, transfer: &OwnershipTransfer) -> BackendResult<Receipt>;
}
