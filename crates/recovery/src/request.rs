//! Recovery request data structures

use quorum_core::{AccountId, ApprovalSet, PrincipalId, Timestamp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum_macros::{AsRefStr, Display, EnumString};

/// Status of a recovery request
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecoveryStatus {
    Initiated,
    Approved,
    Executed,
    Rejected,
}

impl RecoveryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecoveryStatus::Executed | RecoveryStatus::Rejected)
    }
}

/// A request to hand an account to a new owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryRequest {
    /// Content-derived identifier (`RCV-` + hex)
    pub id: String,
    pub account_id: AccountId,
    pub proposed_new_owner: PrincipalId,
    pub initiator: PrincipalId,
    pub status: RecoveryStatus,
    pub created_at: Timestamp,
    pub approved_at: Option<Timestamp>,
    pub executed_at: Option<Timestamp>,
    /// Every approval ever given, including ones that aged out
    pub approvals: ApprovalSet,
    /// Approvals inside the window at the last evaluation
    pub valid_approvals: u32,
    pub approved_weight: u64,
    pub rejected_by: Option<PrincipalId>,
    pub rejection_reason: Option<String>,
    pub execution_reference: Option<String>,
    /// Created by an emergency override rather than guardian approval
    #[serde(default)]
    pub emergency: bool,
}

impl RecoveryRequest {
    /// `nonce` distinguishes otherwise identical requests on one account
    pub fn new(
        account_id: AccountId,
        proposed_new_owner: PrincipalId,
        initiator: PrincipalId,
        created_at: Timestamp,
        nonce: u64,
    ) -> Self {
        let id = Self::derive_id(&account_id, &proposed_new_owner, created_at, nonce);
        Self {
            id,
            account_id,
            proposed_new_owner,
            initiator,
            status: RecoveryStatus::Initiated,
            created_at,
            approved_at: None,
            executed_at: None,
            approvals: ApprovalSet::new(),
            valid_approvals: 0,
            approved_weight: 0,
            rejected_by: None,
            rejection_reason: None,
            execution_reference: None,
            emergency: false,
        }
    }

    fn derive_id(account: &AccountId, new_owner: &PrincipalId, created_at: Timestamp, nonce: u64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(account.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(new_owner.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(created_at.to_rfc3339().as_bytes());
        hasher.update(b"|");
        hasher.update(nonce.to_be_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("RCV-{}", &digest[..16])
    }
}
