//! Pending transaction data structures

use quorum_core::{AccountId, ApprovalSet, PrincipalId, Tally, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum_macros::{AsRefStr, Display, EnumString};

/// Status of a pending transaction
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionStatus {
    /// Collecting approvals
    Pending,
    /// Threshold reached, waiting for the timelock and execution
    Approved,
    /// Carried out by the backend
    Executed,
    /// Vetoed
    Rejected,
    /// Ran out of time before execution
    Expired,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Executed | TransactionStatus::Rejected | TransactionStatus::Expired
        )
    }
}

/// A proposed transaction awaiting approval or execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    /// Content-derived identifier (`TX-` + hex)
    pub id: String,
    pub account_id: AccountId,
    pub proposer: PrincipalId,
    pub target: String,
    pub value: Decimal,
    pub payload: String,
    /// SHA-256 of the payload
    pub payload_hash: String,
    pub status: TransactionStatus,
    pub created_at: Timestamp,
    /// `created_at + expiration_duration` as configured at proposal time
    pub expires_at: Timestamp,
    pub approved_at: Option<Timestamp>,
    pub executed_at: Option<Timestamp>,
    pub approvals: ApprovalSet,
    pub approved_weight: u64,
    pub rejected_by: Option<PrincipalId>,
    pub rejection_reason: Option<String>,
    /// Backend receipt reference once executed
    pub execution_reference: Option<String>,
}

impl PendingTransaction {
    /// Create a new pending transaction
    ///
    /// `nonce` distinguishes otherwise identical proposals on one account.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        account_id: AccountId,
        proposer: PrincipalId,
        target: String,
        value: Decimal,
        payload: String,
        created_at: Timestamp,
        expires_at: Timestamp,
        nonce: u64,
    ) -> Self {
        let payload_hash = hex::encode(Sha256::digest(payload.as_bytes()));
        let id = Self::derive_id(&account_id, &target, value, &payload_hash, created_at, nonce);

        Self {
            id,
            account_id,
            proposer,
            target,
            value,
            payload,
            payload_hash,
            status: TransactionStatus::Pending,
            created_at,
            expires_at,
            approved_at: None,
            executed_at: None,
            approvals: ApprovalSet::new(),
            approved_weight: 0,
            rejected_by: None,
            rejection_reason: None,
            execution_reference: None,
        }
    }

    fn derive_id(
        account: &AccountId,
        target: &str,
        value: Decimal,
        payload_hash: &str,
        created_at: Timestamp,
        nonce: u64,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(account.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(target.as_bytes());
        hasher.update(b"|");
        hasher.update(value.normalize().to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(payload_hash.as_bytes());
        hasher.update(b"|");
        hasher.update(created_at.to_rfc3339().as_bytes());
        hasher.update(b"|");
        hasher.update(nonce.to_be_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("TX-{}", &digest[..16])
    }

    /// Count and weight of the approvals collected so far
    pub fn tally(&self) -> Tally {
        self.approvals.tally()
    }
}
