//! Audit events

use quorum_core::{AccountId, Timestamp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum_macros::{AsRefStr, Display, EnumString};

/// Severity of an audit event
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// What happened
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditAction {
    // Transactions
    TransactionProposed,
    TransactionApproved,
    TransactionThresholdReached,
    TransactionExecuted,
    TransactionExecutionFailed,
    TransactionRejected,
    TransactionExpired,
    // Recovery
    RecoveryInitiated,
    RecoveryApproved,
    RecoveryThresholdReached,
    RecoveryExecuted,
    RecoveryExecutionFailed,
    RecoveryRejected,
    EmergencyOverride,
    // Administration
    PolicyUpdated,
    EmergencyAuthorityGranted,
    EmergencyAuthorityRevoked,
    // Compliance
    RiskEvaluated,
    SanctionHit,
    SanctionListUpdated,
}

/// One immutable audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Position in the log, assigned by the sink on append
    #[serde(default)]
    pub sequence: u64,
    pub event_id: String,
    /// The request, account or principal the event is about
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountId>,
    pub action: AuditAction,
    pub actor: String,
    /// SHA-256 of the JSON-encoded event data
    pub data_hash: String,
    pub severity: Severity,
    pub timestamp: Timestamp,
}

impl AuditEvent {
    pub fn new<T: Serialize>(
        subject: impl Into<String>,
        action: AuditAction,
        actor: impl Into<String>,
        data: &T,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            sequence: 0,
            event_id: uuid::Uuid::new_v4().to_string(),
            subject: subject.into(),
            account: None,
            action,
            actor: actor.into(),
            data_hash: data_hash(data),
            severity: Severity::Info,
            timestamp,
        }
    }

    pub fn for_account(mut self, account: &AccountId) -> Self {
        self.account = Some(account.clone());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

/// Hex SHA-256 of a value's JSON encoding
///
/// Values that fail to serialize hash as the empty document.
pub fn data_hash<T: Serialize>(data: &T) -> String {
    let bytes = serde_json::to_vec(data).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}
