//! Policy, signer and guardian records

use std::collections::BTreeMap;

use chrono::Duration;
use quorum_core::{AccountId, PrincipalId, Threshold, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::error::{PolicyError, PolicyResult};

/// Largest weight a single member may carry (weights are stored as SQLite
/// INTEGER)
pub const MAX_WEIGHT: u64 = i64::MAX as u64;

/// Which approval family a member list belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApprovalKind {
    Transaction,
    Recovery,
}

/// Role of a transaction signer
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SignerRole {
    Operator,
    Supervisor,
    Emergency,
}

impl SignerRole {
    /// Supervisors and emergency signers may veto a transaction
    pub fn can_veto(&self) -> bool {
        matches!(self, SignerRole::Supervisor | SignerRole::Emergency)
    }
}

/// Relationship of a recovery guardian to the account owner
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GuardianCategory {
    Family,
    Friend,
    Professional,
    Emergency,
}

fn default_active() -> bool {
    true
}

/// Caller-supplied transaction policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPolicyConfig {
    #[serde(default = "default_active")]
    pub active: bool,
    pub required_signatures: u32,
    pub required_weight: u64,
    #[serde(with = "quorum_core::window::secs")]
    pub timelock_duration: Duration,
    #[serde(with = "quorum_core::window::secs")]
    pub expiration_duration: Duration,
    /// Proposals at or below this value do not need multi-party approval
    #[serde(default)]
    pub value_threshold: Decimal,
}

impl TransactionPolicyConfig {
    pub fn validate(&self) -> PolicyResult<()> {
        if self.required_signatures == 0 {
            return Err(PolicyError::invalid("required_signatures must be at least 1"));
        }
        if self.required_weight == 0 {
            return Err(PolicyError::invalid("required_weight must be at least 1"));
        }
        if self.timelock_duration < Duration::zero() {
            return Err(PolicyError::invalid("timelock_duration must not be negative"));
        }
        if self.expiration_duration <= self.timelock_duration {
            return Err(PolicyError::invalid(
                "expiration_duration must exceed timelock_duration",
            ));
        }
        if self.value_threshold.is_sign_negative() {
            return Err(PolicyError::invalid("value_threshold must not be negative"));
        }
        Ok(())
    }
}

/// Stored transaction policy of one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountPolicy {
    pub account_id: AccountId,
    pub active: bool,
    pub required_signatures: u32,
    pub required_weight: u64,
    #[serde(with = "quorum_core::window::secs")]
    pub timelock_duration: Duration,
    #[serde(with = "quorum_core::window::secs")]
    pub expiration_duration: Duration,
    pub value_threshold: Decimal,
    pub updated_at: Timestamp,
}

impl AccountPolicy {
    pub fn threshold(&self) -> Threshold {
        Threshold::new(self.required_signatures, self.required_weight)
    }

    /// Whether a proposal of this value needs multi-party approval
    pub fn requires_approval(&self, value: Decimal) -> bool {
        value > self.value_threshold
    }
}

/// Signer to be enrolled on an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSigner {
    pub principal_id: PrincipalId,
    pub role: SignerRole,
    pub weight: u64,
}

impl NewSigner {
    pub fn new(principal_id: impl Into<PrincipalId>, role: SignerRole, weight: u64) -> Self {
        Self {
            principal_id: principal_id.into(),
            role,
            weight,
        }
    }
}

/// Enrolled signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    pub account_id: AccountId,
    pub principal_id: PrincipalId,
    pub role: SignerRole,
    pub weight: u64,
    pub active: bool,
    pub added_at: Timestamp,
}

/// Caller-supplied recovery policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryPolicyConfig {
    #[serde(default = "default_active")]
    pub active: bool,
    pub required_approvals: u32,
    pub required_weight: u64,
    #[serde(with = "quorum_core::window::secs")]
    pub recovery_delay: Duration,
    #[serde(with = "quorum_core::window::secs")]
    pub approval_window: Duration,
    #[serde(with = "quorum_core::window::secs")]
    pub cooldown_period: Duration,
}

impl RecoveryPolicyConfig {
    pub fn validate(&self) -> PolicyResult<()> {
        if self.required_approvals == 0 {
            return Err(PolicyError::invalid("required_approvals must be at least 1"));
        }
        if self.required_weight == 0 {
            return Err(PolicyError::invalid("required_weight must be at least 1"));
        }
        if self.recovery_delay < Duration::zero() {
            return Err(PolicyError::invalid("recovery_delay must not be negative"));
        }
        if self.approval_window <= Duration::zero() {
            return Err(PolicyError::invalid("approval_window must be positive"));
        }
        if self.cooldown_period < Duration::zero() {
            return Err(PolicyError::invalid("cooldown_period must not be negative"));
        }
        Ok(())
    }
}

/// Stored recovery policy of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardianPolicy {
    pub account_id: AccountId,
    pub active: bool,
    pub required_approvals: u32,
    pub required_weight: u64,
    #[serde(with = "quorum_core::window::secs")]
    pub recovery_delay: Duration,
    #[serde(with = "quorum_core::window::secs")]
    pub approval_window: Duration,
    #[serde(with = "quorum_core::window::secs")]
    pub cooldown_period: Duration,
    pub updated_at: Timestamp,
}

impl GuardianPolicy {
    pub fn threshold(&self) -> Threshold {
        Threshold::new(self.required_approvals, self.required_weight)
    }
}

/// Guardian to be enrolled on an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGuardian {
    pub principal_id: PrincipalId,
    pub category: GuardianCategory,
    pub weight: u64,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl NewGuardian {
    pub fn new(principal_id: impl Into<PrincipalId>, category: GuardianCategory, weight: u64) -> Self {
        Self {
            principal_id: principal_id.into(),
            category,
            weight,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Enrolled guardian
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guardian {
    pub account_id: AccountId,
    pub principal_id: PrincipalId,
    pub category: GuardianCategory,
    pub weight: u64,
    pub active: bool,
    pub added_at: Timestamp,
    pub metadata: BTreeMap<String, String>,
}

/// Score boundaries used to grade risk assessments
///
/// `score < low` is Low, `< medium` Medium, `< high` High, anything above
/// Critical. An assessment fails once `score >= reject_threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
    pub reject_threshold: u32,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low: 20,
            medium: 50,
            high: 80,
            reject_threshold: 80,
        }
    }
}

impl RiskThresholds {
    pub fn validate(&self) -> PolicyResult<()> {
        if !(self.low < self.medium && self.medium < self.high) {
            return Err(PolicyError::invalid(
                "risk thresholds must satisfy low < medium < high",
            ));
        }
        if self.reject_threshold == 0 {
            return Err(PolicyError::invalid("reject_threshold must be positive"));
        }
        Ok(())
    }
}

pub(crate) fn validate_weight(weight: u64) -> PolicyResult<()> {
    if weight == 0 {
        return Err(PolicyError::invalid("weight must be positive"));
    }
    if weight > MAX_WEIGHT {
        return Err(PolicyError::invalid(format!("weight exceeds {}", MAX_WEIGHT)));
    }
    Ok(())
}
