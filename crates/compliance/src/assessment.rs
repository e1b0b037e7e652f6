//! Risk levels and assessments

use std::cmp::Ordering;

use quorum_core::{ErrorKind, PrincipalId, Timestamp};
use quorum_policy::RiskThresholds;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Risk levels - ordered from lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl PartialOrd for RiskLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RiskLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        (*self as u8).cmp(&(*other as u8))
    }
}

impl RiskLevel {
    /// Grade a score: `< low` Low, `< medium` Medium, `< high` High, else
    /// Critical
    pub fn from_score(score: u32, thresholds: &RiskThresholds) -> Self {
        if score < thresholds.low {
            RiskLevel::Low
        } else if score < thresholds.medium {
            RiskLevel::Medium
        } else if score < thresholds.high {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }
}

/// Per-signal breakdown of a score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSignals {
    pub velocity: u32,
    pub magnitude: u32,
    pub payload: u32,
}

impl RiskSignals {
    pub fn total(&self) -> u32 {
        self.velocity
            .saturating_add(self.magnitude)
            .saturating_add(self.payload)
    }
}

/// Immutable result of one evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub principal_id: PrincipalId,
    pub target: String,
    pub value: Decimal,
    pub score: u32,
    pub risk_level: RiskLevel,
    pub signals: RiskSignals,
    /// Principal or target appears on an active sanction list
    pub sanctioned: bool,
    /// Principal's identity was verified and unexpired at `checked_at`
    pub verified: bool,
    pub passed: bool,
    pub checked_at: Timestamp,
}

impl RiskAssessment {
    /// Why a failed assessment must refuse the action, most severe first
    pub fn refusal(&self) -> Option<ErrorKind> {
        if self.passed {
            None
        } else if self.sanctioned {
            Some(ErrorKind::SanctionedParty)
        } else if !self.verified {
            Some(ErrorKind::IdentityNotVerified)
        } else {
            Some(ErrorKind::RiskRejected)
        }
    }
}
