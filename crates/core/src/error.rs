//! Error taxonomy shared by all engines
//!
//! Each crate has its own error enum; all of them map onto one of these
//! kinds so callers (and the RPC layer) can react uniformly.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum ErrorKind {
    InvalidPolicy,
    PolicyNotConfigured,
    PolicyInactive,
    Unauthorized,
    AlreadyApproved,
    AlreadyExecuted,
    NotApproved,
    RequestExpired,
    TimelockNotElapsed,
    DelayNotElapsed,
    CooldownActive,
    SanctionedParty,
    IdentityNotVerified,
    ExecutionBackendError,
    BelowThreshold,
    RiskRejected,
    NotFound,
    InvalidState,
    Storage,
}

impl ErrorKind {
    /// Only backend failures are worth retrying as-is
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::ExecutionBackendError)
    }
}
