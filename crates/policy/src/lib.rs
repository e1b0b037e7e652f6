//! # Quorum Policy Store
//!
//! Persistent per-account configuration for the two approval families:
//!
//! - **Transactions**: signer list, (count, weight) threshold, value
//!   threshold, timelock and expiration
//! - **Recovery**: guardian list, (count, weight) threshold, recovery delay,
//!   approval window and cooldown
//!
//! plus the global risk thresholds and the emergency-authority roster.
//!
//! The store is the only owner of these records. Engines read through it on
//! every operation and never keep copies between calls.

mod error;
pub mod sql;
mod store;
mod types;

pub use error::{PolicyError, PolicyResult};
pub use store::PolicyStore;
pub use types::{
    AccountPolicy, ApprovalKind, Guardian, GuardianCategory, GuardianPolicy, NewGuardian,
    NewSigner, RecoveryPolicyConfig, RiskThresholds, Signer, SignerRole,
    TransactionPolicyConfig, MAX_WEIGHT,
};
