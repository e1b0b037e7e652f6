//! # Quorum Risk & Compliance Engine
//!
//! Scores proposed actions and answers identity questions:
//!
//! - **Risk scoring**: a monotone weighted sum of independent signals
//!   (velocity, magnitude, payload complexity), graded into a [`RiskLevel`]
//! - **Sanctions**: any hit on an active list fails the assessment outright
//! - **Identity**: a principal is verified only while its record says so and
//!   has not expired
//!
//! Every evaluation is kept in a bounded per-principal history (which feeds
//! the velocity signal) and written to the audit log. Sanction lists and the
//! history are persisted in the [`ComplianceStore`] and reloaded on startup.

pub mod assessment;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod identity;
pub mod sanctions;
pub mod store;

pub use assessment::{RiskAssessment, RiskLevel, RiskSignals};
pub use config::ComplianceConfig;
pub use engine::ComplianceEngine;
pub use error::{ComplianceError, ComplianceResult};
pub use history::AssessmentHistory;
pub use identity::{
    FileIdentityDirectory, IdentityDirectory, IdentityRecord, MemoryIdentityDirectory,
    VerificationStatus,
};
pub use sanctions::{SanctionList, SanctionsRegistry};
pub use store::ComplianceStore;
