//! # Quorum Recovery Engine
//!
//! Guardian-approved transfer of account ownership.
//!
//! ```text
//! Initiated ──(approvals in window reach threshold)──▶ Approved ──(delay, cooldown)──▶ Executed
//!     │                                                    │
//!     └──────────────(guardian or authority)──▶ Rejected ◀─┘
//! ```
//!
//! Approvals older than the policy's approval window stop counting. Every
//! executed recovery starts a per-account cooldown during which no new
//! recovery can be initiated or executed. Emergency overrides skip all of
//! this, reject every open request on the account, and are always audited
//! as critical.

mod engine;
mod error;
mod request;
mod store;

pub use engine::{RecoveryEngine, SUPERSEDED_REASON};
pub use error::{RecoveryError, RecoveryResult};
pub use request::{RecoveryRequest, RecoveryStatus};
pub use store::RecoveryStore;
