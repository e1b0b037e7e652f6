//! Quorum core domain types
//!
//! Shared by every engine:
//! - [`AccountId`] / [`PrincipalId`]: identifiers for managed accounts and
//!   authenticated principals
//! - [`Clock`]: the single time source read once per operation
//! - [`Threshold`] / [`ApprovalSet`]: conjunctive weighted voting
//! - [`window`]: expiry, delay and approval-window arithmetic
//! - [`AccountLocks`]: per-account serialization
//! - [`ErrorKind`]: the error taxonomy all engines report against

pub mod clock;
pub mod error;
pub mod ids;
pub mod lock;
pub mod threshold;
pub mod window;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use error::ErrorKind;
pub use ids::{AccountId, PrincipalId};
pub use lock::{AccountLocks, AccountSlot};
pub use threshold::{Approval, ApprovalSet, Tally, Threshold};
