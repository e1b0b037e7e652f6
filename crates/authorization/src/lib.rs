//! # Quorum Authorization Engine
//!
//! Multi-party approval of funds-moving transactions on managed accounts.
//!
//! ## Lifecycle
//!
//! ```text
//! Pending ──(count AND weight reached)──▶ Approved ──(timelock elapsed)──▶ Executed
//!    │                                       │
//!    ├──(expiration passed)──▶ Expired ◀─────┤
//!    └──(veto)──▶ Rejected ◀─────────────────┘
//! ```
//!
//! Every operation runs under the account's lock from the policy store, so
//! approvals and executions on one account are strictly serialized.

mod engine;
mod error;
mod pending;
mod store;

pub use engine::{AuthorizationEngine, TransactionStats};
pub use error::{AuthorizationError, AuthorizationResult};
pub use pending::{PendingTransaction, TransactionStatus};
pub use store::TransactionStore;
