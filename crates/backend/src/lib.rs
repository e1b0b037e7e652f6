//! # Quorum Execution Backend
//!
//! The engines decide *whether* an action may happen; a backend carries it
//! out. This crate defines the contract plus two implementations:
//!
//! - [`JournalBackend`]: records carried-out actions as date-rotated JSONL
//! - [`RecordingBackend`]: in-memory test double with failure injection

mod error;
mod journal;
mod mock;
mod types;

pub use error::{BackendError, BackendResult};
pub use journal::JournalBackend;
pub use mock::RecordingBackend;
pub use types::{ActionRequest, ExecutionBackend, JournalRecord, OwnershipTransfer, Receipt};
