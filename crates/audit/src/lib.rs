//! # Quorum Audit Log
//!
//! Append-only record of every state transition and refusal worth keeping.
//! Events are totally ordered by `(timestamp, sequence)` and never modified.
//!
//! - [`JsonlAuditLog`]: one JSON event per line, on disk
//! - [`MemoryAuditLog`]: in-process sink for tests and embedding

pub mod error;
pub mod event;
pub mod sink;

pub use error::{AuditError, AuditResult};
pub use event::{data_hash, AuditAction, AuditEvent, Severity};
pub use sink::{record, AuditSink, JsonlAuditLog, MemoryAuditLog};
