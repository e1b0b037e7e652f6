//! Recording backend for testing
//!
//! Keeps every call in memory and fails on demand, so engine tests can
//! count ledger actions and exercise backend failures.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{BackendError, BackendResult};
use crate::types::{ActionRequest, ExecutionBackend, OwnershipTransfer, Receipt};

#[derive(Default)]
struct Recorded {
    actions: Vec<ActionRequest>,
    transfers: Vec<OwnershipTransfer>,
    failures: VecDeque<BackendError>,
}

/// In-memory backend that records calls
#[derive(Default)]
pub struct RecordingBackend {
    inner: Mutex<Recorded>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call fail with `error` (queued, one per call)
    pub fn fail_next(&self, error: BackendError) {
        self.inner().failures.push_back(error);
    }

    /// Actions carried out so far
    pub fn actions(&self) -> Vec<ActionRequest> {
        self.inner().actions.clone()
    }

    /// Ownership transfers carried out so far
    pub fn transfers(&self) -> Vec<OwnershipTransfer> {
        self.inner().transfers.clone()
    }

    pub fn action_count(&self) -> usize {
        self.inner().actions.len()
    }

    pub fn transfer_count(&self) -> usize {
        self.inner().transfers.len()
    }

    fn inner(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ExecutionBackend for RecordingBackend {
    fn execute_action(&self, action: &ActionRequest) -> BackendResult<Receipt> {
        let mut inner = self.inner();
        if let Some(error) = inner.failures.pop_front() {
            return Err(error);
        }
        inner.actions.push(action.clone());
        Ok(Receipt {
            reference: format!("MOCK-{}", inner.actions.len()),
        })
    }

    fn transfer_ownership(&self, transfer: &OwnershipTransfer) -> BackendResult<Receipt> {
        let mut inner = self.inner();
        if let Some(error) = inner.failures.pop_front() {
            return Err(error);
        }
        inner.transfers.push(transfer.clone());
        Ok(Receipt {
            reference: format!("MOCK-T{}", inner.transfers.len()),
        })
    }
}
