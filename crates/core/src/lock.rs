//! Per-account serialization
//!
//! Every mutating operation on an account (policy edits, approvals,
//! executions) runs while holding that account's slot. Different accounts
//! use different slots and proceed in parallel; the registry mutex is only
//! held long enough to look a slot up.
//!
//! Slots nobody holds a handle to are dropped once the registry reaches
//! [`PRUNE_AT`] entries, so memory tracks the accounts in use rather than
//! every account ever touched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::ids::AccountId;

/// Registry size at which idle slots are dropped
pub const PRUNE_AT: usize = 1024;

/// Registry of per-account mutexes
#[derive(Debug, Default)]
pub struct AccountLocks {
    slots: Mutex<HashMap<AccountId, Arc<Mutex<()>>>>,
}

/// Handle on one account's mutex
#[derive(Debug, Clone)]
pub struct AccountSlot(Arc<Mutex<()>>);

impl AccountSlot {
    /// Block until this account is free, then hold it until the guard drops
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (creating on first use) the slot for an account
    pub fn slot(&self, account: &AccountId) -> AccountSlot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.len() >= PRUNE_AT && !slots.contains_key(account) {
            prune_idle(&mut slots);
        }
        let slot = slots
            .entry(account.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())));
        AccountSlot(Arc::clone(slot))
    }

    /// Drop every slot no caller holds a handle to
    ///
    /// A handle is held from [`AccountLocks::slot`] until it is dropped, so a
    /// slot that is locked or being waited on is never removed.
    pub fn prune(&self) {
        prune_idle(&mut self.slots.lock().unwrap_or_else(PoisonError::into_inner));
    }

    /// Number of slots currently registered
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn prune_idle(slots: &mut HashMap<AccountId, Arc<Mutex<()>>>) {
    slots.retain(|_, slot| Arc::strong_count(slot) > 1);
}
