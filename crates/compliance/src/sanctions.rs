//! Sanction lists
//!
//! Named lists of sanctioned parties (principals or targets). A party on any
//! *active* list fails every assessment it appears in. The registry is the
//! in-memory view the engine screens against; the compliance store holds the
//! durable copy.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use quorum_core::Timestamp;
use serde::{Deserialize, Serialize};

/// One named sanction list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanctionList {
    pub name: String,
    pub active: bool,
    pub entries: BTreeSet<String>,
    pub updated_at: Timestamp,
}

impl SanctionList {
    pub fn new(name: &str, entries: impl IntoIterator<Item = String>, active: bool, now: Timestamp) -> Self {
        Self {
            name: name.to_string(),
            active,
            entries: entries.into_iter().collect(),
            updated_at: now,
        }
    }

    /// Add a party; returns false if already present
    pub fn insert(&mut self, party: &str, now: Timestamp) -> bool {
        let added = self.entries.insert(party.to_string());
        self.updated_at = now;
        added
    }

    /// Remove a party; returns false if it was not there
    pub fn remove(&mut self, party: &str, now: Timestamp) -> bool {
        let removed = self.entries.remove(party);
        self.updated_at = now;
        removed
    }

    pub fn set_active(&mut self, active: bool, now: Timestamp) {
        self.active = active;
        self.updated_at = now;
    }
}

/// Registry of sanction lists
#[derive(Debug, Default)]
pub struct SanctionsRegistry {
    lists: RwLock<BTreeMap<String, SanctionList>>,
}

impl SanctionsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the given lists
    pub fn from_lists(lists: impl IntoIterator<Item = SanctionList>) -> Self {
        Self {
            lists: RwLock::new(lists.into_iter().map(|l| (l.name.clone(), l)).collect()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, SanctionList>> {
        self.lists.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, SanctionList>> {
        self.lists.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create or replace a list
    pub fn put(&self, list: SanctionList) {
        self.write().insert(list.name.clone(), list);
    }

    /// Name of the first active list containing the party
    pub fn is_sanctioned(&self, party: &str) -> Option<String> {
        self.read()
            .values()
            .find(|list| list.active && list.entries.contains(party))
            .map(|list| list.name.clone())
    }

    pub fn get_list(&self, name: &str) -> Option<SanctionList> {
        self.read().get(name).cloned()
    }

    pub fn lists(&self) -> Vec<SanctionList> {
        self.read().values().cloned().collect()
    }
}
