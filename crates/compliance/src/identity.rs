//! Identity (KYC) records and directories
//!
//! The engine never stores identity evidence; it only reads the verdict
//! through an [`IdentityDirectory`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use quorum_core::{PrincipalId, Timestamp};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::assessment::RiskLevel;
use crate::error::ComplianceResult;

/// KYC verification state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VerificationStatus {
    Unverified,
    Pending,
    Verified,
    Revoked,
}

/// Identity verdict for one principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub principal_id: PrincipalId,
    pub verification_status: VerificationStatus,
    pub expires_at: Timestamp,
    #[serde(default)]
    pub risk_level: RiskLevel,
}

impl IdentityRecord {
    /// Verified and not yet expired at `now`
    pub fn is_verified_at(&self, now: Timestamp) -> bool {
        self.verification_status == VerificationStatus::Verified && now < self.expires_at
    }
}

/// Read-only source of identity records
pub trait IdentityDirectory: Send + Sync {
    fn lookup(&self, principal: &PrincipalId) -> Option<IdentityRecord>;
}

/// In-memory identity directory
#[derive(Debug, Default)]
pub struct MemoryIdentityDirectory {
    records: RwLock<HashMap<PrincipalId, IdentityRecord>>,
}

impl MemoryIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, record: IdentityRecord) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.insert(record.principal_id.clone(), record);
    }

    pub fn remove(&self, principal: &PrincipalId) -> Option<IdentityRecord> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.remove(principal)
    }
}

impl IdentityDirectory for MemoryIdentityDirectory {
    fn lookup(&self, principal: &PrincipalId) -> Option<IdentityRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.get(principal).cloned()
    }
}

/// Identity directory backed by a JSON file (an array of records)
///
/// The file is read on open and on [`FileIdentityDirectory::reload`].
pub struct FileIdentityDirectory {
    path: PathBuf,
    records: RwLock<HashMap<PrincipalId, IdentityRecord>>,
}

impl FileIdentityDirectory {
    pub fn open(path: impl AsRef<Path>) -> ComplianceResult<Self> {
        let path = path.as_ref().to_path_buf();
        let records = read_records(&path)?;
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    /// Re-read the file, replacing every record
    pub fn reload(&self) -> ComplianceResult<usize> {
        let fresh = read_records(&self.path)?;
        let count = fresh.len();
        *self.records.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        tracing::info!(path = %self.path.display(), records = count, "Identity directory reloaded");
        Ok(count)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_records(path: &Path) -> ComplianceResult<HashMap<PrincipalId, IdentityRecord>> {
    let content = std::fs::read_to_string(path)?;
    let list: Vec<IdentityRecord> = serde_json::from_str(&content)?;
    Ok(list
        .into_iter()
        .map(|r| (r.principal_id.clone(), r))
        .collect())
}

impl IdentityDirectory for FileIdentityDirectory {
    fn lookup(&self, principal: &PrincipalId) -> Option<IdentityRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.get(principal).cloned()
    }
}
