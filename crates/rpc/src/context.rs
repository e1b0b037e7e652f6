//! Application context - wires everything together

use std::path::{Path, PathBuf};
use std::sync::Arc;

use quorum_audit::{AuditSink, JsonlAuditLog};
use quorum_authorization::{AuthorizationEngine, TransactionStore};
use quorum_backend::{ExecutionBackend, JournalBackend};
use quorum_compliance::{
    ComplianceEngine, ComplianceStore, FileIdentityDirectory, IdentityDirectory,
    MemoryIdentityDirectory,
};
use quorum_core::{Clock, SystemClock};
use quorum_policy::PolicyStore;
use quorum_recovery::{RecoveryEngine, RecoveryStore};

use crate::config::AppConfig;

/// Application context - one instance per process
pub struct AppContext {
    pub policies: Arc<PolicyStore>,
    pub authorization: AuthorizationEngine,
    pub recovery: RecoveryEngine,
    pub compliance: Arc<ComplianceEngine>,
    pub audit: Arc<dyn AuditSink>,
    data_dir: PathBuf,
    audit_path: PathBuf,
    journal_path: PathBuf,
}

impl AppContext {
    /// Open every store under the configured data directory
    pub fn new(config: &AppConfig) -> Result<Self, anyhow::Error> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Same as [`AppContext::new`] with an explicit time source
    pub fn with_clock(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self, anyhow::Error> {
        let data_dir = config.data_dir.clone();
        let journal_path = data_dir.join("journal");
        let audit_path = data_dir.join("audit.jsonl");

        // Create directories
        std::fs::create_dir_all(&journal_path)?;

        let audit: Arc<dyn AuditSink> = Arc::new(JsonlAuditLog::open(&audit_path)?);
        let policies = Arc::new(
            PolicyStore::open(data_dir.join("policy.db"), clock.clone())?.with_audit(audit.clone()),
        );
        let backend: Arc<dyn ExecutionBackend> = Arc::new(JournalBackend::open(&journal_path, clock.clone())?);

        let identities: Arc<dyn IdentityDirectory> = match &config.identities_file {
            Some(path) => Arc::new(FileIdentityDirectory::open(path)?),
            None => Arc::new(MemoryIdentityDirectory::new()),
        };
        let compliance = Arc::new(ComplianceEngine::new(
            config.compliance.clone(),
            policies.clone(),
            ComplianceStore::open(data_dir.join("compliance.db"))?,
            identities,
            audit.clone(),
            clock.clone(),
        )?);

        let mut authorization = AuthorizationEngine::new(
            policies.clone(),
            TransactionStore::open(data_dir.join("transactions.db"))?,
            backend.clone(),
            audit.clone(),
            clock.clone(),
        );
        if config.screening {
            authorization = authorization.with_screening(compliance.clone());
        }

        let recovery = RecoveryEngine::new(
            policies.clone(),
            RecoveryStore::open(data_dir.join("recovery.db"))?,
            backend,
            audit.clone(),
            clock,
        );

        tracing::info!(
            data_dir = %data_dir.display(),
            screening = config.screening,
            "Application context ready"
        );

        Ok(Self {
            policies,
            authorization,
            recovery,
            compliance,
            audit,
            data_dir,
            audit_path,
            journal_path,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get audit log path
    pub fn audit_path(&self) -> &Path {
        &self.audit_path
    }

    /// Get journal path
    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }
}
