//! SQLite storage for policies, signers, guardians and global settings

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use quorum_audit::{record, AuditAction, AuditEvent, AuditSink, Severity};
use quorum_core::{AccountId, AccountLocks, AccountSlot, Clock, PrincipalId, Threshold, Timestamp};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::error::{PolicyError, PolicyResult};
use crate::sql::{
    count_col, decimal_col, enum_col, json_col, secs_col, to_sql_int, ts_col, weight_col,
};
use crate::types::{
    validate_weight, AccountPolicy, ApprovalKind, Guardian, GuardianPolicy, NewGuardian,
    NewSigner, RecoveryPolicyConfig, RiskThresholds, Signer, TransactionPolicyConfig,
};

/// Policy store
///
/// Every mutation takes the account's slot from [`PolicyStore::account_slot`]
/// and commits in a single SQLite transaction. Engines take the same slot
/// around their own operations and only read from this store while holding
/// it. With an audit sink attached, every committed change is recorded
/// there as well.
pub struct PolicyStore {
    conn: Mutex<Connection>,
    locks: AccountLocks,
    clock: Arc<dyn Clock>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl PolicyStore {
    /// Open (creating if needed) a store at the given database path
    pub fn open<P: AsRef<Path>>(path: P, clock: Arc<dyn Clock>) -> PolicyResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, clock)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory(clock: Arc<dyn Clock>) -> PolicyResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, clock)
    }

    fn with_connection(conn: Connection, clock: Arc<dyn Clock>) -> PolicyResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            locks: AccountLocks::new(),
            clock,
            audit: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> PolicyResult<()> {
        self.conn().execute_batch(
            "CREATE TABLE IF NOT EXISTS transaction_policies (
                account_id TEXT PRIMARY KEY,
                active INTEGER NOT NULL,
                required_signatures INTEGER NOT NULL,
                required_weight INTEGER NOT NULL,
                timelock_secs INTEGER NOT NULL,
                expiration_secs INTEGER NOT NULL,
                value_threshold TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS signers (
                account_id TEXT NOT NULL,
                principal_id TEXT NOT NULL,
                role TEXT NOT NULL,
                weight INTEGER NOT NULL,
                active INTEGER NOT NULL,
                added_at TEXT NOT NULL,
                PRIMARY KEY (account_id, principal_id)
            );
            CREATE TABLE IF NOT EXISTS recovery_policies (
                account_id TEXT PRIMARY KEY,
                active INTEGER NOT NULL,
                required_approvals INTEGER NOT NULL,
                required_weight INTEGER NOT NULL,
                recovery_delay_secs INTEGER NOT NULL,
                approval_window_secs INTEGER NOT NULL,
                cooldown_secs INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS guardians (
                account_id TEXT NOT NULL,
                principal_id TEXT NOT NULL,
                category TEXT NOT NULL,
                weight INTEGER NOT NULL,
                active INTEGER NOT NULL,
                added_at TEXT NOT NULL,
                metadata_json TEXT NOT NULL,
                PRIMARY KEY (account_id, principal_id)
            );
            CREATE TABLE IF NOT EXISTS risk_thresholds (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                low INTEGER NOT NULL,
                medium INTEGER NOT NULL,
                high INTEGER NOT NULL,
                reject_threshold INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS emergency_authorities (
                principal_id TEXT PRIMARY KEY,
                granted_at TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Record administrative changes to this sink
    pub fn with_audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn audit<T: Serialize>(
        &self,
        subject: &str,
        account: Option<&AccountId>,
        action: AuditAction,
        data: &T,
        now: Timestamp,
    ) {
        let Some(sink) = &self.audit else {
            return;
        };
        let severity = match action {
            AuditAction::PolicyUpdated => Severity::Warning,
            _ => Severity::Critical,
        };
        let mut event = AuditEvent::new(subject, action, "admin", data, now).with_severity(severity);
        if let Some(account) = account {
            event = event.for_account(account);
        }
        record(sink.as_ref(), event);
    }

    fn audit_policy<T: Serialize>(&self, account: &AccountId, data: &T, now: Timestamp) {
        self.audit(account.as_str(), Some(account), AuditAction::PolicyUpdated, data, now);
    }

    /// The serialization slot for an account
    ///
    /// Engines hold this for the whole of an operation. Store mutations
    /// take it themselves, so they must not be called while it is held.
    pub fn account_slot(&self, account: &AccountId) -> AccountSlot {
        self.locks.slot(account)
    }

    // === Transaction policy ===

    /// Create or replace an account's transaction policy
    ///
    /// When `signers` is given the existing signer list is replaced with it
    /// in the same transaction; otherwise the current list is kept.
    pub fn set_transaction_policy(
        &self,
        account: &AccountId,
        config: TransactionPolicyConfig,
        signers: Option<Vec<NewSigner>>,
    ) -> PolicyResult<AccountPolicy> {
        config.validate()?;
        if let Some(list) = &signers {
            let mut seen = HashSet::new();
            for signer in list {
                validate_weight(signer.weight)?;
                if !seen.insert(&signer.principal_id) {
                    return Err(PolicyError::DuplicateMember {
                        account: account.clone(),
                        principal: signer.principal_id.clone(),
                        kind: ApprovalKind::Transaction,
                    });
                }
            }
        }

        let slot = self.account_slot(account);
        let _guard = slot.lock();
        let now = self.clock.now();

        let policy = AccountPolicy {
            account_id: account.clone(),
            active: config.active,
            required_signatures: config.required_signatures,
            required_weight: config.required_weight,
            timelock_duration: config.timelock_duration,
            expiration_duration: config.expiration_duration,
            value_threshold: config.value_threshold,
            updated_at: now,
        };

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if let Some(list) = &signers {
            tx.execute("DELETE FROM signers WHERE account_id = ?1", params![account.as_str()])?;
            for signer in list {
                tx.execute(
                    "INSERT INTO signers (account_id, principal_id, role, weight, active, added_at)
                     VALUES (?1, ?2, ?3, ?4, 1, ?5)",
                    params![
                        account.as_str(),
                        signer.principal_id.as_str(),
                        signer.role.as_ref(),
                        to_sql_int(signer.weight),
                        now.to_rfc3339(),
                    ],
                )?;
            }
        }

        tx.execute(
            "INSERT OR REPLACE INTO transaction_policies
             (account_id, active, required_signatures, required_weight,
              timelock_secs, expiration_secs, value_threshold, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                account.as_str(),
                policy.active,
                policy.required_signatures,
                to_sql_int(policy.required_weight),
                policy.timelock_duration.num_seconds(),
                policy.expiration_duration.num_seconds(),
                policy.value_threshold.to_string(),
                now.to_rfc3339(),
            ],
        )?;

        if policy.active {
            let weights = active_weights(&tx, "signers", account)?;
            check_satisfiable(policy.threshold(), &weights)?;
        }

        tx.commit()?;

        tracing::info!(
            account = %account,
            active = policy.active,
            required_signatures = policy.required_signatures,
            required_weight = policy.required_weight,
            "Transaction policy set"
        );
        self.audit_policy(account, &policy, now);
        Ok(policy)
    }

    pub fn get_transaction_policy(&self, account: &AccountId) -> PolicyResult<Option<AccountPolicy>> {
        Ok(load_transaction_policy(&self.conn(), account)?)
    }

    /// Enroll a signer on an account with an active transaction policy
    pub fn add_signer(&self, account: &AccountId, signer: NewSigner) -> PolicyResult<Signer> {
        validate_weight(signer.weight)?;

        let slot = self.account_slot(account);
        let _guard = slot.lock();
        let now = self.clock.now();

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        require_active(
            load_transaction_policy(&tx, account)?.map(|p| p.active),
            account,
            ApprovalKind::Transaction,
        )?;
        if load_signer(&tx, account, &signer.principal_id)?.is_some() {
            return Err(PolicyError::DuplicateMember {
                account: account.clone(),
                principal: signer.principal_id,
                kind: ApprovalKind::Transaction,
            });
        }

        tx.execute(
            "INSERT INTO signers (account_id, principal_id, role, weight, active, added_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5)",
            params![
                account.as_str(),
                signer.principal_id.as_str(),
                signer.role.as_ref(),
                to_sql_int(signer.weight),
                now.to_rfc3339(),
            ],
        )?;
        tx.commit()?;

        tracing::info!(account = %account, signer = %signer.principal_id, weight = signer.weight, "Signer added");
        let signer = Signer {
            account_id: account.clone(),
            principal_id: signer.principal_id,
            role: signer.role,
            weight: signer.weight,
            active: true,
            added_at: now,
        };
        self.audit_policy(account, &signer, now);
        Ok(signer)
    }

    /// Remove a signer; fails if an active policy would become unreachable
    pub fn remove_signer(&self, account: &AccountId, principal: &PrincipalId) -> PolicyResult<()> {
        let slot = self.account_slot(account);
        let _guard = slot.lock();
        let now = self.clock.now();

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "DELETE FROM signers WHERE account_id = ?1 AND principal_id = ?2",
            params![account.as_str(), principal.as_str()],
        )?;
        if rows == 0 {
            return Err(member_not_found(account, principal, ApprovalKind::Transaction));
        }
        if let Some(policy) = load_transaction_policy(&tx, account)?.filter(|p| p.active) {
            check_satisfiable(policy.threshold(), &active_weights(&tx, "signers", account)?)?;
        }
        tx.commit()?;

        tracing::info!(account = %account, signer = %principal, "Signer removed");
        self.audit_policy(account, &serde_json::json!({ "removed_signer": principal }), now);
        Ok(())
    }

    /// Activate or deactivate a signer without removing it
    pub fn set_signer_status(
        &self,
        account: &AccountId,
        principal: &PrincipalId,
        active: bool,
    ) -> PolicyResult<Signer> {
        let slot = self.account_slot(account);
        let _guard = slot.lock();
        let now = self.clock.now();

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE signers SET active = ?1 WHERE account_id = ?2 AND principal_id = ?3",
            params![active, account.as_str(), principal.as_str()],
        )?;
        if rows == 0 {
            return Err(member_not_found(account, principal, ApprovalKind::Transaction));
        }
        if let Some(policy) = load_transaction_policy(&tx, account)?.filter(|p| p.active) {
            check_satisfiable(policy.threshold(), &active_weights(&tx, "signers", account)?)?;
        }
        let signer = load_signer(&tx, account, principal)?
            .ok_or_else(|| member_not_found(account, principal, ApprovalKind::Transaction))?;
        tx.commit()?;

        tracing::info!(account = %account, signer = %principal, active, "Signer status changed");
        self.audit_policy(account, &signer, now);
        Ok(signer)
    }

    pub fn get_signer(&self, account: &AccountId, principal: &PrincipalId) -> PolicyResult<Option<Signer>> {
        Ok(load_signer(&self.conn(), account, principal)?)
    }

    /// All signers of an account, active or not, in enrollment order
    pub fn list_signers(&self, account: &AccountId) -> PolicyResult<Vec<Signer>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT account_id, principal_id, role, weight, active, added_at
             FROM signers WHERE account_id = ?1 ORDER BY added_at, principal_id",
        )?;
        let signers = stmt
            .query_map(params![account.as_str()], signer_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(signers)
    }

    // === Recovery policy ===

    /// Create or replace an account's recovery policy
    ///
    /// When `guardians` is given the existing guardian list is replaced with
    /// it in the same transaction; otherwise the current list is kept.
    pub fn set_recovery_policy(
        &self,
        account: &AccountId,
        config: RecoveryPolicyConfig,
        guardians: Option<Vec<NewGuardian>>,
    ) -> PolicyResult<GuardianPolicy> {
        config.validate()?;
        if let Some(list) = &guardians {
            let mut seen = HashSet::new();
            for guardian in list {
                validate_weight(guardian.weight)?;
                if !seen.insert(&guardian.principal_id) {
                    return Err(PolicyError::DuplicateMember {
                        account: account.clone(),
                        principal: guardian.principal_id.clone(),
                        kind: ApprovalKind::Recovery,
                    });
                }
            }
        }

        let slot = self.account_slot(account);
        let _guard = slot.lock();
        let now = self.clock.now();

        let policy = GuardianPolicy {
            account_id: account.clone(),
            active: config.active,
            required_approvals: config.required_approvals,
            required_weight: config.required_weight,
            recovery_delay: config.recovery_delay,
            approval_window: config.approval_window,
            cooldown_period: config.cooldown_period,
            updated_at: now,
        };

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if let Some(list) = &guardians {
            tx.execute("DELETE FROM guardians WHERE account_id = ?1", params![account.as_str()])?;
            for guardian in list {
                insert_guardian(&tx, account, guardian, now)?;
            }
        }

        tx.execute(
            "INSERT OR REPLACE INTO recovery_policies
             (account_id, active, required_approvals, required_weight,
              recovery_delay_secs, approval_window_secs, cooldown_secs, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                account.as_str(),
                policy.active,
                policy.required_approvals,
                to_sql_int(policy.required_weight),
                policy.recovery_delay.num_seconds(),
                policy.approval_window.num_seconds(),
                policy.cooldown_period.num_seconds(),
                now.to_rfc3339(),
            ],
        )?;

        if policy.active {
            let weights = active_weights(&tx, "guardians", account)?;
            check_satisfiable(policy.threshold(), &weights)?;
        }

        tx.commit()?;

        tracing::info!(
            account = %account,
            active = policy.active,
            required_approvals = policy.required_approvals,
            required_weight = policy.required_weight,
            "Recovery policy set"
        );
        self.audit_policy(account, &policy, now);
        Ok(policy)
    }

    pub fn get_recovery_policy(&self, account: &AccountId) -> PolicyResult<Option<GuardianPolicy>> {
        Ok(load_recovery_policy(&self.conn(), account)?)
    }

    /// Enroll a guardian on an account with an active recovery policy
    pub fn add_guardian(&self, account: &AccountId, guardian: NewGuardian) -> PolicyResult<Guardian> {
        validate_weight(guardian.weight)?;

        let slot = self.account_slot(account);
        let _guard = slot.lock();
        let now = self.clock.now();

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        require_active(
            load_recovery_policy(&tx, account)?.map(|p| p.active),
            account,
            ApprovalKind::Recovery,
        )?;
        if load_guardian(&tx, account, &guardian.principal_id)?.is_some() {
            return Err(PolicyError::DuplicateMember {
                account: account.clone(),
                principal: guardian.principal_id,
                kind: ApprovalKind::Recovery,
            });
        }

        insert_guardian(&tx, account, &guardian, now)?;
        tx.commit()?;

        tracing::info!(account = %account, guardian = %guardian.principal_id, weight = guardian.weight, "Guardian added");
        let guardian = Guardian {
            account_id: account.clone(),
            principal_id: guardian.principal_id,
            category: guardian.category,
            weight: guardian.weight,
            active: true,
            added_at: now,
            metadata: guardian.metadata,
        };
        self.audit_policy(account, &guardian, now);
        Ok(guardian)
    }

    /// Remove a guardian; fails if an active policy would become unreachable
    pub fn remove_guardian(&self, account: &AccountId, principal: &PrincipalId) -> PolicyResult<()> {
        let slot = self.account_slot(account);
        let _guard = slot.lock();
        let now = self.clock.now();

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "DELETE FROM guardians WHERE account_id = ?1 AND principal_id = ?2",
            params![account.as_str(), principal.as_str()],
        )?;
        if rows == 0 {
            return Err(member_not_found(account, principal, ApprovalKind::Recovery));
        }
        if let Some(policy) = load_recovery_policy(&tx, account)?.filter(|p| p.active) {
            check_satisfiable(policy.threshold(), &active_weights(&tx, "guardians", account)?)?;
        }
        tx.commit()?;

        tracing::info!(account = %account, guardian = %principal, "Guardian removed");
        self.audit_policy(account, &serde_json::json!({ "removed_guardian": principal }), now);
        Ok(())
    }

    /// Activate or deactivate a guardian without removing it
    pub fn set_guardian_status(
        &self,
        account: &AccountId,
        principal: &PrincipalId,
        active: bool,
    ) -> PolicyResult<Guardian> {
        let slot = self.account_slot(account);
        let _guard = slot.lock();
        let now = self.clock.now();

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE guardians SET active = ?1 WHERE account_id = ?2 AND principal_id = ?3",
            params![active, account.as_str(), principal.as_str()],
        )?;
        if rows == 0 {
            return Err(member_not_found(account, principal, ApprovalKind::Recovery));
        }
        if let Some(policy) = load_recovery_policy(&tx, account)?.filter(|p| p.active) {
            check_satisfiable(policy.threshold(), &active_weights(&tx, "guardians", account)?)?;
        }
        let guardian = load_guardian(&tx, account, principal)?
            .ok_or_else(|| member_not_found(account, principal, ApprovalKind::Recovery))?;
        tx.commit()?;

        tracing::info!(account = %account, guardian = %principal, active, "Guardian status changed");
        self.audit_policy(account, &guardian, now);
        Ok(guardian)
    }

    pub fn get_guardian(&self, account: &AccountId, principal: &PrincipalId) -> PolicyResult<Option<Guardian>> {
        Ok(load_guardian(&self.conn(), account, principal)?)
    }

    /// All guardians of an account, active or not, in enrollment order
    pub fn list_guardians(&self, account: &AccountId) -> PolicyResult<Vec<Guardian>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT account_id, principal_id, category, weight, active, added_at, metadata_json
             FROM guardians WHERE account_id = ?1 ORDER BY added_at, principal_id",
        )?;
        let guardians = stmt
            .query_map(params![account.as_str()], guardian_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(guardians)
    }

    /// Sum of the weights of the account's active members of one kind
    pub fn get_total_weight(&self, account: &AccountId, kind: ApprovalKind) -> PolicyResult<u64> {
        let table = match kind {
            ApprovalKind::Transaction => "signers",
            ApprovalKind::Recovery => "guardians",
        };
        let weights = active_weights(&self.conn(), table, account)?;
        Ok(weights.iter().fold(0u64, |sum, w| sum.saturating_add(*w)))
    }

    // === Global settings ===

    pub fn set_risk_thresholds(&self, thresholds: RiskThresholds) -> PolicyResult<RiskThresholds> {
        thresholds.validate()?;
        let now = self.clock.now();
        self.conn().execute(
            "INSERT OR REPLACE INTO risk_thresholds
             (id, low, medium, high, reject_threshold, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5)",
            params![
                thresholds.low,
                thresholds.medium,
                thresholds.high,
                thresholds.reject_threshold,
                now.to_rfc3339(),
            ],
        )?;
        tracing::info!(
            low = thresholds.low,
            medium = thresholds.medium,
            high = thresholds.high,
            reject = thresholds.reject_threshold,
            "Risk thresholds updated"
        );
        self.audit("risk_thresholds", None, AuditAction::PolicyUpdated, &thresholds, now);
        Ok(thresholds)
    }

    /// Current risk thresholds, or the defaults if never set
    pub fn risk_thresholds(&self) -> PolicyResult<RiskThresholds> {
        let stored = self
            .conn()
            .query_row(
                "SELECT low, medium, high, reject_threshold FROM risk_thresholds WHERE id = 1",
                [],
                |row| {
                    Ok(RiskThresholds {
                        low: count_col(row, 0)?,
                        medium: count_col(row, 1)?,
                        high: count_col(row, 2)?,
                        reject_threshold: count_col(row, 3)?,
                    })
                },
            )
            .optional()?;
        Ok(stored.unwrap_or_default())
    }

    /// Grant the elevated role required by recovery overrides
    ///
    /// Returns false if the principal already held it.
    pub fn grant_emergency_authority(&self, principal: &PrincipalId) -> PolicyResult<bool> {
        let now = self.clock.now();
        let rows = self.conn().execute(
            "INSERT OR IGNORE INTO emergency_authorities (principal_id, granted_at) VALUES (?1, ?2)",
            params![principal.as_str(), now.to_rfc3339()],
        )?;
        if rows > 0 {
            tracing::warn!(principal = %principal, "Emergency authority granted");
            self.audit(principal.as_str(), None, AuditAction::EmergencyAuthorityGranted, principal, now);
        }
        Ok(rows > 0)
    }

    pub fn revoke_emergency_authority(&self, principal: &PrincipalId) -> PolicyResult<bool> {
        let now = self.clock.now();
        let rows = self.conn().execute(
            "DELETE FROM emergency_authorities WHERE principal_id = ?1",
            params![principal.as_str()],
        )?;
        if rows > 0 {
            tracing::info!(principal = %principal, "Emergency authority revoked");
            self.audit(principal.as_str(), None, AuditAction::EmergencyAuthorityRevoked, principal, now);
        }
        Ok(rows > 0)
    }

    pub fn is_emergency_authority(&self, principal: &PrincipalId) -> PolicyResult<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM emergency_authorities WHERE principal_id = ?1",
            params![principal.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

fn require_active(active: Option<bool>, account: &AccountId, kind: ApprovalKind) -> PolicyResult<()> {
    match active {
        Some(true) => Ok(()),
        _ => Err(PolicyError::NotConfigured {
            account: account.clone(),
            kind,
        }),
    }
}

fn member_not_found(account: &AccountId, principal: &PrincipalId, kind: ApprovalKind) -> PolicyError {
    PolicyError::MemberNotFound {
        account: account.clone(),
        principal: principal.clone(),
        kind,
    }
}

/// An active policy must be reachable by its active members
fn check_satisfiable(threshold: Threshold, weights: &[u64]) -> PolicyResult<()> {
    let count = weights.len();
    let total = weights.iter().fold(0u64, |sum, w| sum.saturating_add(*w));
    if (count as u64) < u64::from(threshold.required_count) {
        return Err(PolicyError::invalid(format!(
            "{} approvals required but only {} active members",
            threshold.required_count, count
        )));
    }
    if total < threshold.required_weight {
        return Err(PolicyError::invalid(format!(
            "weight {} required but active members only carry {}",
            threshold.required_weight, total
        )));
    }
    Ok(())
}

fn active_weights(conn: &Connection, table: &str, account: &AccountId) -> rusqlite::Result<Vec<u64>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT weight FROM {} WHERE account_id = ?1 AND active = 1",
        table
    ))?;
    let weights = stmt
        .query_map(params![account.as_str()], |row| weight_col(row, 0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(weights)
}

fn load_transaction_policy(conn: &Connection, account: &AccountId) -> rusqlite::Result<Option<AccountPolicy>> {
    conn.query_row(
        "SELECT account_id, active, required_signatures, required_weight,
                timelock_secs, expiration_secs, value_threshold, updated_at
         FROM transaction_policies WHERE account_id = ?1",
        params![account.as_str()],
        |row| {
            Ok(AccountPolicy {
                account_id: AccountId::new(row.get::<_, String>(0)?),
                active: row.get(1)?,
                required_signatures: count_col(row, 2)?,
                required_weight: weight_col(row, 3)?,
                timelock_duration: secs_col(row, 4)?,
                expiration_duration: secs_col(row, 5)?,
                value_threshold: decimal_col(row, 6)?,
                updated_at: ts_col(row, 7)?,
            })
        },
    )
    .optional()
}

fn load_recovery_policy(conn: &Connection, account: &AccountId) -> rusqlite::Result<Option<GuardianPolicy>> {
    conn.query_row(
        "SELECT account_id, active, required_approvals, required_weight,
                recovery_delay_secs, approval_window_secs, cooldown_secs, updated_at
         FROM recovery_policies WHERE account_id = ?1",
        params![account.as_str()],
        |row| {
            Ok(GuardianPolicy {
                account_id: AccountId::new(row.get::<_, String>(0)?),
                active: row.get(1)?,
                required_approvals: count_col(row, 2)?,
                required_weight: weight_col(row, 3)?,
                recovery_delay: secs_col(row, 4)?,
                approval_window: secs_col(row, 5)?,
                cooldown_period: secs_col(row, 6)?,
                updated_at: ts_col(row, 7)?,
            })
        },
    )
    .optional()
}

fn signer_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Signer> {
    Ok(Signer {
        account_id: AccountId::new(row.get::<_, String>(0)?),
        principal_id: PrincipalId::new(row.get::<_, String>(1)?),
        role: enum_col(row, 2)?,
        weight: weight_col(row, 3)?,
        active: row.get(4)?,
        added_at: ts_col(row, 5)?,
    })
}

fn load_signer(conn: &Connection, account: &AccountId, principal: &PrincipalId) -> rusqlite::Result<Option<Signer>> {
    conn.query_row(
        "SELECT account_id, principal_id, role, weight, active, added_at
         FROM signers WHERE account_id = ?1 AND principal_id = ?2",
        params![account.as_str(), principal.as_str()],
        signer_from_row,
    )
    .optional()
}

fn guardian_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Guardian> {
    Ok(Guardian {
        account_id: AccountId::new(row.get::<_, String>(0)?),
        principal_id: PrincipalId::new(row.get::<_, String>(1)?),
        category: enum_col(row, 2)?,
        weight: weight_col(row, 3)?,
        active: row.get(4)?,
        added_at: ts_col(row, 5)?,
        metadata: json_col(row, 6)?,
    })
}

fn load_guardian(conn: &Connection, account: &AccountId, principal: &PrincipalId) -> rusqlite::Result<Option<Guardian>> {
    conn.query_row(
        "SELECT account_id, principal_id, category, weight, active, added_at, metadata_json
         FROM guardians WHERE account_id = ?1 AND principal_id = ?2",
        params![account.as_str(), principal.as_str()],
        guardian_from_row,
    )
    .optional()
}

fn insert_guardian(
    conn: &Connection,
    account: &AccountId,
    guardian: &NewGuardian,
    now: Timestamp,
) -> PolicyResult<()> {
    let metadata_json = serde_json::to_string(&guardian.metadata)?;
    conn.execute(
        "INSERT INTO guardians
         (account_id, principal_id, category, weight, active, added_at, metadata_json)
         VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)",
        params![
            account.as_str(),
            guardian.principal_id.as_str(),
            guardian.category.as_ref(),
            to_sql_int(guardian.weight),
            now.to_rfc3339(),
            metadata_json,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GuardianCategory, SignerRole};
    use chrono::Duration;
    use quorum_audit::MemoryAuditLog;
    use quorum_core::{ErrorKind, ManualClock};
    use rust_decimal_macros::dec;

    fn store() -> (PolicyStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        (PolicyStore::in_memory(clock.clone()).unwrap(), clock)
    }

    fn account() -> AccountId {
        AccountId::from("ACC-1")
    }

    fn tx_config(count: u32, weight: u64) -> TransactionPolicyConfig {
        TransactionPolicyConfig {
            active: true,
            required_signatures: count,
            required_weight: weight,
            timelock_duration: Duration::hours(1),
            expiration_duration: Duration::hours(24),
            value_threshold: dec!(0),
        }
    }

    fn abc() -> Vec<NewSigner> {
        vec![
            NewSigner::new("A", SignerRole::Operator, 100),
            NewSigner::new("B", SignerRole::Operator, 150),
            NewSigner::new("C", SignerRole::Supervisor, 200),
        ]
    }

    fn recovery_config() -> RecoveryPolicyConfig {
        RecoveryPolicyConfig {
            active: true,
            required_approvals: 2,
            required_weight: 200,
            recovery_delay: Duration::hours(24),
            approval_window: Duration::hours(72),
            cooldown_period: Duration::days(7),
        }
    }

    #[test]
    fn test_set_and_get_transaction_policy() {
        let (store, _) = store();
        store
            .set_transaction_policy(&account(), tx_config(2, 200), Some(abc()))
            .unwrap();

        let policy = store.get_transaction_policy(&account()).unwrap().unwrap();
        assert_eq!(policy.required_signatures, 2);
        assert_eq!(policy.required_weight, 200);
        assert_eq!(policy.timelock_duration, Duration::hours(1));

        let signers = store.list_signers(&account()).unwrap();
        assert_eq!(signers.len(), 3);
        assert_eq!(store.get_total_weight(&account(), ApprovalKind::Transaction).unwrap(), 450);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let (store, _) = store();
        let err = store
            .set_transaction_policy(&account(), tx_config(0, 200), Some(abc()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPolicy);

        let err = store
            .set_transaction_policy(&account(), tx_config(2, 0), Some(abc()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPolicy);
        assert!(store.get_transaction_policy(&account()).unwrap().is_none());
    }

    #[test]
    fn test_unsatisfiable_policy_rejected_atomically() {
        let (store, _) = store();
        store
            .set_transaction_policy(&account(), tx_config(2, 200), Some(abc()))
            .unwrap();

        // Weight 500 exceeds the 450 carried by the new list
        let err = store
            .set_transaction_policy(&account(), tx_config(2, 500), Some(abc()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPolicy);

        // Previous policy and signers untouched
        let policy = store.get_transaction_policy(&account()).unwrap().unwrap();
        assert_eq!(policy.required_weight, 200);
        assert_eq!(store.list_signers(&account()).unwrap().len(), 3);
    }

    #[test]
    fn test_duplicate_signer_in_list() {
        let (store, _) = store();
        let mut signers = abc();
        signers.push(NewSigner::new("A", SignerRole::Emergency, 10));

        let err = store
            .set_transaction_policy(&account(), tx_config(2, 200), Some(signers))
            .unwrap_err();
        assert!(matches!(err, PolicyError::DuplicateMember { .. }));
    }

    #[test]
    fn test_add_signer_requires_active_policy() {
        let (store, _) = store();
        let err = store
            .add_signer(&account(), NewSigner::new("D", SignerRole::Operator, 50))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyNotConfigured);

        let mut inactive = tx_config(2, 200);
        inactive.active = false;
        store.set_transaction_policy(&account(), inactive, Some(abc())).unwrap();
        let err = store
            .add_signer(&account(), NewSigner::new("D", SignerRole::Operator, 50))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyNotConfigured);
    }

    #[test]
    fn test_add_and_remove_signer() {
        let (store, clock) = store();
        store
            .set_transaction_policy(&account(), tx_config(2, 200), Some(abc()))
            .unwrap();

        clock.advance(Duration::minutes(5));
        let signer = store
            .add_signer(&account(), NewSigner::new("D", SignerRole::Emergency, 50))
            .unwrap();
        assert!(signer.active);
        assert_eq!(signer.added_at, clock.now());

        let err = store
            .add_signer(&account(), NewSigner::new("D", SignerRole::Operator, 50))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPolicy);

        store.remove_signer(&account(), &PrincipalId::from("D")).unwrap();
        let err = store.remove_signer(&account(), &PrincipalId::from("D")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_remove_keeps_policy_satisfiable() {
        let (store, _) = store();
        store
            .set_transaction_policy(&account(), tx_config(2, 350), Some(abc()))
            .unwrap();

        // Without C only 250 weight remains
        let err = store.remove_signer(&account(), &PrincipalId::from("C")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPolicy);
        assert!(store.get_signer(&account(), &PrincipalId::from("C")).unwrap().is_some());

        // Deactivating counts the same way
        let err = store
            .set_signer_status(&account(), &PrincipalId::from("C"), false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPolicy);

        // A is not needed
        let signer = store
            .set_signer_status(&account(), &PrincipalId::from("A"), false)
            .unwrap();
        assert!(!signer.active);
        assert_eq!(store.get_total_weight(&account(), ApprovalKind::Transaction).unwrap(), 350);
    }

    #[test]
    fn test_replace_keeps_signers_when_not_given() {
        let (store, _) = store();
        store
            .set_transaction_policy(&account(), tx_config(2, 200), Some(abc()))
            .unwrap();
        store
            .set_transaction_policy(&account(), tx_config(3, 450), None)
            .unwrap();

        assert_eq!(store.list_signers(&account()).unwrap().len(), 3);
        let policy = store.get_transaction_policy(&account()).unwrap().unwrap();
        assert_eq!(policy.required_signatures, 3);
    }

    #[test]
    fn test_recovery_policy_and_guardians() {
        let (store, _) = store();
        let guardians = vec![
            NewGuardian::new("G1", GuardianCategory::Family, 100).with_metadata("relation", "sister"),
            NewGuardian::new("G2", GuardianCategory::Professional, 150),
        ];
        store
            .set_recovery_policy(&account(), recovery_config(), Some(guardians))
            .unwrap();

        let policy = store.get_recovery_policy(&account()).unwrap().unwrap();
        assert_eq!(policy.approval_window, Duration::hours(72));

        let g1 = store
            .get_guardian(&account(), &PrincipalId::from("G1"))
            .unwrap()
            .unwrap();
        assert_eq!(g1.category, GuardianCategory::Family);
        assert_eq!(g1.metadata.get("relation").map(String::as_str), Some("sister"));
        assert_eq!(store.get_total_weight(&account(), ApprovalKind::Recovery).unwrap(), 250);

        store
            .add_guardian(&account(), NewGuardian::new("G3", GuardianCategory::Friend, 50))
            .unwrap();
        assert_eq!(store.list_guardians(&account()).unwrap().len(), 3);

        // G2 cannot leave: 150 weight remains
        let err = store.remove_guardian(&account(), &PrincipalId::from("G2")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPolicy);
    }

    #[test]
    fn test_zero_weight_guardian_rejected() {
        let (store, _) = store();
        let guardians = vec![
            NewGuardian::new("G1", GuardianCategory::Family, 0),
            NewGuardian::new("G2", GuardianCategory::Friend, 250),
        ];
        let err = store
            .set_recovery_policy(&account(), recovery_config(), Some(guardians))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPolicy);
    }

    #[test]
    fn test_risk_thresholds_default_and_update() {
        let (store, _) = store();
        assert_eq!(store.risk_thresholds().unwrap(), RiskThresholds::default());

        let custom = RiskThresholds {
            low: 10,
            medium: 30,
            high: 60,
            reject_threshold: 70,
        };
        store.set_risk_thresholds(custom).unwrap();
        assert_eq!(store.risk_thresholds().unwrap(), custom);

        let bad = RiskThresholds {
            low: 60,
            medium: 30,
            high: 10,
            reject_threshold: 70,
        };
        assert!(store.set_risk_thresholds(bad).is_err());
        assert_eq!(store.risk_thresholds().unwrap(), custom);
    }

    #[test]
    fn test_emergency_authority_roster() {
        let (store, _) = store();
        let officer = PrincipalId::from("officer");

        assert!(!store.is_emergency_authority(&officer).unwrap());
        assert!(store.grant_emergency_authority(&officer).unwrap());
        assert!(!store.grant_emergency_authority(&officer).unwrap());
        assert!(store.is_emergency_authority(&officer).unwrap());
        assert!(store.revoke_emergency_authority(&officer).unwrap());
        assert!(!store.is_emergency_authority(&officer).unwrap());
    }

    #[test]
    fn test_changes_are_audited() {
        let (store, _) = store();
        let log = Arc::new(MemoryAuditLog::new());
        let store = store.with_audit(log.clone());
        let officer = PrincipalId::from("officer");

        store
            .set_transaction_policy(&account(), tx_config(2, 200), Some(abc()))
            .unwrap();
        store.set_signer_status(&account(), &PrincipalId::from("A"), false).unwrap();
        // Refused changes leave no trace
        store
            .remove_signer(&account(), &PrincipalId::from("C"))
            .unwrap_err();
        store.grant_emergency_authority(&officer).unwrap();
        store.grant_emergency_authority(&officer).unwrap();
        store.revoke_emergency_authority(&officer).unwrap();

        let account_events = log.events_for(account().as_str()).unwrap();
        assert_eq!(account_events.len(), 2);
        assert!(account_events
            .iter()
            .all(|e| e.action == AuditAction::PolicyUpdated && e.severity == Severity::Warning));

        let actions: Vec<_> = log
            .events_for("officer")
            .unwrap()
            .into_iter()
            .map(|e| (e.action, e.severity))
            .collect();
        assert_eq!(
            actions,
            vec![
                (AuditAction::EmergencyAuthorityGranted, Severity::Critical),
                (AuditAction::EmergencyAuthorityRevoked, Severity::Critical),
            ]
        );
    }

    #[test]
    fn test_reopen_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.db");
        let clock = Arc::new(ManualClock::starting_now());

        {
            let store = PolicyStore::open(&path, clock.clone()).unwrap();
            store
                .set_transaction_policy(&account(), tx_config(2, 200), Some(abc()))
                .unwrap();
        }

        let store = PolicyStore::open(&path, clock).unwrap();
        let policy = store.get_transaction_policy(&account()).unwrap().unwrap();
        assert_eq!(policy.value_threshold, dec!(0));
        assert_eq!(store.list_signers(&account()).unwrap().len(), 3);
    }
}
