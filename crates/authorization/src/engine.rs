//! Authorization engine - transaction approval workflow

use std::sync::Arc;

use quorum_audit::{record, AuditAction, AuditEvent, AuditSink, Severity};
use quorum_backend::{ActionRequest, ExecutionBackend};
use quorum_compliance::ComplianceEngine;
use quorum_core::{window, AccountId, Approval, Clock, ErrorKind, PrincipalId, Timestamp};
use quorum_policy::{AccountPolicy, PolicyStore, Signer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AuthorizationError, AuthorizationResult};
use crate::pending::{PendingTransaction, TransactionStatus};
use crate::store::TransactionStore;

/// Per-account transaction counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStats {
    pub pending: usize,
    pub approved: usize,
    pub executed: usize,
    pub rejected: usize,
    pub expired: usize,
}

/// Weighted multi-party transaction approval
pub struct AuthorizationEngine {
    policies: Arc<PolicyStore>,
    store: TransactionStore,
    backend: Arc<dyn ExecutionBackend>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    compliance: Option<Arc<ComplianceEngine>>,
}

impl AuthorizationEngine {
    pub fn new(
        policies: Arc<PolicyStore>,
        store: TransactionStore,
        backend: Arc<dyn ExecutionBackend>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            policies,
            store,
            backend,
            audit,
            clock,
            compliance: None,
        }
    }

    /// Screen every proposal through the compliance engine
    pub fn with_screening(mut self, compliance: Arc<ComplianceEngine>) -> Self {
        self.compliance = Some(compliance);
        self
    }

    pub fn screening_enabled(&self) -> bool {
        self.compliance.is_some()
    }

    /// Propose a transaction on an account
    ///
    /// The proposer must be an active signer. No approval is recorded on
    /// their behalf; they approve like anyone else.
    pub fn propose(
        &self,
        account: &AccountId,
        proposer: &PrincipalId,
        target: &str,
        value: Decimal,
        payload: &str,
    ) -> AuthorizationResult<PendingTransaction> {
        let slot = self.policies.account_slot(account);
        let _guard = slot.lock();
        let now = self.clock.now();

        let policy = self.active_policy(account)?;
        if !policy.requires_approval(value) {
            return Err(AuthorizationError::BelowThreshold {
                value,
                threshold: policy.value_threshold,
            });
        }
        self.active_signer(account, proposer)?;

        if let Some(compliance) = &self.compliance {
            self.screen(compliance, account, target, value, payload, now)?;
        }

        let nonce = self.store.count_for_account(account)?;
        let tx = PendingTransaction::new(
            account.clone(),
            proposer.clone(),
            target.to_string(),
            value,
            payload.to_string(),
            now,
            window::deadline(now, policy.expiration_duration),
            nonce,
        );
        self.store.save(&tx)?;

        tracing::info!(
            account = %account,
            tx = %tx.id,
            proposer = %proposer,
            value = %value,
            "Transaction proposed"
        );
        self.audit(&tx, AuditAction::TransactionProposed, proposer.as_str(), Severity::Info, now);
        Ok(tx)
    }

    /// Record a signer's approval
    ///
    /// Moves the transaction to Approved the moment both the signature count
    /// and the accumulated weight reach the policy threshold.
    pub fn approve(&self, id: &str, principal: &PrincipalId) -> AuthorizationResult<PendingTransaction> {
        self.with_account_lock(id, |mut tx, now| {
            match tx.status {
                TransactionStatus::Pending => {}
                TransactionStatus::Executed => return Err(AuthorizationError::AlreadyExecuted(tx.id)),
                TransactionStatus::Expired => return Err(AuthorizationError::RequestExpired(tx.id)),
                status => return Err(AuthorizationError::InvalidState { id: tx.id, status }),
            }
            if self.expire_if_due(&mut tx, now)? {
                return Err(AuthorizationError::RequestExpired(tx.id));
            }

            let policy = self.active_policy(&tx.account_id)?;
            let signer = self.active_signer(&tx.account_id, principal)?;

            let added = tx.approvals.insert(Approval {
                principal: principal.clone(),
                weight: signer.weight,
                approved_at: now,
            });
            if !added {
                return Err(AuthorizationError::AlreadyApproved {
                    id: tx.id,
                    principal: principal.clone(),
                });
            }

            let tally = tx.tally();
            tx.approved_weight = tally.weight;
            let reached = policy.threshold().is_met_by(tally);
            if reached {
                tx.status = TransactionStatus::Approved;
                tx.approved_at = Some(now);
            }
            self.store.save(&tx)?;

            tracing::info!(
                tx = %tx.id,
                signer = %principal,
                signatures = tally.count,
                weight = tally.weight,
                "Transaction approval recorded"
            );
            self.audit(&tx, AuditAction::TransactionApproved, principal.as_str(), Severity::Info, now);
            if reached {
                tracing::info!(tx = %tx.id, account = %tx.account_id, "Transaction approved");
                self.audit(&tx, AuditAction::TransactionThresholdReached, principal.as_str(), Severity::Info, now);
            }
            Ok(tx)
        })
    }

    /// Carry out an approved transaction once its timelock has elapsed
    ///
    /// Executing an already executed transaction succeeds without calling
    /// the backend again. A backend failure leaves the transaction Approved.
    /// If the backend succeeds but the result cannot be saved, the receipt
    /// is still audited as critical before the storage error is returned.
    pub fn execute(&self, id: &str) -> AuthorizationResult<PendingTransaction> {
        self.with_account_lock(id, |mut tx, now| {
            match tx.status {
                TransactionStatus::Executed => {
                    tracing::debug!(tx = %tx.id, "Transaction already executed");
                    return Ok(tx);
                }
                TransactionStatus::Approved => {}
                TransactionStatus::Expired => return Err(AuthorizationError::RequestExpired(tx.id)),
                status => return Err(AuthorizationError::NotApproved { id: tx.id, status }),
            }
            if self.expire_if_due(&mut tx, now)? {
                return Err(AuthorizationError::RequestExpired(tx.id));
            }

            let policy = self.active_policy(&tx.account_id)?;
            let approved_at = tx.approved_at.unwrap_or(tx.created_at);
            if !window::delay_elapsed(approved_at, policy.timelock_duration, now) {
                let remaining = window::remaining(approved_at, policy.timelock_duration, now);
                return Err(AuthorizationError::TimelockNotElapsed {
                    id: tx.id,
                    remaining_secs: remaining.num_seconds(),
                });
            }

            let action = ActionRequest {
                request_id: tx.id.clone(),
                account: tx.account_id.clone(),
                target: tx.target.clone(),
                value: tx.value,
                payload: tx.payload.clone(),
            };
            match self.backend.execute_action(&action) {
                Ok(receipt) => {
                    tx.status = TransactionStatus::Executed;
                    tx.executed_at = Some(now);
                    tx.execution_reference = Some(receipt.reference);
                    if let Err(e) = self.store.save(&tx) {
                        // The action ran; keep its reference on the audit trail
                        tracing::error!(
                            tx = %tx.id,
                            reference = tx.execution_reference.as_deref().unwrap_or_default(),
                            error = %e,
                            "Executed transaction could not be saved"
                        );
                        self.audit(&tx, AuditAction::TransactionExecuted, "backend", Severity::Critical, now);
                        return Err(e);
                    }

                    tracing::info!(
                        tx = %tx.id,
                        account = %tx.account_id,
                        reference = tx.execution_reference.as_deref().unwrap_or_default(),
                        "Transaction executed"
                    );
                    self.audit(&tx, AuditAction::TransactionExecuted, "backend", Severity::Info, now);
                    Ok(tx)
                }
                Err(e) => {
                    tracing::warn!(
                        tx = %tx.id,
                        error = %e,
                        outcome_known = e.outcome_known(),
                        "Transaction execution failed"
                    );
                    self.audit(&tx, AuditAction::TransactionExecutionFailed, e.class(), Severity::Warning, now);
                    Err(e.into())
                }
            }
        })
    }

    /// Veto a pending or approved transaction
    ///
    /// Only active Supervisor or Emergency signers may veto.
    pub fn reject(
        &self,
        id: &str,
        actor: &PrincipalId,
        reason: Option<&str>,
    ) -> AuthorizationResult<PendingTransaction> {
        self.with_account_lock(id, |mut tx, now| {
            match tx.status {
                TransactionStatus::Pending | TransactionStatus::Approved => {}
                TransactionStatus::Executed => return Err(AuthorizationError::AlreadyExecuted(tx.id)),
                status => return Err(AuthorizationError::InvalidState { id: tx.id, status }),
            }
            if self.expire_if_due(&mut tx, now)? {
                return Err(AuthorizationError::RequestExpired(tx.id));
            }

            let signer = self.active_signer(&tx.account_id, actor)?;
            if !signer.role.can_veto() {
                return Err(AuthorizationError::unauthorized(
                    actor,
                    format!("{} signers cannot veto", signer.role),
                ));
            }

            tx.status = TransactionStatus::Rejected;
            tx.rejected_by = Some(actor.clone());
            tx.rejection_reason = reason.map(|s| s.to_string());
            self.store.save(&tx)?;

            tracing::info!(tx = %tx.id, actor = %actor, reason = ?reason, "Transaction rejected");
            self.audit(&tx, AuditAction::TransactionRejected, actor.as_str(), Severity::Warning, now);
            Ok(tx)
        })
    }

    /// Get a transaction, expiring it first if its deadline has passed
    pub fn get(&self, id: &str) -> AuthorizationResult<PendingTransaction> {
        self.with_account_lock(id, |mut tx, now| {
            self.expire_if_due(&mut tx, now)?;
            Ok(tx)
        })
    }

    /// Transactions of an account, newest first
    pub fn list(
        &self,
        account: &AccountId,
        status: Option<TransactionStatus>,
    ) -> AuthorizationResult<Vec<PendingTransaction>> {
        self.expire_account(account)?;
        self.store.list(account, status)
    }

    pub fn stats(&self, account: &AccountId) -> AuthorizationResult<TransactionStats> {
        self.expire_account(account)?;
        Ok(TransactionStats {
            pending: self.store.count_by_status(account, TransactionStatus::Pending)?,
            approved: self.store.count_by_status(account, TransactionStatus::Approved)?,
            executed: self.store.count_by_status(account, TransactionStatus::Executed)?,
            rejected: self.store.count_by_status(account, TransactionStatus::Rejected)?,
            expired: self.store.count_by_status(account, TransactionStatus::Expired)?,
        })
    }

    /// Expire every live transaction of an account whose deadline passed
    fn expire_account(&self, account: &AccountId) -> AuthorizationResult<usize> {
        let slot = self.policies.account_slot(account);
        let _guard = slot.lock();
        let now = self.clock.now();

        let mut expired = 0;
        for status in [TransactionStatus::Pending, TransactionStatus::Approved] {
            for mut tx in self.store.list(account, Some(status))? {
                if self.expire_if_due(&mut tx, now)? {
                    expired += 1;
                }
            }
        }
        Ok(expired)
    }

    /// Load a transaction, take its account's lock, reload it and read the
    /// clock, then run `op`
    fn with_account_lock<T>(
        &self,
        id: &str,
        op: impl FnOnce(PendingTransaction, Timestamp) -> AuthorizationResult<T>,
    ) -> AuthorizationResult<T> {
        let account = self.load(id)?.account_id;
        let slot = self.policies.account_slot(&account);
        let _guard = slot.lock();

        let tx = self.load(id)?;
        let now = self.clock.now();
        op(tx, now)
    }

    fn load(&self, id: &str) -> AuthorizationResult<PendingTransaction> {
        self.store
            .get(id)?
            .ok_or_else(|| AuthorizationError::NotFound(id.to_string()))
    }

    /// Persist the Expired transition if a live transaction is past its
    /// deadline; returns whether it did
    fn expire_if_due(&self, tx: &mut PendingTransaction, now: Timestamp) -> AuthorizationResult<bool> {
        let live = matches!(tx.status, TransactionStatus::Pending | TransactionStatus::Approved);
        if !live || now <= tx.expires_at {
            return Ok(false);
        }

        tx.status = TransactionStatus::Expired;
        self.store.save(tx)?;

        tracing::info!(tx = %tx.id, account = %tx.account_id, "Transaction expired");
        self.audit(tx, AuditAction::TransactionExpired, "system", Severity::Info, now);
        Ok(true)
    }

    fn active_policy(&self, account: &AccountId) -> AuthorizationResult<AccountPolicy> {
        self.policies
            .get_transaction_policy(account)?
            .filter(|p| p.active)
            .ok_or_else(|| AuthorizationError::PolicyInactive(account.clone()))
    }

    fn active_signer(&self, account: &AccountId, principal: &PrincipalId) -> AuthorizationResult<Signer> {
        match self.policies.get_signer(account, principal)? {
            Some(signer) if signer.active => Ok(signer),
            Some(_) => Err(AuthorizationError::unauthorized(principal, "signer is inactive")),
            None => Err(AuthorizationError::unauthorized(
                principal,
                format!("not a signer of {}", account),
            )),
        }
    }

    fn screen(
        &self,
        compliance: &ComplianceEngine,
        account: &AccountId,
        target: &str,
        value: Decimal,
        payload: &str,
        now: Timestamp,
    ) -> AuthorizationResult<()> {
        let principal = PrincipalId::new(account.as_str());
        let assessment = compliance.evaluate_at(&principal, target, value, payload, now)?;

        let Some(kind) = assessment.refusal() else {
            return Ok(());
        };
        tracing::warn!(
            account = %account,
            target = %target,
            score = assessment.score,
            refusal = %kind,
            "Proposal refused by screening"
        );

        Err(match kind {
            ErrorKind::SanctionedParty => {
                let (party, list) = compliance
                    .is_sanctioned(principal.as_str())
                    .map(|list| (principal.to_string(), list))
                    .or_else(|| compliance.is_sanctioned(target).map(|list| (target.to_string(), list)))
                    .unwrap_or_else(|| (target.to_string(), "unknown".to_string()));
                AuthorizationError::SanctionedParty { party, list }
            }
            ErrorKind::IdentityNotVerified => AuthorizationError::IdentityNotVerified(principal),
            _ => AuthorizationError::RiskRejected {
                score: assessment.score,
            },
        })
    }

    fn audit(
        &self,
        tx: &PendingTransaction,
        action: AuditAction,
        actor: &str,
        severity: Severity,
        now: Timestamp,
    ) {
        record(
            self.audit.as_ref(),
            AuditEvent::new(tx.id.as_str(), action, actor, tx, now)
                .for_account(&tx.account_id)
                .with_severity(severity),
        );
    }
}
