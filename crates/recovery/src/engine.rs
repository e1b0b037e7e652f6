//! Recovery engine - guardian approval, delay and cooldown

use std::sync::Arc;

use quorum_audit::{record, AuditAction, AuditEvent, AuditSink, Severity};
use quorum_backend::{ExecutionBackend, OwnershipTransfer};
use quorum_core::{window, AccountId, Approval, Clock, PrincipalId, Timestamp};
use quorum_policy::{Guardian, GuardianPolicy, PolicyStore};

use crate::error::{RecoveryError, RecoveryResult};
use crate::request::{RecoveryRequest, RecoveryStatus};
use crate::store::RecoveryStore;

/// Rejection reason stamped on requests an emergency override cancels
pub const SUPERSEDED_REASON: &str = "superseded by emergency override";

/// Guardian-approved account recovery
pub struct RecoveryEngine {
    policies: Arc<PolicyStore>,
    store: RecoveryStore,
    backend: Arc<dyn ExecutionBackend>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl RecoveryEngine {
    pub fn new(
        policies: Arc<PolicyStore>,
        store: RecoveryStore,
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
        }
    }

    /// Open a recovery request on behalf of an active guardian
    pub fn initiate(
        &self,
        account: &AccountId,
        new_owner: &PrincipalId,
        actor: &PrincipalId,
    ) -> RecoveryResult<RecoveryRequest> {
        let slot = self.policies.account_slot(account);
        let _guard = slot.lock();
        let now = self.clock.now();

        let policy = self.active_policy(account)?;
        self.active_guardian(account, actor)?;
        self.check_cooldown(account, &policy, now)?;

        let nonce = self.store.count_for_account(account)?;
        let request = RecoveryRequest::new(account.clone(), new_owner.clone(), actor.clone(), now, nonce);
        self.store.save(&request)?;

        tracing::info!(
            account = %account,
            request = %request.id,
            initiator = %actor,
            new_owner = %new_owner,
            "Recovery initiated"
        );
        self.audit(&request, AuditAction::RecoveryInitiated, actor.as_str(), Severity::Warning, now);
        Ok(request)
    }

    /// Record a guardian's approval
    ///
    /// Only approvals given within the policy's approval window count
    /// towards the threshold. Older ones stay on the request but are inert.
    pub fn approve(&self, id: &str, guardian: &PrincipalId) -> RecoveryResult<RecoveryRequest> {
        self.with_account_lock(id, |mut request, now| {
            match request.status {
                RecoveryStatus::Initiated => {}
                RecoveryStatus::Executed => return Err(RecoveryError::AlreadyExecuted(request.id)),
                status => return Err(RecoveryError::InvalidState { id: request.id, status }),
            }

            let policy = self.active_policy(&request.account_id)?;
            let member = self.active_guardian(&request.account_id, guardian)?;

            let added = request.approvals.insert(Approval {
                principal: guardian.clone(),
                weight: member.weight,
                approved_at: now,
            });
            if !added {
                return Err(RecoveryError::AlreadyApproved {
                    id: request.id,
                    principal: guardian.clone(),
                });
            }

            let tally = request.approvals.tally_within(now, policy.approval_window);
            request.valid_approvals = tally.count;
            request.approved_weight = tally.weight;
            let reached = policy.threshold().is_met_by(tally);
            if reached {
                request.status = RecoveryStatus::Approved;
                request.approved_at = Some(now);
            }
            self.store.save(&request)?;

            tracing::info!(
                request = %request.id,
                guardian = %guardian,
                approvals = tally.count,
                weight = tally.weight,
                stale = request.approvals.len() as u32 - tally.count,
                "Recovery approval recorded"
            );
            self.audit(&request, AuditAction::RecoveryApproved, guardian.as_str(), Severity::Info, now);
            if reached {
                tracing::info!(request = %request.id, account = %request.account_id, "Recovery approved");
                self.audit(&request, AuditAction::RecoveryThresholdReached, guardian.as_str(), Severity::Warning, now);
            }
            Ok(request)
        })
    }

    /// Transfer ownership once the delay has elapsed and the account is out
    /// of cooldown
    ///
    /// Executing an already executed request succeeds without calling the
    /// backend again. A backend failure leaves the request Approved.
    pub fn execute(&self, id: &str) -> RecoveryResult<RecoveryRequest> {
        self.with_account_lock(id, |mut request, now| {
            match request.status {
                RecoveryStatus::Executed => {
                    tracing::debug!(request = %request.id, "Recovery already executed");
                    return Ok(request);
                }
                RecoveryStatus::Approved => {}
                status => return Err(RecoveryError::NotApproved { id: request.id, status }),
            }

            let policy = self.active_policy(&request.account_id)?;
            let approved_at = request.approved_at.unwrap_or(request.created_at);
            if !window::delay_elapsed(approved_at, policy.recovery_delay, now) {
                let remaining = window::remaining(approved_at, policy.recovery_delay, now);
                return Err(RecoveryError::DelayNotElapsed {
                    id: request.id,
                    remaining_secs: remaining.num_seconds(),
                });
            }
            self.check_cooldown(&request.account_id, &policy, now)?;

            let transfer = OwnershipTransfer {
                request_id: request.id.clone(),
                account: request.account_id.clone(),
                new_owner: request.proposed_new_owner.clone(),
                emergency: false,
            };
            match self.backend.transfer_ownership(&transfer) {
                Ok(receipt) => {
                    request.status = RecoveryStatus::Executed;
                    request.executed_at = Some(now);
                    request.execution_reference = Some(receipt.reference);
                    self.store.record_execution(&request, now)?;

                    tracing::info!(
                        request = %request.id,
                        account = %request.account_id,
                        new_owner = %request.proposed_new_owner,
                        "Recovery executed"
                    );
                    self.audit(&request, AuditAction::RecoveryExecuted, "backend", Severity::Warning, now);
                    Ok(request)
                }
                Err(e) => {
                    tracing::warn!(
                        request = %request.id,
                        error = %e,
                        outcome_known = e.outcome_known(),
                        "Recovery execution failed"
                    );
                    self.audit(&request, AuditAction::RecoveryExecutionFailed, e.class(), Severity::Warning, now);
                    Err(e.into())
                }
            }
        })
    }

    /// Cancel an open request; any active guardian or an emergency
    /// authority may do so
    pub fn reject(
        &self,
        id: &str,
        actor: &PrincipalId,
        reason: Option<&str>,
    ) -> RecoveryResult<RecoveryRequest> {
        self.with_account_lock(id, |mut request, now| {
            match request.status {
                RecoveryStatus::Initiated | RecoveryStatus::Approved => {}
                RecoveryStatus::Executed => return Err(RecoveryError::AlreadyExecuted(request.id)),
                status => return Err(RecoveryError::InvalidState { id: request.id, status }),
            }

            let is_guardian = self
                .policies
                .get_guardian(&request.account_id, actor)?
                .is_some_and(|g| g.active);
            if !is_guardian && !self.policies.is_emergency_authority(actor)? {
                return Err(RecoveryError::unauthorized(
                    actor,
                    format!("neither a guardian of {} nor an emergency authority", request.account_id),
                ));
            }

            request.status = RecoveryStatus::Rejected;
            request.rejected_by = Some(actor.clone());
            request.rejection_reason = reason.map(|s| s.to_string());
            self.store.save(&request)?;

            tracing::info!(request = %request.id, actor = %actor, reason = ?reason, "Recovery rejected");
            self.audit(&request, AuditAction::RecoveryRejected, actor.as_str(), Severity::Warning, now);
            Ok(request)
        })
    }

    /// Hand the account to `new_owner` immediately
    ///
    /// Skips guardian policy, delay and cooldown, and does not start a new
    /// cooldown. Every open request on the account is rejected in the same
    /// write, so none of them can undo the override later. The attempt is
    /// audited as critical whether or not the backend succeeds.
    pub fn emergency_override(
        &self,
        account: &AccountId,
        new_owner: &PrincipalId,
        actor: &PrincipalId,
    ) -> RecoveryResult<RecoveryRequest> {
        let slot = self.policies.account_slot(account);
        let _guard = slot.lock();
        let now = self.clock.now();

        if !self.policies.is_emergency_authority(actor)? {
            return Err(RecoveryError::unauthorized(actor, "not an emergency authority"));
        }

        let nonce = self.store.count_for_account(account)?;
        let mut request = RecoveryRequest::new(account.clone(), new_owner.clone(), actor.clone(), now, nonce);
        request.emergency = true;

        tracing::warn!(
            account = %account,
            request = %request.id,
            actor = %actor,
            new_owner = %new_owner,
            "Emergency override"
        );
        self.audit(&request, AuditAction::EmergencyOverride, actor.as_str(), Severity::Critical, now);

        let transfer = OwnershipTransfer {
            request_id: request.id.clone(),
            account: account.clone(),
            new_owner: new_owner.clone(),
            emergency: true,
        };
        match self.backend.transfer_ownership(&transfer) {
            Ok(receipt) => {
                request.status = RecoveryStatus::Executed;
                request.approved_at = Some(now);
                request.executed_at = Some(now);
                request.execution_reference = Some(receipt.reference);

                let superseded = self.supersede_open_requests(account, actor)?;
                let mut batch = superseded.clone();
                batch.push(request.clone());
                self.store.save_all(&batch)?;

                tracing::info!(
                    request = %request.id,
                    account = %account,
                    superseded = superseded.len(),
                    "Emergency override executed"
                );
                for open in &superseded {
                    self.audit(open, AuditAction::RecoveryRejected, actor.as_str(), Severity::Warning, now);
                }
                self.audit(&request, AuditAction::RecoveryExecuted, "backend", Severity::Critical, now);
                Ok(request)
            }
            Err(e) => {
                tracing::warn!(request = %request.id, error = %e, "Emergency override failed");
                self.audit(&request, AuditAction::RecoveryExecutionFailed, e.class(), Severity::Critical, now);
                Err(e.into())
            }
        }
    }

    pub fn get(&self, id: &str) -> RecoveryResult<RecoveryRequest> {
        self.load(id)
    }

    /// Requests of an account, newest first
    pub fn list(&self, account: &AccountId, status: Option<RecoveryStatus>) -> RecoveryResult<Vec<RecoveryRequest>> {
        self.store.list(account, status)
    }

    /// Start of the account's current cooldown, if it ever recovered
    pub fn last_execution_at(&self, account: &AccountId) -> RecoveryResult<Option<Timestamp>> {
        self.store.last_execution_at(account)
    }

    fn with_account_lock<T>(
        &self,
        id: &str,
        op: impl FnOnce(RecoveryRequest, Timestamp) -> RecoveryResult<T>,
    ) -> RecoveryResult<T> {
        let account = self.load(id)?.account_id;
        let slot = self.policies.account_slot(&account);
        let _guard = slot.lock();

        let request = self.load(id)?;
        let now = self.clock.now();
        op(request, now)
    }

    /// Open requests of the account, moved to Rejected in memory only
    fn supersede_open_requests(
        &self,
        account: &AccountId,
        actor: &PrincipalId,
    ) -> RecoveryResult<Vec<RecoveryRequest>> {
        let mut open = self.store.list(account, None)?;
        open.retain(|r| matches!(r.status, RecoveryStatus::Initiated | RecoveryStatus::Approved));
        for request in &mut open {
            request.status = RecoveryStatus::Rejected;
            request.rejected_by = Some(actor.clone());
            request.rejection_reason = Some(SUPERSEDED_REASON.to_string());
        }
        Ok(open)
    }

    fn load(&self, id: &str) -> RecoveryResult<RecoveryRequest> {
        self.store
            .get(id)?
            .ok_or_else(|| RecoveryError::NotFound(id.to_string()))
    }

    fn check_cooldown(&self, account: &AccountId, policy: &GuardianPolicy, now: Timestamp) -> RecoveryResult<()> {
        let Some(last) = self.store.last_execution_at(account)? else {
            return Ok(());
        };
        if window::delay_elapsed(last, policy.cooldown_period, now) {
            return Ok(());
        }
        let remaining = window::remaining(last, policy.cooldown_period, now);
        tracing::info!(account = %account, remaining_secs = remaining.num_seconds(), "Recovery cooldown active");
        Err(RecoveryError::CooldownActive {
            account: account.clone(),
            remaining_secs: remaining.num_seconds(),
        })
    }

    fn active_policy(&self, account: &AccountId) -> RecoveryResult<GuardianPolicy> {
        self.policies
            .get_recovery_policy(account)?
            .filter(|p| p.active)
            .ok_or_else(|| RecoveryError::PolicyInactive(account.clone()))
    }

    fn active_guardian(&self, account: &AccountId, principal: &PrincipalId) -> RecoveryResult<Guardian> {
        match self.policies.get_guardian(account, principal)? {
            Some(guardian) if guardian.active => Ok(guardian),
            Some(_) => Err(RecoveryError::unauthorized(principal, "guardian is inactive")),
            None => Err(RecoveryError::unauthorized(
                principal,
                format!("not a guardian of {}", account),
            )),
        }
    }

    fn audit(
        &self,
        request: &RecoveryRequest,
        action: AuditAction,
        actor: &str,
        severity: Severity,
        now: Timestamp,
    ) {
        record(
            self.audit.as_ref(),
            AuditEvent::new(request.id.as_str(), action, actor, request, now)
                .for_account(&request.account_id)
                .with_severity(severity),
        );
    }
}
