//! Compliance Engine - risk scoring and identity queries
//!
//! Coordinates signal scoring, sanction checks, identity lookup, history
//! and audit writes. Sanction lists and history are written to the
//! [`ComplianceStore`] before the in-memory view changes, and reloaded from it
//! when the engine starts.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use quorum_audit::{record, AuditAction, AuditEvent, AuditSink, Severity};
use quorum_core::{Clock, PrincipalId, Timestamp};
use quorum_policy::PolicyStore;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::json;

use crate::assessment::{RiskAssessment, RiskLevel, RiskSignals};
use crate::config::ComplianceConfig;
use crate::error::{ComplianceError, ComplianceResult};
use crate::history::AssessmentHistory;
use crate::identity::IdentityDirectory;
use crate::sanctions::{SanctionList, SanctionsRegistry};
use crate::store::ComplianceStore;

/// Actor recorded on events the engine emits on its own behalf
const ENGINE_ACTOR: &str = "compliance-engine";

/// Main Compliance Engine
pub struct ComplianceEngine {
    config: ComplianceConfig,
    policies: Arc<PolicyStore>,
    identities: Arc<dyn IdentityDirectory>,
    store: ComplianceStore,
    sanctions: SanctionsRegistry,
    /// Serializes list edits so the store and the registry agree
    sanction_writes: Mutex<()>,
    history: Mutex<AssessmentHistory>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl ComplianceEngine {
    pub fn new(
        config: ComplianceConfig,
        policies: Arc<PolicyStore>,
        store: ComplianceStore,
        identities: Arc<dyn IdentityDirectory>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> ComplianceResult<Self> {
        config.validate()?;

        let sanctions = SanctionsRegistry::from_lists(store.load_lists()?);
        let mut history = AssessmentHistory::new(config.history_limit);
        let restored = store.load_assessments()?;
        let assessments = restored.len();
        for assessment in restored {
            history.record(assessment);
        }
        tracing::info!(
            lists = sanctions.lists().len(),
            assessments,
            "Compliance state loaded"
        );

        Ok(Self {
            config,
            policies,
            identities,
            store,
            sanctions,
            sanction_writes: Mutex::new(()),
            history: Mutex::new(history),
            audit,
            clock,
        })
    }

    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    fn history(&self) -> MutexGuard<'_, AssessmentHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Score a proposed action by `principal` towards `target`
    ///
    /// The assessment is recorded in the principal's history (so it counts
    /// towards the velocity of later evaluations) and audited.
    pub fn evaluate(
        &self,
        principal: &PrincipalId,
        target: &str,
        value: Decimal,
        payload: &str,
    ) -> ComplianceResult<RiskAssessment> {
        self.evaluate_at(principal, target, value, payload, self.clock.now())
    }

    /// [`ComplianceEngine::evaluate`] at an instant the caller already read
    pub fn evaluate_at(
        &self,
        principal: &PrincipalId,
        target: &str,
        value: Decimal,
        payload: &str,
        now: Timestamp,
    ) -> ComplianceResult<RiskAssessment> {
        let thresholds = self.policies.risk_thresholds()?;

        // Held until the assessment is recorded so concurrent evaluations of
        // one principal see each other
        let mut history = self.history();

        let signals = RiskSignals {
            velocity: history.velocity_score(
                principal,
                now,
                self.config.velocity_window(),
                self.config.velocity_weight,
            ),
            magnitude: self.magnitude_score(value),
            payload: self.payload_score(payload),
        };
        let score = signals.total();

        let sanction_hit = self
            .sanctions
            .is_sanctioned(principal.as_str())
            .map(|list| (principal.as_str().to_string(), list))
            .or_else(|| {
                self.sanctions
                    .is_sanctioned(target)
                    .map(|list| (target.to_string(), list))
            });
        let sanctioned = sanction_hit.is_some();
        let verified = self.is_verified_at(principal, now);

        let risk_level = if sanctioned {
            RiskLevel::Critical
        } else {
            RiskLevel::from_score(score, &thresholds)
        };
        let passed = !sanctioned && score < thresholds.reject_threshold && verified;

        let assessment = RiskAssessment {
            principal_id: principal.clone(),
            target: target.to_string(),
            value,
            score,
            risk_level,
            signals,
            sanctioned,
            verified,
            passed,
            checked_at: now,
        };
        self.store.record_assessment(&assessment, self.config.history_limit)?;
        history.record(assessment.clone());
        drop(history);

        if let Some((party, list)) = &sanction_hit {
            tracing::warn!(principal = %principal, party = %party, list = %list, "Sanction hit");
            record(
                self.audit.as_ref(),
                AuditEvent::new(
                    party.as_str(),
                    AuditAction::SanctionHit,
                    ENGINE_ACTOR,
                    &json!({ "principal": principal, "target": target, "list": list }),
                    now,
                )
                .with_severity(Severity::Warning),
            );
        }

        tracing::info!(
            principal = %principal,
            target = %target,
            score,
            level = %risk_level,
            passed,
            "Risk evaluated"
        );
        record(
            self.audit.as_ref(),
            AuditEvent::new(
                principal.as_str(),
                AuditAction::RiskEvaluated,
                ENGINE_ACTOR,
                &assessment,
                now,
            )
            .with_severity(if passed { Severity::Info } else { Severity::Warning }),
        );

        Ok(assessment)
    }

    /// `magnitude_weight × min(value / threshold, cap)` above the threshold
    ///
    /// A quotient too large for `Decimal` is past the cap anyway.
    fn magnitude_score(&self, value: Decimal) -> u32 {
        if value <= self.config.magnitude_threshold {
            return 0;
        }
        let cap = self.config.magnitude_cap;
        let multiple = value
            .checked_div(self.config.magnitude_threshold)
            .map_or(cap, |m| m.min(cap));
        Decimal::from(self.config.magnitude_weight)
            .checked_mul(multiple)
            .and_then(|score| score.floor().to_u32())
            .unwrap_or(u32::MAX)
    }

    /// Size units (capped) plus a penalty for unstructured payloads
    fn payload_score(&self, payload: &str) -> u32 {
        if payload.is_empty() {
            return 0;
        }
        let units = u32::try_from(payload.len() / self.config.payload_unit_bytes).unwrap_or(u32::MAX);
        let size = units
            .saturating_mul(self.config.payload_size_weight)
            .min(self.config.payload_size_cap);
        let structured = serde_json::from_str::<serde_json::Value>(payload).is_ok();
        if structured {
            size
        } else {
            size.saturating_add(self.config.payload_unstructured_weight)
        }
    }

    /// Identity verified and unexpired right now
    pub fn is_verified(&self, principal: &PrincipalId) -> bool {
        self.is_verified_at(principal, self.clock.now())
    }

    fn is_verified_at(&self, principal: &PrincipalId, now: Timestamp) -> bool {
        self.identities
            .lookup(principal)
            .is_some_and(|r| r.is_verified_at(now))
    }

    /// Latest assessed level, else the identity record's, else Low
    pub fn risk_level(&self, principal: &PrincipalId) -> RiskLevel {
        if let Some(latest) = self.history().latest(principal) {
            return latest.risk_level;
        }
        self.identities
            .lookup(principal)
            .map(|r| r.risk_level)
            .unwrap_or_default()
    }

    /// Up to `limit` assessments of a principal, most recent first
    pub fn aml_history(&self, principal: &PrincipalId, limit: usize) -> Vec<RiskAssessment> {
        self.history().recent(principal, limit)
    }

    // === Sanction management ===

    pub fn upsert_sanction_list(
        &self,
        actor: &PrincipalId,
        name: &str,
        entries: Vec<String>,
        active: bool,
    ) -> ComplianceResult<SanctionList> {
        let now = self.clock.now();
        let writes = self.sanction_writes();
        let list = SanctionList::new(name, entries, active, now);
        self.store.save_list(&list)?;
        self.sanctions.put(list.clone());
        drop(writes);

        self.audit_list_change(actor, name, json!({ "op": "upsert", "entries": list.entries.len(), "active": active }), now);
        Ok(list)
    }

    pub fn add_sanction_entry(&self, actor: &PrincipalId, name: &str, party: &str) -> ComplianceResult<bool> {
        let now = self.clock.now();
        let added = self.update_list(name, |list| list.insert(party, now))?;
        if added {
            self.audit_list_change(actor, name, json!({ "op": "add", "party": party }), now);
        }
        Ok(added)
    }

    pub fn remove_sanction_entry(&self, actor: &PrincipalId, name: &str, party: &str) -> ComplianceResult<bool> {
        let now = self.clock.now();
        let removed = self.update_list(name, |list| list.remove(party, now))?;
        if removed {
            self.audit_list_change(actor, name, json!({ "op": "remove", "party": party }), now);
        }
        Ok(removed)
    }

    pub fn set_sanction_list_active(&self, actor: &PrincipalId, name: &str, active: bool) -> ComplianceResult<()> {
        let now = self.clock.now();
        self.update_list(name, |list| list.set_active(active, now))?;
        self.audit_list_change(actor, name, json!({ "op": "set_active", "active": active }), now);
        Ok(())
    }

    fn sanction_writes(&self) -> MutexGuard<'_, ()> {
        self.sanction_writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` to a copy of the list, persist it, then publish it
    fn update_list<T>(&self, name: &str, change: impl FnOnce(&mut SanctionList) -> T) -> ComplianceResult<T> {
        let _writes = self.sanction_writes();
        let mut list = self
            .sanctions
            .get_list(name)
            .ok_or_else(|| ComplianceError::ListNotFound(name.to_string()))?;
        let outcome = change(&mut list);
        self.store.save_list(&list)?;
        self.sanctions.put(list);
        Ok(outcome)
    }

    /// Name of the active list the party is on, if any
    pub fn is_sanctioned(&self, party: &str) -> Option<String> {
        self.sanctions.is_sanctioned(party)
    }

    pub fn sanction_lists(&self) -> Vec<SanctionList> {
        self.sanctions.lists()
    }

    fn audit_list_change(&self, actor: &PrincipalId, name: &str, data: serde_json::Value, now: Timestamp) {
        tracing::info!(actor = %actor, list = %name, change = %data, "Sanction list updated");
        record(
            self.audit.as_ref(),
            AuditEvent::new(name, AuditAction::SanctionListUpdated, actor.as_str(), &data, now),
        );
    }
}
