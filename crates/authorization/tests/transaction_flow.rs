//! Integration tests for the transaction approval workflow
//!
//! These tests drive the engine end to end over an in-memory policy store,
//! a recording backend and an in-memory audit log, with a manual clock.

use std::sync::Arc;
use std::thread;

use chrono::{Duration, TimeZone, Utc};
use quorum_audit::{data_hash, AuditAction, AuditSink, MemoryAuditLog, Severity};
use quorum_authorization::{AuthorizationEngine, AuthorizationError, TransactionStatus, TransactionStore};
use quorum_backend::{BackendError, RecordingBackend};
use quorum_compliance::{
    ComplianceConfig, ComplianceEngine, ComplianceStore, IdentityRecord, MemoryIdentityDirectory,
    RiskLevel, VerificationStatus,
};
use quorum_core::{AccountId, Clock, ErrorKind, ManualClock, PrincipalId};
use quorum_policy::{NewSigner, PolicyStore, SignerRole, TransactionPolicyConfig};
use rust_decimal_macros::dec;
use tempfile::tempdir;

struct Harness {
    engine: AuthorizationEngine,
    policies: Arc<PolicyStore>,
    backend: Arc<RecordingBackend>,
    audit: Arc<MemoryAuditLog>,
    clock: Arc<ManualClock>,
}

fn account() -> AccountId {
    AccountId::new("ACC-001")
}

fn p(name: &str) -> PrincipalId {
    PrincipalId::new(name)
}

fn policy_config() -> TransactionPolicyConfig {
    TransactionPolicyConfig {
        active: true,
        required_signatures: 2,
        required_weight: 200,
        timelock_duration: Duration::hours(1),
        expiration_duration: Duration::hours(24),
        value_threshold: dec!(1000),
    }
}

/// Signers A(100), B(150), C(200) plus a supervisor S(50) on ACC-001
fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
    ));
    let policies = Arc::new(PolicyStore::in_memory(clock.clone()).unwrap());
    policies
        .set_transaction_policy(
            &account(),
            policy_config(),
            Some(vec![
                NewSigner::new("A", SignerRole::Operator, 100),
                NewSigner::new("B", SignerRole::Operator, 150),
                NewSigner::new("C", SignerRole::Operator, 200),
                NewSigner::new("S", SignerRole::Supervisor, 50),
            ]),
        )
        .unwrap();

    let backend = Arc::new(RecordingBackend::new());
    let audit = Arc::new(MemoryAuditLog::new());
    let engine = AuthorizationEngine::new(
        policies.clone(),
        TransactionStore::in_memory().unwrap(),
        backend.clone(),
        audit.clone(),
        clock.clone(),
    );

    Harness {
        engine,
        policies,
        backend,
        audit,
        clock,
    }
}

fn actions_for(audit: &MemoryAuditLog, subject: &str) -> Vec<AuditAction> {
    audit
        .events_for(subject)
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect()
}

/// Test: propose → A → B → timelock → execute
#[test]
fn test_weighted_approval_workflow() {
    let h = harness();

    // 1. Propose above the value threshold
    let tx = h
        .engine
        .propose(&account(), &p("A"), "vendor-42", dec!(5000), r#"{"memo":"invoice 7"}"#)
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert!(tx.id.starts_with("TX-"));
    assert_eq!(tx.expires_at, tx.created_at + Duration::hours(24));

    // 2. A approves: one signature, weight 100
    let tx = h.engine.approve(&tx.id, &p("A")).unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.approved_weight, 100);

    // 3. B approves: two signatures, weight 250
    h.clock.advance(Duration::minutes(10));
    let tx = h.engine.approve(&tx.id, &p("B")).unwrap();
    assert_eq!(tx.status, TransactionStatus::Approved);
    assert_eq!(tx.approved_weight, 250);
    let approved_at = tx.approved_at.unwrap();

    // 4. Execute inside the timelock
    h.clock.advance(Duration::minutes(59));
    let err = h.engine.execute(&tx.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TimelockNotElapsed);
    assert!(matches!(
        err,
        AuthorizationError::TimelockNotElapsed { remaining_secs: 60, .. }
    ));
    assert_eq!(h.backend.action_count(), 0);

    // 5. Execute exactly at the end of the timelock
    h.clock.set(approved_at + Duration::hours(1));
    let tx = h.engine.execute(&tx.id).unwrap();
    assert_eq!(tx.status, TransactionStatus::Executed);
    assert_eq!(tx.execution_reference.as_deref(), Some("MOCK-1"));
    assert_eq!(h.backend.action_count(), 1);

    let action = &h.backend.actions()[0];
    assert_eq!(action.request_id, tx.id);
    assert_eq!(action.target, "vendor-42");
    assert_eq!(action.value, dec!(5000));

    // 6. Audit trail
    assert_eq!(
        actions_for(&h.audit, &tx.id),
        vec![
            AuditAction::TransactionProposed,
            AuditAction::TransactionApproved,
            AuditAction::TransactionApproved,
            AuditAction::TransactionThresholdReached,
            AuditAction::TransactionExecuted,
        ]
    );
}

#[test]
fn test_threshold_needs_both_count_and_weight() {
    let h = harness();

    // C alone carries the full weight but only one signature
    let tx = h
        .engine
        .propose(&account(), &p("C"), "vendor-1", dec!(2000), "")
        .unwrap();
    let tx = h.engine.approve(&tx.id, &p("C")).unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.approved_weight, 200);

    // A and S give two signatures but only weight 150
    let tx = h
        .engine
        .propose(&account(), &p("A"), "vendor-1", dec!(2000), "")
        .unwrap();
    h.engine.approve(&tx.id, &p("A")).unwrap();
    let tx = h.engine.approve(&tx.id, &p("S")).unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.approvals.len(), 2);
    assert_eq!(tx.approved_weight, 150);
}

#[test]
fn test_execute_is_idempotent() {
    let h = harness();
    let tx = h
        .engine
        .propose(&account(), &p("A"), "vendor-1", dec!(2000), "")
        .unwrap();
    h.engine.approve(&tx.id, &p("A")).unwrap();
    h.engine.approve(&tx.id, &p("C")).unwrap();
    h.clock.advance(Duration::hours(2));

    let first = h.engine.execute(&tx.id).unwrap();
    let second = h.engine.execute(&tx.id).unwrap();

    assert_eq!(first, second);
    assert_eq!(h.backend.action_count(), 1);

    // Further approvals are refused once executed
    let err = h.engine.approve(&tx.id, &p("B")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExecuted);
}

#[test]
fn test_execute_requires_approval() {
    let h = harness();
    let tx = h
        .engine
        .propose(&account(), &p("A"), "vendor-1", dec!(2000), "")
        .unwrap();
    h.engine.approve(&tx.id, &p("A")).unwrap();
    h.clock.advance(Duration::hours(2));

    let err = h.engine.execute(&tx.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotApproved);
    assert_eq!(h.backend.action_count(), 0);
}

#[test]
fn test_backend_failure_keeps_transaction_approved() {
    let h = harness();
    let tx = h
        .engine
        .propose(&account(), &p("A"), "vendor-1", dec!(2000), "")
        .unwrap();
    h.engine.approve(&tx.id, &p("B")).unwrap();
    h.engine.approve(&tx.id, &p("C")).unwrap();
    h.clock.advance(Duration::hours(1));

    h.backend.fail_next(BackendError::Unavailable("ledger offline".to_string()));
    let err = h.engine.execute(&tx.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExecutionBackendError);
    assert!(err.kind().is_retryable());

    let stored = h.engine.get(&tx.id).unwrap();
    assert_eq!(stored.status, TransactionStatus::Approved);
    assert!(stored.execution_reference.is_none());

    let failure = h
        .audit
        .events_for(&tx.id)
        .unwrap()
        .into_iter()
        .find(|e| e.action == AuditAction::TransactionExecutionFailed)
        .unwrap();
    assert_eq!(failure.severity, Severity::Warning);
    assert_eq!(failure.actor, "unavailable");

    // Retry succeeds
    let tx = h.engine.execute(&tx.id).unwrap();
    assert_eq!(tx.status, TransactionStatus::Executed);
    assert_eq!(h.backend.action_count(), 1);
}

#[test]
fn test_expiry_is_persisted_and_audited() {
    let h = harness();
    let tx = h
        .engine
        .propose(&account(), &p("A"), "vendor-1", dec!(2000), "")
        .unwrap();
    h.engine.approve(&tx.id, &p("A")).unwrap();

    // Exactly at the deadline the transaction is still live
    h.clock.advance(Duration::hours(24));
    let live = h.engine.get(&tx.id).unwrap();
    assert_eq!(live.status, TransactionStatus::Pending);

    h.clock.advance(Duration::seconds(1));
    let err = h.engine.approve(&tx.id, &p("B")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestExpired);

    let stored = h.engine.get(&tx.id).unwrap();
    assert_eq!(stored.status, TransactionStatus::Expired);
    assert_eq!(stored.approved_weight, 100);

    let expired: Vec<_> = h
        .audit
        .events_for(&tx.id)
        .unwrap()
        .into_iter()
        .filter(|e| e.action == AuditAction::TransactionExpired)
        .collect();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].actor, "system");

    let err = h.engine.execute(&tx.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestExpired);
}

#[test]
fn test_approved_transaction_expires_before_execution() {
    let h = harness();
    let tx = h
        .engine
        .propose(&account(), &p("A"), "vendor-1", dec!(2000), "")
        .unwrap();
    h.engine.approve(&tx.id, &p("A")).unwrap();
    h.engine.approve(&tx.id, &p("B")).unwrap();

    h.clock.advance(Duration::hours(25));
    let err = h.engine.execute(&tx.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestExpired);
    assert_eq!(h.backend.action_count(), 0);
}

#[test]
fn test_duplicate_approval_adds_no_weight() {
    let h = harness();
    let tx = h
        .engine
        .propose(&account(), &p("A"), "vendor-1", dec!(2000), "")
        .unwrap();
    h.engine.approve(&tx.id, &p("C")).unwrap();

    let err = h.engine.approve(&tx.id, &p("C")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyApproved);

    let stored = h.engine.get(&tx.id).unwrap();
    assert_eq!(stored.approvals.len(), 1);
    assert_eq!(stored.approved_weight, 200);
    assert_eq!(stored.status, TransactionStatus::Pending);
}

#[test]
fn test_concurrent_approvals_are_all_counted() {
    let h = harness();
    // Every signer is needed
    h.policies
        .set_transaction_policy(
            &account(),
            TransactionPolicyConfig {
                required_signatures: 4,
                required_weight: 500,
                ..policy_config()
            },
            None,
        )
        .unwrap();
    let tx = h
        .engine
        .propose(&account(), &p("A"), "vendor-1", dec!(2000), "")
        .unwrap();

    let signers = ["A", "B", "C", "S", "A", "B", "C", "S"];
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = signers
            .iter()
            .map(|s| {
                let engine = &h.engine;
                let id = tx.id.as_str();
                scope.spawn(move || (*s, engine.approve(id, &p(s))))
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    for signer in ["A", "B", "C", "S"] {
        let outcomes: Vec<_> = results.iter().filter(|(s, _)| *s == signer).collect();
        assert_eq!(outcomes.iter().filter(|(_, r)| r.is_ok()).count(), 1);
        let repeat = outcomes.iter().find_map(|(_, r)| r.as_ref().err()).unwrap();
        assert!(matches!(
            repeat.kind(),
            ErrorKind::AlreadyApproved | ErrorKind::InvalidState
        ));
    }

    let stored = h.engine.get(&tx.id).unwrap();
    assert_eq!(stored.status, TransactionStatus::Approved);
    assert_eq!(stored.approvals.len(), 4);
    assert_eq!(stored.approved_weight, 500);

    let reached = actions_for(&h.audit, &tx.id)
        .into_iter()
        .filter(|a| *a == AuditAction::TransactionThresholdReached)
        .count();
    assert_eq!(reached, 1);
}

#[test]
fn test_executed_receipt_is_audited_when_save_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("transactions.db");
    let h = harness();
    let engine = AuthorizationEngine::new(
        h.policies.clone(),
        TransactionStore::open(&path).unwrap(),
        h.backend.clone(),
        h.audit.clone(),
        h.clock.clone(),
    );

    let tx = engine
        .propose(&account(), &p("A"), "vendor-1", dec!(2000), "")
        .unwrap();
    engine.approve(&tx.id, &p("A")).unwrap();
    engine.approve(&tx.id, &p("B")).unwrap();
    h.clock.advance(Duration::hours(1));

    // Refuse all further writes to the transactions table
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TRIGGER refuse_insert BEFORE INSERT ON transactions
            BEGIN SELECT RAISE(ABORT, 'disk full'); END;
         CREATE TRIGGER refuse_update BEFORE UPDATE ON transactions
            BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
    )
    .unwrap();

    let err = engine.execute(&tx.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_eq!(h.backend.action_count(), 1);

    // The stored row is still Approved; the audit event describes what ran
    let mut expected = engine.get(&tx.id).unwrap();
    assert_eq!(expected.status, TransactionStatus::Approved);
    expected.status = TransactionStatus::Executed;
    expected.executed_at = Some(h.clock.now());
    expected.execution_reference = Some("MOCK-1".to_string());

    let executed = h
        .audit
        .events_for(&tx.id)
        .unwrap()
        .into_iter()
        .find(|e| e.action == AuditAction::TransactionExecuted)
        .unwrap();
    assert_eq!(executed.severity, Severity::Critical);
    assert_eq!(executed.data_hash, data_hash(&expected));
}

#[test]
fn test_unknown_or_inactive_signer_is_unauthorized() {
    let h = harness();
    let tx = h
        .engine
        .propose(&account(), &p("A"), "vendor-1", dec!(2000), "")
        .unwrap();

    let err = h.engine.approve(&tx.id, &p("mallory")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    h.policies.set_signer_status(&account(), &p("B"), false).unwrap();
    let err = h.engine.approve(&tx.id, &p("B")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let err = h
        .engine
        .propose(&account(), &p("mallory"), "vendor-1", dec!(2000), "")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[test]
fn test_propose_guards() {
    let h = harness();

    // At the threshold: no multi-party approval needed
    let err = h
        .engine
        .propose(&account(), &p("A"), "vendor-1", dec!(1000), "")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BelowThreshold);

    // Unknown account
    let err = h
        .engine
        .propose(&AccountId::new("ACC-404"), &p("A"), "vendor-1", dec!(5000), "")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyInactive);

    // Deactivated policy
    let mut config = policy_config();
    config.active = false;
    h.policies.set_transaction_policy(&account(), config, None).unwrap();
    let err = h
        .engine
        .propose(&account(), &p("A"), "vendor-1", dec!(5000), "")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyInactive);
}

#[test]
fn test_identical_proposals_get_distinct_ids() {
    let h = harness();
    let first = h
        .engine
        .propose(&account(), &p("A"), "vendor-1", dec!(2000), "")
        .unwrap();
    let second = h
        .engine
        .propose(&account(), &p("A"), "vendor-1", dec!(2000), "")
        .unwrap();
    assert_ne!(first.id, second.id);
}

#[test]
fn test_reject_requires_veto_role() {
    let h = harness();
    let tx = h
        .engine
        .propose(&account(), &p("A"), "vendor-1", dec!(2000), "")
        .unwrap();
    h.engine.approve(&tx.id, &p("A")).unwrap();
    h.engine.approve(&tx.id, &p("B")).unwrap();

    // Operators cannot veto
    let err = h.engine.reject(&tx.id, &p("C"), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    // A supervisor can, even after approval
    let tx = h
        .engine
        .reject(&tx.id, &p("S"), Some("duplicate invoice"))
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Rejected);
    assert_eq!(tx.rejected_by, Some(p("S")));
    assert_eq!(tx.rejection_reason.as_deref(), Some("duplicate invoice"));

    // Rejected is terminal
    h.clock.advance(Duration::hours(2));
    let err = h.engine.execute(&tx.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotApproved);
    let err = h.engine.approve(&tx.id, &p("C")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(h.backend.action_count(), 0);
}

#[test]
fn test_reject_after_execution() {
    let h = harness();
    let tx = h
        .engine
        .propose(&account(), &p("A"), "vendor-1", dec!(2000), "")
        .unwrap();
    h.engine.approve(&tx.id, &p("A")).unwrap();
    h.engine.approve(&tx.id, &p("C")).unwrap();
    h.clock.advance(Duration::hours(1));
    h.engine.execute(&tx.id).unwrap();

    let err = h.engine.reject(&tx.id, &p("S"), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExecuted);
}

#[test]
fn test_unknown_transaction() {
    let h = harness();
    let err = h.engine.approve("TX-missing", &p("A")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = h.engine.get("TX-missing").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_list_and_stats() {
    let h = harness();

    let executed = h
        .engine
        .propose(&account(), &p("A"), "vendor-1", dec!(2000), "")
        .unwrap();
    h.engine.approve(&executed.id, &p("A")).unwrap();
    h.engine.approve(&executed.id, &p("C")).unwrap();

    let rejected = h
        .engine
        .propose(&account(), &p("A"), "vendor-2", dec!(3000), "")
        .unwrap();
    h.engine.reject(&rejected.id, &p("S"), None).unwrap();

    h.clock.advance(Duration::hours(1));
    h.engine.execute(&executed.id).unwrap();

    let stale = h
        .engine
        .propose(&account(), &p("B"), "vendor-3", dec!(4000), "")
        .unwrap();
    h.clock.advance(Duration::hours(30));
    let fresh = h
        .engine
        .propose(&account(), &p("B"), "vendor-4", dec!(5000), "")
        .unwrap();

    let stats = h.engine.stats(&account()).unwrap();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.approved, 0);
    assert_eq!(stats.executed, 1);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.expired, 1);

    let all = h.engine.list(&account(), None).unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(all[0].id, fresh.id);

    let expired = h
        .engine
        .list(&account(), Some(TransactionStatus::Expired))
        .unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].id, stale.id);
}

#[test]
fn test_timelock_follows_current_policy() {
    let h = harness();
    let tx = h
        .engine
        .propose(&account(), &p("A"), "vendor-1", dec!(2000), "")
        .unwrap();
    h.engine.approve(&tx.id, &p("A")).unwrap();
    h.engine.approve(&tx.id, &p("B")).unwrap();

    let mut config = policy_config();
    config.timelock_duration = Duration::hours(4);
    h.policies.set_transaction_policy(&account(), config, None).unwrap();

    h.clock.advance(Duration::hours(2));
    let err = h.engine.execute(&tx.id).unwrap_err();
    assert!(matches!(
        err,
        AuthorizationError::TimelockNotElapsed { remaining_secs: 7200, .. }
    ));

    h.clock.advance(Duration::hours(2));
    h.engine.execute(&tx.id).unwrap();
}

// === Screening ===

fn screened_harness() -> (Harness, Arc<ComplianceEngine>, Arc<MemoryIdentityDirectory>) {
    let mut h = harness();
    let identities = Arc::new(MemoryIdentityDirectory::new());
    let compliance = Arc::new(
        ComplianceEngine::new(
            ComplianceConfig::default(),
            h.policies.clone(),
            ComplianceStore::in_memory().unwrap(),
            identities.clone(),
            h.audit.clone(),
            h.clock.clone(),
        )
        .unwrap(),
    );

    h.engine = AuthorizationEngine::new(
        h.policies.clone(),
        TransactionStore::in_memory().unwrap(),
        h.backend.clone(),
        h.audit.clone(),
        h.clock.clone(),
    )
    .with_screening(compliance.clone());
    (h, compliance, identities)
}

fn verify(identities: &MemoryIdentityDirectory, h: &Harness, principal: &str) {
    identities.upsert(IdentityRecord {
        principal_id: p(principal),
        verification_status: VerificationStatus::Verified,
        expires_at: h.clock.now() + Duration::days(365),
        risk_level: RiskLevel::Low,
    });
}

#[test]
fn test_screening_passes_verified_account() {
    let (h, _, identities) = screened_harness();
    assert!(h.engine.screening_enabled());
    verify(&identities, &h, "ACC-001");

    let tx = h
        .engine
        .propose(&account(), &p("A"), "vendor-1", dec!(2000), r#"{"memo":"rent"}"#)
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);

    let evaluated = actions_for(&h.audit, "ACC-001")
        .into_iter()
        .filter(|a| *a == AuditAction::RiskEvaluated)
        .count();
    assert_eq!(evaluated, 1);
}

#[test]
fn test_screening_refuses_unverified_account() {
    let (h, _, _) = screened_harness();

    let err = h
        .engine
        .propose(&account(), &p("A"), "vendor-1", dec!(2000), "")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IdentityNotVerified);
    assert!(h.engine.list(&account(), None).unwrap().is_empty());
}

#[test]
fn test_screening_refuses_sanctioned_target() {
    let (h, compliance, identities) = screened_harness();
    verify(&identities, &h, "ACC-001");
    compliance
        .upsert_sanction_list(&p("officer"), "OFAC", vec!["vendor-x".to_string()], true)
        .unwrap();

    let err = h
        .engine
        .propose(&account(), &p("A"), "vendor-x", dec!(2000), "")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SanctionedParty);
    match err {
        AuthorizationError::SanctionedParty { party, list } => {
            assert_eq!(party, "vendor-x");
            assert_eq!(list, "OFAC");
        }
        other => panic!("unexpected error: {other}"),
    }

    // Deactivated lists no longer match
    compliance
        .set_sanction_list_active(&p("officer"), "OFAC", false)
        .unwrap();
    h.engine
        .propose(&account(), &p("A"), "vendor-x", dec!(2000), "")
        .unwrap();
}
