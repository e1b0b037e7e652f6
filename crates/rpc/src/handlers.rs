//! JSON-RPC method handlers
//!
//! Methods are grouped by prefix: `policy.*`, `tx.*`, `recovery.*`,
//! `compliance.*` and `audit.*`. Every handler is synchronous; transports
//! decide how to run them.

use quorum_authorization::TransactionStatus;
use quorum_core::{AccountId, PrincipalId};
use quorum_policy::{
    ApprovalKind, NewGuardian, NewSigner, RecoveryPolicyConfig, RiskThresholds,
    TransactionPolicyConfig,
};
use quorum_recovery::RecoveryStatus;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::context::AppContext;
use crate::protocol::RpcError;

// === Params ===

#[derive(Deserialize)]
struct AccountParams {
    account: AccountId,
}

#[derive(Deserialize)]
struct PrincipalParams {
    principal: PrincipalId,
}

#[derive(Deserialize)]
struct MemberParams {
    account: AccountId,
    principal: PrincipalId,
}

#[derive(Deserialize)]
struct MemberStatusParams {
    account: AccountId,
    principal: PrincipalId,
    active: bool,
}

#[derive(Deserialize)]
struct SetTransactionPolicyParams {
    account: AccountId,
    policy: TransactionPolicyConfig,
    #[serde(default)]
    signers: Option<Vec<NewSigner>>,
}

#[derive(Deserialize)]
struct AddSignerParams {
    account: AccountId,
    signer: NewSigner,
}

#[derive(Deserialize)]
struct SetRecoveryPolicyParams {
    account: AccountId,
    policy: RecoveryPolicyConfig,
    #[serde(default)]
    guardians: Option<Vec<NewGuardian>>,
}

#[derive(Deserialize)]
struct AddGuardianParams {
    account: AccountId,
    guardian: NewGuardian,
}

#[derive(Deserialize)]
struct TotalWeightParams {
    account: AccountId,
    kind: ApprovalKind,
}

#[derive(Deserialize)]
struct ProposeParams {
    account: AccountId,
    proposer: PrincipalId,
    target: String,
    value: Decimal,
    #[serde(default)]
    payload: String,
}

#[derive(Deserialize)]
struct IdParams {
    id: String,
}

#[derive(Deserialize)]
struct ApproveParams {
    id: String,
    principal: PrincipalId,
}

#[derive(Deserialize)]
struct RejectParams {
    id: String,
    actor: PrincipalId,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize)]
struct ListTransactionsParams {
    account: AccountId,
    #[serde(default)]
    status: Option<TransactionStatus>,
}

#[derive(Deserialize)]
struct OwnershipParams {
    account: AccountId,
    new_owner: PrincipalId,
    actor: PrincipalId,
}

#[derive(Deserialize)]
struct ListRecoveryParams {
    account: AccountId,
    #[serde(default)]
    status: Option<RecoveryStatus>,
}

#[derive(Deserialize)]
struct EvaluateParams {
    principal: PrincipalId,
    target: String,
    value: Decimal,
    #[serde(default)]
    payload: String,
}

#[derive(Deserialize)]
struct HistoryParams {
    principal: PrincipalId,
    #[serde(default = "default_history_limit")]
    limit: usize,
}

fn default_history_limit() -> usize {
    20
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct UpsertListParams {
    actor: PrincipalId,
    name: String,
    entries: Vec<String>,
    #[serde(default = "default_true")]
    active: bool,
}

#[derive(Deserialize)]
struct ListEntryParams {
    actor: PrincipalId,
    name: String,
    party: String,
}

#[derive(Deserialize)]
struct ListActiveParams {
    actor: PrincipalId,
    name: String,
    active: bool,
}

#[derive(Deserialize)]
struct PartyParams {
    party: String,
}

#[derive(Deserialize)]
struct AuditParams {
    #[serde(default)]
    subject: Option<String>,
}

fn parse<T: DeserializeOwned>(params: Value) -> Result<T, RpcError> {
    serde_json::from_value(params).map_err(|e| RpcError::InvalidParams(e.to_string()))
}

fn to_json<T: Serialize>(value: T) -> Result<Value, RpcError> {
    Ok(serde_json::to_value(value)?)
}

/// Route one call to its handler
pub fn dispatch(ctx: &AppContext, method: &str, params: Value) -> Result<Value, RpcError> {
    match method.split_once('.') {
        Some(("policy", name)) => policy(ctx, name, params),
        Some(("tx", name)) => transaction(ctx, name, params),
        Some(("recovery", name)) => recovery(ctx, name, params),
        Some(("compliance", name)) => compliance(ctx, name, params),
        Some(("audit", "events")) => {
            let p: AuditParams = parse(params)?;
            let events = match p.subject {
                Some(subject) => ctx.audit.events_for(&subject)?,
                None => ctx.audit.events()?,
            };
            to_json(events)
        }
        _ => Err(RpcError::MethodNotFound(method.to_string())),
    }
}

fn policy(ctx: &AppContext, name: &str, params: Value) -> Result<Value, RpcError> {
    let store = &ctx.policies;
    match name {
        "set_transaction_policy" => {
            let p: SetTransactionPolicyParams = parse(params)?;
            to_json(store.set_transaction_policy(&p.account, p.policy, p.signers)?)
        }
        "get_transaction_policy" => {
            let p: AccountParams = parse(params)?;
            to_json(store.get_transaction_policy(&p.account)?)
        }
        "add_signer" => {
            let p: AddSignerParams = parse(params)?;
            to_json(store.add_signer(&p.account, p.signer)?)
        }
        "remove_signer" => {
            let p: MemberParams = parse(params)?;
            store.remove_signer(&p.account, &p.principal)?;
            Ok(json!({ "removed": true }))
        }
        "set_signer_status" => {
            let p: MemberStatusParams = parse(params)?;
            to_json(store.set_signer_status(&p.account, &p.principal, p.active)?)
        }
        "get_signer" => {
            let p: MemberParams = parse(params)?;
            to_json(store.get_signer(&p.account, &p.principal)?)
        }
        "list_signers" => {
            let p: AccountParams = parse(params)?;
            to_json(store.list_signers(&p.account)?)
        }
        "set_recovery_policy" => {
            let p: SetRecoveryPolicyParams = parse(params)?;
            to_json(store.set_recovery_policy(&p.account, p.policy, p.guardians)?)
        }
        "get_recovery_policy" => {
            let p: AccountParams = parse(params)?;
            to_json(store.get_recovery_policy(&p.account)?)
        }
        "add_guardian" => {
            let p: AddGuardianParams = parse(params)?;
            to_json(store.add_guardian(&p.account, p.guardian)?)
        }
        "remove_guardian" => {
            let p: MemberParams = parse(params)?;
            store.remove_guardian(&p.account, &p.principal)?;
            Ok(json!({ "removed": true }))
        }
        "set_guardian_status" => {
            let p: MemberStatusParams = parse(params)?;
            to_json(store.set_guardian_status(&p.account, &p.principal, p.active)?)
        }
        "get_guardian" => {
            let p: MemberParams = parse(params)?;
            to_json(store.get_guardian(&p.account, &p.principal)?)
        }
        "list_guardians" => {
            let p: AccountParams = parse(params)?;
            to_json(store.list_guardians(&p.account)?)
        }
        "total_weight" => {
            let p: TotalWeightParams = parse(params)?;
            let weight = store.get_total_weight(&p.account, p.kind)?;
            Ok(json!({ "account": p.account, "kind": p.kind, "total_weight": weight }))
        }
        "set_risk_thresholds" => {
            let p: RiskThresholds = parse(params)?;
            to_json(store.set_risk_thresholds(p)?)
        }
        "risk_thresholds" => to_json(store.risk_thresholds()?),
        "grant_emergency_authority" => {
            let p: PrincipalParams = parse(params)?;
            let granted = store.grant_emergency_authority(&p.principal)?;
            Ok(json!({ "principal": p.principal, "changed": granted }))
        }
        "revoke_emergency_authority" => {
            let p: PrincipalParams = parse(params)?;
            let revoked = store.revoke_emergency_authority(&p.principal)?;
            Ok(json!({ "principal": p.principal, "changed": revoked }))
        }
        "is_emergency_authority" => {
            let p: PrincipalParams = parse(params)?;
            let holds = store.is_emergency_authority(&p.principal)?;
            Ok(json!({ "principal": p.principal, "emergency_authority": holds }))
        }
        _ => Err(RpcError::MethodNotFound(format!("policy.{}", name))),
    }
}

fn transaction(ctx: &AppContext, name: &str, params: Value) -> Result<Value, RpcError> {
    let engine = &ctx.authorization;
    match name {
        "propose" => {
            let p: ProposeParams = parse(params)?;
            to_json(engine.propose(&p.account, &p.proposer, &p.target, p.value, &p.payload)?)
        }
        "approve" => {
            let p: ApproveParams = parse(params)?;
            to_json(engine.approve(&p.id, &p.principal)?)
        }
        "execute" => {
            let p: IdParams = parse(params)?;
            to_json(engine.execute(&p.id)?)
        }
        "reject" => {
            let p: RejectParams = parse(params)?;
            to_json(engine.reject(&p.id, &p.actor, p.reason.as_deref())?)
        }
        "get" => {
            let p: IdParams = parse(params)?;
            to_json(engine.get(&p.id)?)
        }
        "list" => {
            let p: ListTransactionsParams = parse(params)?;
            to_json(engine.list(&p.account, p.status)?)
        }
        "stats" => {
            let p: AccountParams = parse(params)?;
            to_json(engine.stats(&p.account)?)
        }
        _ => Err(RpcError::MethodNotFound(format!("tx.{}", name))),
    }
}

fn recovery(ctx: &AppContext, name: &str, params: Value) -> Result<Value, RpcError> {
    let engine = &ctx.recovery;
    match name {
        "initiate" => {
            let p: OwnershipParams = parse(params)?;
            to_json(engine.initiate(&p.account, &p.new_owner, &p.actor)?)
        }
        "approve" => {
            let p: ApproveParams = parse(params)?;
            to_json(engine.approve(&p.id, &p.principal)?)
        }
        "execute" => {
            let p: IdParams = parse(params)?;
            to_json(engine.execute(&p.id)?)
        }
        "reject" => {
            let p: RejectParams = parse(params)?;
            to_json(engine.reject(&p.id, &p.actor, p.reason.as_deref())?)
        }
        "emergency_override" => {
            let p: OwnershipParams = parse(params)?;
            to_json(engine.emergency_override(&p.account, &p.new_owner, &p.actor)?)
        }
        "get" => {
            let p: IdParams = parse(params)?;
            to_json(engine.get(&p.id)?)
        }
        "list" => {
            let p: ListRecoveryParams = parse(params)?;
            to_json(engine.list(&p.account, p.status)?)
        }
        "last_execution" => {
            let p: AccountParams = parse(params)?;
            let at = engine.last_execution_at(&p.account)?;
            Ok(json!({ "account": p.account, "last_execution_at": at }))
        }
        _ => Err(RpcError::MethodNotFound(format!("recovery.{}", name))),
    }
}

fn compliance(ctx: &AppContext, name: &str, params: Value) -> Result<Value, RpcError> {
    let engine = &ctx.compliance;
    match name {
        "evaluate" => {
            let p: EvaluateParams = parse(params)?;
            to_json(engine.evaluate(&p.principal, &p.target, p.value, &p.payload)?)
        }
        "is_verified" => {
            let p: PrincipalParams = parse(params)?;
            let verified = engine.is_verified(&p.principal);
            Ok(json!({ "principal": p.principal, "verified": verified }))
        }
        "risk_level" => {
            let p: PrincipalParams = parse(params)?;
            let level = engine.risk_level(&p.principal);
            Ok(json!({ "principal": p.principal, "risk_level": level }))
        }
        "aml_history" => {
            let p: HistoryParams = parse(params)?;
            to_json(engine.aml_history(&p.principal, p.limit))
        }
        "upsert_sanction_list" => {
            let p: UpsertListParams = parse(params)?;
            to_json(engine.upsert_sanction_list(&p.actor, &p.name, p.entries, p.active)?)
        }
        "add_sanction_entry" => {
            let p: ListEntryParams = parse(params)?;
            let changed = engine.add_sanction_entry(&p.actor, &p.name, &p.party)?;
            Ok(json!({ "list": p.name, "party": p.party, "changed": changed }))
        }
        "remove_sanction_entry" => {
            let p: ListEntryParams = parse(params)?;
            let changed = engine.remove_sanction_entry(&p.actor, &p.name, &p.party)?;
            Ok(json!({ "list": p.name, "party": p.party, "changed": changed }))
        }
        "set_sanction_list_active" => {
            let p: ListActiveParams = parse(params)?;
            engine.set_sanction_list_active(&p.actor, &p.name, p.active)?;
            Ok(json!({ "list": p.name, "active": p.active }))
        }
        "is_sanctioned" => {
            let p: PartyParams = parse(params)?;
            let list = engine.is_sanctioned(&p.party);
            Ok(json!({ "party": p.party, "sanctioned": list.is_some(), "list": list }))
        }
        "sanction_lists" => to_json(engine.sanction_lists()),
        _ => Err(RpcError::MethodNotFound(format!("compliance.{}", name))),
    }
}
