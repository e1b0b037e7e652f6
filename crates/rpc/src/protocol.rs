//! JSON-RPC 2.0 message types and error mapping

use quorum_audit::AuditError;
use quorum_authorization::AuthorizationError;
use quorum_compliance::ComplianceError;
use quorum_core::ErrorKind;
use quorum_policy::PolicyError;
use quorum_recovery::RecoveryError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
/// Engine refusals (server-defined range); `data.kind` says which
pub const ENGINE_ERROR: i32 = -32000;

#[derive(Deserialize, Debug, Clone)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: ErrorObject) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Why a call failed
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("{message}")]
    Engine { kind: ErrorKind, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RpcError {
    pub fn engine(kind: ErrorKind, err: impl std::fmt::Display) -> Self {
        RpcError::Engine {
            kind,
            message: err.to_string(),
        }
    }

    pub fn to_error_object(&self) -> ErrorObject {
        let (code, data) = match self {
            RpcError::InvalidRequest(_) => (INVALID_REQUEST, None),
            RpcError::MethodNotFound(method) => (METHOD_NOT_FOUND, Some(json!({ "method": method }))),
            RpcError::InvalidParams(_) => (INVALID_PARAMS, None),
            RpcError::Engine { kind, .. } => (
                ENGINE_ERROR,
                Some(json!({ "kind": kind, "retryable": kind.is_retryable() })),
            ),
            RpcError::Internal(_) => (INTERNAL_ERROR, None),
        };
        ErrorObject {
            code,
            message: self.to_string(),
            data,
        }
    }
}

macro_rules! engine_error {
    ($($err:ty),* $(,)?) => {
        $(
            impl From<$err> for RpcError {
                fn from(e: $err) -> Self {
                    RpcError::engine(e.kind(), e)
                }
            }
        )*
    };
}

engine_error!(AuthorizationError, RecoveryError, PolicyError, ComplianceError, AuditError);

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        RpcError::Internal(e.to_string())
    }
}
