//! Quorum RPC - JSON-RPC server and CLI
//!
//! This crate wires the engines together and exposes them over JSON-RPC 2.0.

pub mod config;
pub mod context;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use config::AppConfig;
pub use context::AppContext;
pub use protocol::{ErrorObject, JsonRpcRequest, JsonRpcResponse, RpcError};
