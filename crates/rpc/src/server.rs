//! Transports: newline-delimited JSON over stdio, and HTTP `POST /rpc`

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::{get, post}, Json, Router};
use serde_json::{json, Value};

use crate::context::AppContext;
use crate::handlers::dispatch;
use crate::protocol::{ErrorObject, JsonRpcRequest, JsonRpcResponse, RpcError, PARSE_ERROR};

/// Handle one decoded request
pub fn handle_request(ctx: &AppContext, request: JsonRpcRequest) -> JsonRpcResponse {
    let id = request.id.unwrap_or(Value::Null);
    if request.jsonrpc != "2.0" {
        let err = RpcError::InvalidRequest("jsonrpc must be '2.0'".to_string());
        return JsonRpcResponse::failure(id, err.to_error_object());
    }

    let params = request.params.unwrap_or_else(|| json!({}));
    match dispatch(ctx, &request.method, params) {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(err) => {
            tracing::debug!(method = %request.method, error = %err, "RPC call failed");
            JsonRpcResponse::failure(id, err.to_error_object())
        }
    }
}

/// Handle one raw JSON message
pub fn handle_message(ctx: &AppContext, raw: &str) -> JsonRpcResponse {
    match serde_json::from_str::<JsonRpcRequest>(raw) {
        Ok(request) => handle_request(ctx, request),
        Err(e) => JsonRpcResponse::failure(
            Value::Null,
            ErrorObject {
                code: PARSE_ERROR,
                message: "Parse error".to_string(),
                data: Some(json!({ "details": e.to_string() })),
            },
        ),
    }
}

/// Serve requests line by line until the reader is exhausted
pub fn serve_stdio(ctx: &AppContext, mut reader: impl BufRead, mut writer: impl Write) -> io::Result<()> {
    let mut line = String::new();
    while reader.read_line(&mut line)? > 0 {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            let response = handle_message(ctx, trimmed);
            let text = serde_json::to_string(&response)?;
            writeln!(writer, "{}", text)?;
            writer.flush()?;
        }
        line.clear();
    }
    Ok(())
}

/// HTTP router exposing `POST /rpc` and a `GET /` info endpoint
pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/rpc", post(rpc_handler))
        .with_state(ctx)
}

/// Bind `addr` and serve the router until the process stops
pub async fn serve_http(ctx: Arc<AppContext>, addr: &str) -> io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "JSON-RPC over HTTP listening");
    axum::serve(listener, router(ctx)).await
}

async fn root_handler(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    Json(json!({
        "name": "quorum",
        "version": env!("CARGO_PKG_VERSION"),
        "transport": "http",
        "endpoints": { "rpc": "/rpc" },
        "screening": ctx.authorization.screening_enabled(),
    }))
}

// Engines block on SQLite and the account locks, so calls run off the
// async workers
async fn rpc_handler(State(ctx): State<Arc<AppContext>>, body: String) -> impl IntoResponse {
    let result = tokio::task::spawn_blocking(move || handle_message(&ctx, &body)).await;
    match result {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(e) => {
            tracing::error!(error = %e, "RPC handler panicked");
            let err = RpcError::Internal(e.to_string());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(JsonRpcResponse::failure(Value::Null, err.to_error_object())),
            )
        }
    }
}
