//! The `betterclaw.*` RPC surface.
//!
//! A single POST endpoint dispatching on the `method` field:
//! - `betterclaw.ping` — liveness and init state
//! - `betterclaw.event` — validate, acknowledge `{accepted: true}`
//!   synchronously, process asynchronously
//! - `betterclaw.get_context` — the agent-facing context tool
//!
//! Errors carry machine-readable codes; the transport always answers 200
//! with either `result` or `error` in the body.

use crate::SharedState;
use axum::extract::State;
use axum::Json;
use betterclaw_core::event::DeviceEvent;
use betterclaw_core::time::epoch_now;
use betterclaw_core::view::{render_sections, Section};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use tracing::debug;

/// An inbound RPC call.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// The RPC reply envelope: exactly one of `result` or `error` is set.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    fn ok(id: Option<Value>, result: Value) -> Self {
        Self { id, result: Some(result), error: None }
    }

    fn fail(id: Option<Value>, code: RpcErrorCode, message: impl Into<String>) -> Self {
        Self { id, result: None, error: Some(RpcError { code, message: message.into() }) }
    }
}

#[derive(Debug, Serialize)]
pub struct RpcError {
    pub code: RpcErrorCode,
    pub message: String,
}

/// Machine-readable RPC error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RpcErrorCode {
    #[serde(rename = "INVALID_PARAMS")]
    InvalidParams,
    #[serde(rename = "METHOD_NOT_FOUND")]
    MethodNotFound,
    #[serde(rename = "NOT_AVAILABLE")]
    NotAvailable,
}

pub async fn rpc_handler(
    State(state): State<SharedState>,
    Json(request): Json<RpcRequest>,
) -> Json<RpcResponse> {
    debug!(method = %request.method, "RPC call");
    let RpcRequest { id, method, params } = request;

    let response = match method.as_str() {
        "betterclaw.ping" => RpcResponse::ok(
            id,
            json!({
                "ok": true,
                "version": env!("CARGO_PKG_VERSION"),
                "initialized": state.initialized.load(Ordering::Relaxed),
            }),
        ),
        "betterclaw.event" => handle_event(&state, id, params),
        "betterclaw.get_context" => handle_get_context(&state, id, params).await,
        _ => RpcResponse::fail(
            id,
            RpcErrorCode::MethodNotFound,
            format!("unknown method '{method}'"),
        ),
    };
    Json(response)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventParams {
    #[serde(default)]
    subscription_id: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    data: HashMap<String, f64>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    #[serde(default)]
    fired_at: Option<f64>,
}

fn handle_event(state: &SharedState, id: Option<Value>, params: Value) -> RpcResponse {
    let params: EventParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => {
            return RpcResponse::fail(id, RpcErrorCode::InvalidParams, e.to_string());
        }
    };

    if params.subscription_id.is_empty() {
        return RpcResponse::fail(id, RpcErrorCode::InvalidParams, "subscriptionId is required");
    }
    if params.source.is_empty() {
        return RpcResponse::fail(id, RpcErrorCode::InvalidParams, "source is required");
    }

    let event = DeviceEvent {
        subscription_id: params.subscription_id,
        source: params.source,
        data: params.data,
        metadata: params.metadata,
        fired_at: params.fired_at.unwrap_or_else(epoch_now),
    };

    // Acknowledge now; the pipeline lane processes asynchronously.
    match state.intake.try_enqueue(event) {
        Ok(()) => RpcResponse::ok(id, json!({"accepted": true})),
        Err(e) => RpcResponse::fail(id, RpcErrorCode::NotAvailable, e.to_string()),
    }
}

#[derive(Default, Deserialize)]
struct GetContextParams {
    #[serde(default)]
    include: Option<Vec<String>>,
}

async fn handle_get_context(state: &SharedState, id: Option<Value>, params: Value) -> RpcResponse {
    let params: GetContextParams = if params.is_null() {
        GetContextParams::default()
    } else {
        match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                return RpcResponse::fail(id, RpcErrorCode::InvalidParams, e.to_string());
            }
        }
    };

    let sections: Vec<Section> = match params.include {
        None => Section::ALL.to_vec(),
        Some(names) => {
            let mut sections = Vec::with_capacity(names.len());
            for name in &names {
                match Section::parse(name) {
                    Some(section) => sections.push(section),
                    None => {
                        return RpcResponse::fail(
                            id,
                            RpcErrorCode::InvalidParams,
                            format!("unknown section '{name}'"),
                        );
                    }
                }
            }
            sections
        }
    };

    let context = state.store.snapshot().await;
    let patterns = state.store.read_patterns().await;
    let text = render_sections(&context, &patterns, &sections);
    RpcResponse::ok(id, json!({"text": text}))
}
