//! HTTP gateway for BetterClaw.
//!
//! Exposes the `betterclaw.*` RPC surface the companion app talks to,
//! plus a health check. Built on Axum; intake acknowledges synchronously
//! and hands events to the pipeline's serialization lane.

pub mod rpc;

use axum::{routing::get, routing::post, Json, Router};
use betterclaw_pipeline::EventIntake;
use betterclaw_store::ContextStore;
use serde::Serialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub intake: EventIntake,
    pub store: Arc<ContextStore>,
    /// Set once startup init (context load + cooldown restore) completed.
    pub initialized: AtomicBool,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/rpc", post(rpc::rpc_handler))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn serve(
    state: SharedState,
    host: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{host}:{port}");
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", version: env!("CARGO_PKG_VERSION") })
}
