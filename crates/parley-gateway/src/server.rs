// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router assembly and server lifecycle.

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use parley_core::ParleyError;
use parley_keys::KeyService;
use parley_limiter::RateLimitStore;
use parley_providers::ProviderRouter;
use parley_storage::Database;

use crate::{chat, keys};

/// Shared state for request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub db: Database,
    pub keys: KeyService,
    pub limiter: Arc<RateLimitStore>,
    pub router: Arc<ProviderRouter>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Assemble the axum router over the shared state.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/v1/chat", post(chat::post_chat))
        .route("/v1/keys", put(keys::put_key).get(keys::list_keys))
        .route("/v1/keys/{provider}", axum::routing::delete(keys::delete_key))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until `shutdown` is cancelled.
pub async fn start_server(
    host: &str,
    port: u16,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), ParleyError> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ParleyError::Config(format!("failed to bind {addr}: {e}")))?;
    info!(addr = %addr, "gateway listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ParleyError::Internal(format!("server error: {e}")))
}
