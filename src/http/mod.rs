//! Axum intake boundary — the only inbound surface of the service.
//!
//! ## URL layout
//!
//! ```text
//! GET  /api/health         — liveness probe
//! POST /api/analyze        — validate intake, orchestrate, persist
//! GET  /api/reports/{id}   — stored report read-back
//! ```
//!
//! The server drives until the [`CancellationToken`] fires, then drains via
//! axum's graceful shutdown.

mod api;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::analysis::Orchestrator;
use crate::error::AppError;
use crate::store::ReportStore;

/// Router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone — both fields are internally reference-counted.
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Orchestrator,
    pub store: ReportStore,
}

/// Build the service router. Split out from [`serve`] so tests can drive
/// handlers through `tower::ServiceExt` without a listener.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/analyze", post(api::analyze))
        .route("/api/reports/{id}", get(api::report))
        .with_state(state)
}

/// Bind and serve until `shutdown` is cancelled.
pub async fn serve(
    bind_addr: &str,
    state: ApiState,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let router = build_router(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::Http(format!("bind failed on {bind_addr}: {e}")))?;

    info!(%bind_addr, "intake API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Http(format!("server error: {e}")))?;

    info!("intake API shut down");
    Ok(())
}
