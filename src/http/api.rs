//! Axum handlers for `/api/*` routes.
//!
//! The analyze handler's outward contract: on success
//! `{ "success": true, "report_id": … }`, on any orchestration or
//! persistence failure a 500 with `{ "error": "Analysis failed",
//! "details": … }`. Validation rejects are the one earlier exit (422),
//! before the orchestrator is ever involved.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use super::ApiState;
use crate::patient::PatientIntake;

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct AnalyzeRequest {
    /// Caller-supplied patient reference; assigned here when absent, since
    /// the record itself is identity-less.
    patient_id: Option<String>,
    #[serde(flatten)]
    intake: PatientIntake,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Uniform failure envelope for the analyze route.
fn analysis_failed(details: impl std::fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Analysis failed", "details": format!("{details}") })),
    )
        .into_response()
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /api/health
pub(super) async fn health(State(state): State<ApiState>) -> Response {
    let reports = state.store.count().await.ok();
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "reports": reports,
    }))
    .into_response()
}

/// POST /api/analyze
pub(super) async fn analyze(
    State(state): State<ApiState>,
    Json(req): Json<AnalyzeRequest>,
) -> Response {
    let record = match req.intake.into_record() {
        Ok(record) => record,
        Err(e) => {
            warn!(issues = e.issues.len(), "analyze request rejected at intake");
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": "Validation failed", "details": e.issues })),
            )
                .into_response();
        }
    };

    let patient_id = req
        .patient_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    // Run on a separate task so even a panic inside orchestration surfaces
    // as the uniform failure envelope instead of a dropped connection.
    let run = tokio::spawn(async move {
        let report = state
            .orchestrator
            .analyze(&patient_id, &record)
            .await
            .map_err(|e| e.to_string())?;
        state.store.persist(report).await.map_err(|e| e.to_string())
    });

    match run.await {
        Ok(Ok(report_id)) => {
            (StatusCode::OK, Json(json!({ "success": true, "report_id": report_id })))
                .into_response()
        }
        Ok(Err(details)) => {
            warn!(%details, "analysis request failed");
            analysis_failed(details)
        }
        Err(join_err) => {
            error!(error = %join_err, "analysis task aborted");
            analysis_failed(join_err)
        }
    }
}

/// GET /api/reports/{id}
pub(super) async fn report(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    match state.store.fetch(&id).await {
        Ok(Some(stored)) => (StatusCode::OK, Json(stored)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "not_found", "message": format!("no report with id {id}") })),
        )
            .into_response(),
        Err(e) => {
            warn!(report_id = %id, "report fetch failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "storage", "message": format!("{e}") })),
            )
                .into_response()
        }
    }
}
