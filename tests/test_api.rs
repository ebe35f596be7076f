//! Intake boundary contract: validation rejects, the success envelope, the
//! uniform failure envelope, and report read-back. Handlers are driven
//! through the router with `tower::ServiceExt::oneshot` — no listener.

use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use consilium::analysis::Orchestrator;
use consilium::http::{ApiState, build_router};
use consilium::llm::LlmProvider;
use consilium::llm::providers::scripted::ScriptedProvider;
use consilium::store::ReportStore;

fn healthy_provider() -> LlmProvider {
    LlmProvider::Scripted(
        ScriptedProvider::new()
            .reply("cardiologist", "cardio analysis")
            .reply("pulmonologist", "pulmo analysis")
            .reply("psychologist", "psych analysis")
            .reply("diagnostician", "final diagnosis text")
            .build(),
    )
}

fn state_with(provider: LlmProvider, dir: &tempfile::TempDir) -> ApiState {
    ApiState {
        orchestrator: Orchestrator::new(provider, Duration::from_secs(30)),
        store: ReportStore::open(&dir.path().join("reports.db")).unwrap(),
    }
}

fn valid_body() -> Value {
    json!({
        "patient_name": "John Carter",
        "age": 45,
        "gender": "male",
        "symptoms": ["chest pain", "shortness of breath"],
        "vital_signs": {
            "blood_pressure_systolic": 120,
            "blood_pressure_diastolic": 80,
            "heart_rate": 75,
            "temperature": 98.6
        }
    })
}

fn post_analyze(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn analyze_success_envelope_and_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(healthy_provider(), &dir);
    let router = build_router(state.clone());

    let response = router.clone().oneshot(post_analyze(&valid_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    let report_id = body["report_id"].as_str().expect("report_id string");
    assert!(!report_id.is_empty());

    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/api/reports/{report_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = json_body(response).await;
    assert_eq!(stored["id"], report_id);
    assert_eq!(stored["cardiologist_analysis"], "cardio analysis");
    assert_eq!(stored["pulmonologist_analysis"], "pulmo analysis");
    assert_eq!(stored["psychologist_analysis"], "psych analysis");
    assert_eq!(stored["final_diagnosis"], "final diagnosis text");
    assert!(stored["created_at"].is_string());
}

#[tokio::test]
async fn invalid_record_is_rejected_before_orchestration() {
    let dir = tempfile::tempdir().unwrap();
    // Provider with no rules: any inference call would fail loudly, proving
    // validation rejects short of the orchestrator.
    let state = state_with(LlmProvider::Scripted(ScriptedProvider::new().build()), &dir);
    let router = build_router(state.clone());

    // Numbers no tight integer type could hold must still come back as
    // field-level issues in the validation envelope, not as a serde reject.
    let mut body = valid_body();
    body["age"] = json!(300);
    body["symptoms"] = json!(["levitation"]);
    body["vital_signs"]["heart_rate"] = json!(-20);

    let response = router.oneshot(post_analyze(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let err = json_body(response).await;
    assert_eq!(err["error"], "Validation failed");
    let details = err["details"].as_array().unwrap();
    assert!(details.len() >= 3);
    assert!(details.iter().any(|d| d.as_str().unwrap().contains("age must be 0-120")));
    assert!(details.iter().any(|d| d.as_str().unwrap().contains("heart rate")));
    assert_eq!(state.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn synthesis_failure_returns_uniform_envelope_and_persists_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let provider = LlmProvider::Scripted(
        ScriptedProvider::new()
            .reply("cardiologist", "a")
            .reply("pulmonologist", "b")
            .reply("psychologist", "c")
            .fail("diagnostician", "HTTP 429: rate limited")
            .build(),
    );
    let state = state_with(provider, &dir);
    let router = build_router(state.clone());

    let response = router.oneshot(post_analyze(&valid_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let err = json_body(response).await;
    assert_eq!(err["error"], "Analysis failed");
    assert!(err["details"].as_str().unwrap().contains("429"));
    assert_eq!(state.store.count().await.unwrap(), 0, "no partial report may persist");
}

#[tokio::test]
async fn degraded_specialist_still_persists_a_full_report() {
    let dir = tempfile::tempdir().unwrap();
    let provider = LlmProvider::Scripted(
        ScriptedProvider::new()
            .reply("cardiologist", "cardio analysis")
            .reply("pulmonologist", "pulmo analysis")
            .fail("psychologist", "connection reset")
            .reply("diagnostician", "diagnosis despite gap")
            .build(),
    );
    let state = state_with(provider, &dir);
    let router = build_router(state.clone());

    let response = router.clone().oneshot(post_analyze(&valid_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report_id = json_body(response).await["report_id"].as_str().unwrap().to_string();

    let stored = state.store.fetch(&report_id).await.unwrap().unwrap();
    assert_eq!(stored.report.analysis("psychologist_analysis"), Some(""));
    assert_eq!(stored.report.final_diagnosis, "diagnosis despite gap");
}

#[tokio::test]
async fn caller_supplied_patient_id_is_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(healthy_provider(), &dir);
    let router = build_router(state.clone());

    let mut body = valid_body();
    body["patient_id"] = json!("patient-abc");

    let response = router.oneshot(post_analyze(&body)).await.unwrap();
    let report_id = json_body(response).await["report_id"].as_str().unwrap().to_string();

    let stored = state.store.fetch(&report_id).await.unwrap().unwrap();
    assert_eq!(stored.report.patient_id, "patient-abc");
}

#[tokio::test]
async fn unknown_report_id_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(state_with(healthy_provider(), &dir));

    let response = router
        .oneshot(Request::builder().uri("/api/reports/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_service_and_count() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(healthy_provider(), &dir);
    let router = build_router(state.clone());

    let response = router
        .clone()
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "consilium");
    assert_eq!(body["reports"], 0);
}
