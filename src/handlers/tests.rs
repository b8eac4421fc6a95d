//! # Tests for Handlers
//!
//! Router-level tests against an in-memory database.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    response::Json,
};
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use serde_json::Value;
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::handlers::{healthz, root};
use crate::models::ServiceInfo;
use crate::server::{AppState, create_app};

async fn test_app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let config = AppConfig {
        profile: "test".to_string(),
        ..Default::default()
    };
    create_app(AppState::new(config, db).unwrap())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_root_handler_returns_expected_service_info() {
    let Json(service_info) = root().await;

    assert_eq!(service_info.service, "statuspage");
    assert_eq!(service_info.version, env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_service_info_default() {
    let json_value = serde_json::to_value(ServiceInfo::default()).unwrap();

    assert_eq!(json_value["service"], "statuspage");
    assert!(json_value.get("version").is_some());
}

#[tokio::test]
async fn test_healthz_is_ok() {
    let Json(health) = healthz().await;
    assert_eq!(health.status, "ok");
}

#[tokio::test]
async fn test_readyz_reports_database_ready() {
    let (status, body) = get_json(test_app().await, "/readyz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_response_carries_trace_id() {
    let response = test_app()
        .await
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .header("x-trace-id", "trace-abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers().get("x-trace-id").unwrap(), "trace-abc");
}

#[tokio::test]
async fn test_error_body_embeds_request_trace_id() {
    let response = test_app()
        .await
        .oneshot(
            Request::builder()
                .uri("/api/organizations/missing/status")
                .header("x-trace-id", "trace-404")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["trace_id"], "trace-404");
}

#[tokio::test]
async fn test_list_without_organization_is_validation_error() {
    let (status, body) = get_json(test_app().await, "/api/services/list").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["details"]["organization_id"], "organization_id is required");
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let (status, body) = get_json(test_app().await, "/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    let paths = body["paths"].as_object().unwrap();
    assert!(paths.contains_key("/api/services/{id}"));
    assert!(paths.contains_key("/api/organizations/{slug}/status"));
    assert!(paths.contains_key("/webhooks/provider"));
}
