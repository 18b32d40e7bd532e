//! Health, metrics and API document endpoints.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::TestApp;

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_check_returns_200() {
    let app = TestApp::spawn();

    let (status, body) = app.send(get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "user-service-test");
    assert_eq!(body["checks"]["postgresql"], "up");
    assert_eq!(body["checks"]["identity_admin_client"], "configured");
}

#[tokio::test]
async fn health_check_fails_when_store_is_down() {
    let app = TestApp::spawn();
    app.profiles.set_unhealthy("connection refused");

    let (status, body) = app.send(get("/health")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "connection refused");
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = TestApp::spawn();

    let response = tower::util::ServiceExt::oneshot(app.router.clone(), get("/health"))
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn openapi_document_lists_user_routes() {
    let app = TestApp::spawn();

    let (status, body) = app.send(get("/.well-known/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/usuarios"].is_object());
    assert!(body["paths"]["/api/admin/reconcile"].is_object());
}

#[tokio::test]
async fn metrics_endpoint_is_text() {
    user_service::services::metrics::init_metrics().unwrap();
    let app = TestApp::spawn();
    app.send(get("/health")).await;

    let (status, body) = app.send(get("/metrics")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("http_requests_total"));
}

#[tokio::test]
async fn wildcard_origin_allows_any_origin() {
    let mut config = common::create_test_config();
    config.security.allowed_origins = vec!["*".to_string()];
    config.validate().unwrap();
    let app = TestApp::spawn_with_config(config);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://taller.example")
        .body(Body::empty())
        .unwrap();
    let response = tower::util::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn listed_origin_is_echoed_back() {
    let app = TestApp::spawn();

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = tower::util::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:3000"
    );
}
