//! HTTP-level tests for the reconciliation job.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{TestApp, TEST_ADMIN_API_KEY};
use user_service::models::{NewUser, Role, UserProfile};
use uuid::Uuid;

fn reconcile_request(query: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/api/admin/reconcile{}", query));
    if let Some(key) = key {
        builder = builder.header("x-admin-api-key", key);
    }
    builder.body(Body::empty()).unwrap()
}

fn stale_profile(email: &str) -> UserProfile {
    UserProfile::for_account(
        Uuid::new_v4(),
        &NewUser {
            email: email.to_string(),
            password: secrecy::SecretString::new("unused".to_string()),
            nombre: "Perfil".to_string(),
            rol: Role::Admin,
            sede: None,
        },
    )
}

#[tokio::test]
async fn requires_admin_api_key() {
    let app = TestApp::spawn();

    let (status, _) = app.send(reconcile_request("", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send(reconcile_request("", Some("wrong"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_admin_key_never_authenticates() {
    let mut config = common::create_test_config();
    config.security.admin_api_key = secrecy::Secret::new(String::new());
    let app = TestApp::spawn_with_config(config);

    let (status, _) = app.send(reconcile_request("", Some(""))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send(reconcile_request("", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_header_is_rejected_with_configured_key() {
    let app = TestApp::spawn();

    let (status, _) = app.send(reconcile_request("", Some(""))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn dry_run_then_apply_then_noop() {
    let app = TestApp::spawn();
    let account = app.identity.seed("jefe@taller.com");
    let stale = stale_profile("jefe@taller.com");
    app.profiles.seed(stale.clone());

    let (status, report) = app
        .send(reconcile_request("?dry_run=true", Some(TEST_ADMIN_API_KEY)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["entries"][0]["kind"], "stale_id");
    assert_eq!(report["entries"][0]["action"], "would_reassign");
    assert!(app.profiles.get(stale.id).is_some());

    let (_, report) = app
        .send(reconcile_request("", Some(TEST_ADMIN_API_KEY)))
        .await;
    assert_eq!(report["reassigned"], 1);
    assert!(app.profiles.get(account.id).is_some());

    let (_, report) = app
        .send(reconcile_request("", Some(TEST_ADMIN_API_KEY)))
        .await;
    assert_eq!(report["reassigned"], 0);
    assert_eq!(report["in_sync"], 1);
    assert_eq!(report["entries"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn missing_admin_client_is_configuration_error() {
    let app = TestApp::spawn_without_admin_client();

    let (status, body) = app
        .send(reconcile_request("", Some(TEST_ADMIN_API_KEY)))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Configuration error"));
}
