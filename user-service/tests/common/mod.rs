//! Shared setup for user-service integration tests.
//!
//! The router runs against in-memory doubles for the identity provider and
//! the profile store, so these tests need no external services.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use secrecy::Secret;
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;
use user_service::{
    build_router,
    config::{
        DatabaseConfig, Environment, IdentityConfig, SecurityConfig, SwaggerMode,
        UserServiceConfig,
    },
    services::{IdentityProvider, MockIdentityProvider, MockProfileStore},
    AppState,
};

pub const TEST_ADMIN_API_KEY: &str = "test-admin-key-12345";
pub const TEST_BEARER: &str = "Bearer test-session-token";

pub fn create_test_config() -> UserServiceConfig {
    UserServiceConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "user-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: Secret::new("postgres://localhost/usuarios_test".to_string()),
            max_connections: 5,
            min_connections: 1,
            run_migrations: false,
        },
        identity: IdentityConfig {
            url: "http://localhost:54321".to_string(),
            service_role_key: Some(Secret::new("test-service-role-key".to_string())),
            page_size: 50,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            admin_api_key: Secret::new(TEST_ADMIN_API_KEY.to_string()),
        },
        swagger: SwaggerMode::Public,
    }
}

pub struct TestApp {
    pub router: Router,
    pub identity: Arc<MockIdentityProvider>,
    pub profiles: Arc<MockProfileStore>,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::spawn_with_config(create_test_config())
    }

    pub fn spawn_with_config(config: UserServiceConfig) -> Self {
        let identity = Arc::new(MockIdentityProvider::new());
        let profiles = Arc::new(MockProfileStore::new());
        let state = AppState::new(
            config,
            profiles.clone(),
            Some(identity.clone() as Arc<dyn IdentityProvider>),
        );

        Self {
            router: build_router(state),
            identity,
            profiles,
        }
    }

    /// App started without the identity provider service-role key.
    pub fn spawn_without_admin_client() -> Self {
        let identity = Arc::new(MockIdentityProvider::new());
        let profiles = Arc::new(MockProfileStore::new());
        let mut config = create_test_config();
        config.identity.service_role_key = None;
        let state = AppState::new(config, profiles.clone(), None);

        Self {
            router: build_router(state),
            identity,
            profiles,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::String(
                String::from_utf8_lossy(&body).into_owned(),
            ))
        };
        (status, json)
    }

    /// Authenticated JSON request to the user routes.
    pub async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", TEST_BEARER);
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn create_user(&self, body: Value) -> (StatusCode, Value) {
        self.call("POST", "/api/usuarios", Some(body)).await
    }
}

pub fn valid_user(email: &str) -> Value {
    serde_json::json!({
        "email": email,
        "password": "secreto123",
        "nombre": "Ana Pérez",
        "rol": "tecnico",
        "sede": "Centro"
    })
}
