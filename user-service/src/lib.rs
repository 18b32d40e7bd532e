pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    security_headers::security_headers_middleware, tracing::request_id_middleware,
};
use service_core::observability::trace_context::REQUEST_ID_HEADER;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;
use tokio::{net::TcpListener, sync::Notify};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{SwaggerMode, UserServiceConfig};
use crate::middleware::admin::ADMIN_API_KEY_HEADER;
use crate::services::{
    IdentityProvider, ProfileStore, Reconciler, ServiceError, UserDirectory, UserProvisioner,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::users::create_user,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::delete_user,
        handlers::admin::reconcile,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::users::CreateUserRequest,
            dtos::users::CreateUserResponse,
            dtos::users::UpdateUserRequest,
            dtos::users::UserResponse,
            dtos::users::UserListResponse,
            dtos::users::DeleteUserResponse,
            dtos::admin::DriftKind,
            dtos::admin::ReconcileAction,
            dtos::admin::ReconciliationEntry,
            dtos::admin::ReconciliationReport,
            models::UserProfile,
            models::Role,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Usuarios", description = "User provisioning and profile management"),
        (name = "Admin", description = "Administrative operations"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
            components.add_security_scheme(
                "admin_api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(ADMIN_API_KEY_HEADER))),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: UserServiceConfig,
    pub profiles: Arc<dyn ProfileStore>,
    /// Admin client for the identity provider. `None` when no service-role
    /// key is configured.
    pub identity: Option<Arc<dyn IdentityProvider>>,
    pub directory: UserDirectory,
}

impl AppState {
    pub fn new(
        config: UserServiceConfig,
        profiles: Arc<dyn ProfileStore>,
        identity: Option<Arc<dyn IdentityProvider>>,
    ) -> Self {
        let directory = UserDirectory::new(profiles.clone());
        Self {
            config,
            profiles,
            identity,
            directory,
        }
    }

    fn admin_client(&self) -> Result<Arc<dyn IdentityProvider>, ServiceError> {
        self.identity.clone().ok_or_else(|| {
            tracing::error!("Identity provider admin client is not configured");
            ServiceError::NotConfigured(
                "cliente administrativo no disponible (IDENTITY_SERVICE_ROLE_KEY)".to_string(),
            )
        })
    }

    pub fn provisioner(&self) -> Result<UserProvisioner, ServiceError> {
        Ok(UserProvisioner::new(self.admin_client()?, self.profiles.clone()))
    }

    pub fn reconciler(&self) -> Result<Reconciler, ServiceError> {
        Ok(Reconciler::new(self.admin_client()?, self.profiles.clone()))
    }
}

pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/api/admin/reconcile", post(handlers::admin::reconcile))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::admin_auth_middleware,
        ));

    let user_routes = Router::new()
        .route(
            "/api/usuarios",
            post(handlers::users::create_user).get(handlers::users::list_users),
        )
        .route(
            "/api/usuarios/:id",
            get(handlers::users::get_user)
                .patch(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .layer(from_fn(middleware::require_bearer));

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics));

    app = match state.config.swagger {
        SwaggerMode::Public => {
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()))
        }
        SwaggerMode::Disabled => app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        ),
    };

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins(&state.config.security.allowed_origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(ADMIN_API_KEY_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ]);

    app.merge(user_routes)
        .merge(admin_routes)
        .with_state(state)
        .layer(from_fn(middleware::metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}

/// Serves `app` until `signal` resolves, then lets in-flight requests drain
/// for at most `grace` before dropping the remaining connections.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    signal: F,
    grace: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let draining = Arc::new(Notify::new());
    let notify = draining.clone();

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            notify.notify_one();
        })
        .into_future();

    let deadline = async {
        draining.notified().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => result,
        _ = deadline => {
            tracing::warn!(
                grace_seconds = grace.as_secs(),
                "Shutdown grace period elapsed, dropping open connections"
            );
            Ok(())
        }
    }
}

/// `*` anywhere in the list allows any origin; tower-http refuses it inside
/// an explicit list.
fn allowed_origins(origins: &[String]) -> AllowOrigin {
    if origins.iter().any(|o| o == "*") {
        return AllowOrigin::any();
    }

    AllowOrigin::list(origins.iter().filter_map(|o| match o.parse::<HeaderValue>() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!("Ignoring invalid CORS origin '{}': {}", o, e);
            None
        }
    }))
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "Profile store unreachable", body = dtos::ErrorResponse)
    ),
    tag = "Observability"
)]
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.profiles.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Profile store health check failed");
        AppError::DatabaseError(anyhow::Error::new(e))
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "postgresql": "up",
            "identity_admin_client": if state.identity.is_some() { "configured" } else { "missing" }
        }
    })))
}
