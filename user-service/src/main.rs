use service_core::error::AppError;
use service_core::observability::logging::init_tracing;
use std::sync::Arc;
use tokio::signal;
use user_service::{
    build_router,
    config::UserServiceConfig,
    db,
    services::{self, HttpIdentityProvider, IdentityProvider, PgProfileStore},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Fail fast on invalid configuration
    let config = UserServiceConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    )?;

    services::metrics::init_metrics().map_err(|e| {
        AppError::InternalError(anyhow::anyhow!("Failed to register metrics: {}", e))
    })?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting user service"
    );

    let pool = db::create_pool(&config.database).await?;
    if config.database.run_migrations {
        db::run_migrations(&pool).await?;
    }
    let profiles = Arc::new(PgProfileStore::new(pool));

    let identity = match &config.identity.service_role_key {
        Some(key) => {
            let client = HttpIdentityProvider::new(
                &config.identity.url,
                key.clone(),
                config.identity.page_size,
            )
            .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;
            tracing::info!(
                url = %config.identity.url,
                "Identity provider admin client initialized"
            );
            Some(Arc::new(client) as Arc<dyn IdentityProvider>)
        }
        None => None,
    };

    let state = AppState::new(config.clone(), profiles, identity);
    let app = build_router(state);

    let addr = config.common.bind_addr();
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    user_service::serve(
        listener,
        app,
        shutdown_signal(),
        config.common.shutdown_grace(),
    )
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
