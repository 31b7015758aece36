use auth_api::{
    build_router,
    config::AuthConfig,
    db,
    services::{
        purge_periodically, AccountReader, AccountWriter, AuthService, Database, MemoryStore,
        TokenSettings,
    },
    AppState,
};
use service_core::error::AppError;
use service_core::observability::init_tracing;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

/// How often expired refresh token records are swept.
const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// `DATABASE_URL` value that selects the in-memory store.
const MEMORY_DATABASE_URL: &str = "memory://";

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Fail fast on missing or inconsistent configuration
    let config = AuthConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level, config.log_format());

    tracing::info!(
        service = %config.service_name,
        environment = ?config.environment,
        "Starting auth service"
    );

    let (writer, reader, database) = if config.database.url == MEMORY_DATABASE_URL {
        tracing::warn!("Using the in-memory store; accounts are lost on restart");
        let store = Arc::new(MemoryStore::new());

        let sweep_store = store.clone();
        tokio::spawn(purge_periodically(PURGE_INTERVAL, move || {
            let store = sweep_store.clone();
            async move { store.purge_expired_refresh_tokens() }
        }));

        (
            store.clone() as Arc<dyn AccountWriter>,
            store as Arc<dyn AccountReader>,
            None,
        )
    } else {
        let pool = db::create_pool(&config.database)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        db::run_migrations(&pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        let database = Database::new(pool);
        let sweep_db = database.clone();
        tokio::spawn(purge_periodically(PURGE_INTERVAL, move || {
            let db = sweep_db.clone();
            async move { db.purge_expired_refresh_tokens().await }
        }));

        let store = Arc::new(database.clone());
        (
            store.clone() as Arc<dyn AccountWriter>,
            store as Arc<dyn AccountReader>,
            Some(database),
        )
    };

    let settings = TokenSettings::from_config(&config.jwt).map_err(AppError::ConfigError)?;

    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        environment = ?config.environment,
    );
    let auth_service = AuthService::new(service_span, writer, reader, settings);

    let state = AppState {
        auth_service,
        database,
        request_timeout: config.request_timeout(),
    };
    let app = build_router(state);

    let addr = config.common.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
    tracing::info!(address = %addr, "Listening");

    service_core::axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
