//! Gateway server setup
//!
//! Routes, backend selection and the listener loop.

mod handler;
mod middleware;
mod state;

pub use handler::{gateway_handler, GatewayQuery};
pub use middleware::{apply_middleware, REQUEST_ID_HEADER};
pub use state::GatewayState;

use axum::{routing::get, Router};
use chat_common::{AppConfig, AppError, JwtService};
use chat_core::{Directory, Store};
use chat_db::{create_pool, ensure_schema, MemoryBackend, PgDirectory, PgStore, PoolConfig, Seed};
use chat_service::ServiceContext;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/gateway", get(gateway_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    apply_middleware(create_router()).with_state(state)
}

/// Pick the Directory/Store backend and create `GatewayState`
///
/// PostgreSQL when `DATABASE_URL` is configured, otherwise the in-memory
/// backend, optionally preloaded from `MEMORY_SEED_FILE`.
pub async fn create_gateway_state(config: AppConfig) -> Result<GatewayState, AppError> {
    let worker_id = config.snowflake.worker_id;

    let (directory, store): (Arc<dyn Directory>, Arc<dyn Store>) = match &config.database {
        Some(database) => {
            tracing::info!("Connecting to PostgreSQL...");
            let pool = create_pool(&PoolConfig::from(database))
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            ensure_schema(&pool)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            tracing::info!("PostgreSQL connection established");
            (
                Arc::new(PgDirectory::new(pool.clone())),
                Arc::new(PgStore::new(pool, worker_id)),
            )
        }
        None => {
            let backend = match &config.seed_file {
                Some(path) => {
                    tracing::info!(path = %path, "Loading in-memory seed");
                    MemoryBackend::from_seed(worker_id, Seed::from_file(path)?)
                }
                None => MemoryBackend::new(worker_id),
            };
            tracing::warn!("DATABASE_URL not set, using the in-memory backend");
            let backend = Arc::new(backend);
            (backend.clone(), backend)
        }
    };

    let jwt_service = Arc::new(JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expiry,
    ));

    let service_context = ServiceContext::builder()
        .directory(directory)
        .store(store)
        .jwt_service(jwt_service)
        .build()
        .map_err(|e| AppError::internal(anyhow::anyhow!("service context: {e}")))?;

    Ok(GatewayState::new(service_context, config))
}

/// Run the gateway server
pub async fn run_server(app: Router, addr: &str) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::internal(anyhow::anyhow!("failed to bind to {addr}: {e}")))?;

    tracing::info!("Gateway listening on ws://{}/gateway", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::internal(anyhow::anyhow!("server error: {e}")))?;

    Ok(())
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = config.gateway.address();
    let state = create_gateway_state(config).await?;
    let app = create_app(state);
    run_server(app, &addr).await
}
