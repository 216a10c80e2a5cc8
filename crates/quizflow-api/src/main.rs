//! Quizflow API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use quizflow_api::config::ServerConfig;
use quizflow_api::error::AppError;
use quizflow_api::state::AppState;
use quizflow_api::telemetry::Telemetry;
use quizflow_catalog::application::catalog::QuizCatalog;
use quizflow_core::clock::SystemClock;
use quizflow_gateway::{GatewayConfig, HttpGateway};
use quizflow_orchestrator::{Collaborators, EngineConfig};
use quizflow_store::PgSessionStore;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Read configuration from environment.
    let config = ServerConfig::from_env()?;
    let telemetry = Telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting Quizflow API server");

    let catalog = QuizCatalog::load_dir(&config.quiz_dir)?;
    tracing::info!(quizzes = catalog.len(), dir = %config.quiz_dir.display(), "quiz catalog loaded");

    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    let gateway = HttpGateway::new(GatewayConfig {
        base_url: config.gateway_url.clone(),
        api_key: config.gateway_api_key.clone(),
        timeout: config.call_timeout,
    })?;

    // Build application state.
    let app_state = AppState::new(
        catalog,
        Arc::new(PgSessionStore::new(pool)),
        Arc::new(SystemClock),
        Collaborators::all(Arc::new(gateway)),
        EngineConfig {
            call_timeout: config.call_timeout,
        },
    );
    let reporter = app_state.reporter.clone();

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = quizflow_api::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server.
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("draining progress reports");
    reporter.drain().await;
    telemetry.shutdown();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
