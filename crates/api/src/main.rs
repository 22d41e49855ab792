use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use storyloom_api::config::ServerConfig;
use storyloom_api::router::build_app_router;
use storyloom_api::state::AppState;
use storyloom_db::adapters::PgJobQueue;
use storyloom_worker::{EmbeddingServiceConfig, EmbeddingWorker, HttpEmbeddingGenerator, WorkerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "storyloom_api=debug,storyloom_pipeline=debug,storyloom_worker=info,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = storyloom_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    storyloom_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    storyloom_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Embedding worker ---
    let generator = HttpEmbeddingGenerator::new(EmbeddingServiceConfig::from_env(), pool.clone())
        .expect("Failed to build embedding HTTP client");
    let worker = Arc::new(EmbeddingWorker::new(
        Arc::new(PgJobQueue::new(pool.clone())),
        Arc::new(generator),
        WorkerConfig::from_env(),
    ));
    if config.worker_autostart {
        worker.start().expect("Embedding worker failed to start");
    }

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let app = build_app_router(AppState::new(pool, config, Arc::clone(&worker)));

    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    if worker.is_running() {
        match tokio::time::timeout(shutdown_timeout, worker.stop()).await {
            Ok(Ok(remaining)) => tracing::info!(remaining, "Embedding worker stopped"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Embedding worker stop failed"),
            Err(_) => tracing::warn!("Embedding worker did not stop within the shutdown timeout"),
        }
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
