use std::sync::Arc;

use storyloom_db::adapters::PgJobQueue;
use storyloom_worker::{
    current_job, EmbeddingServiceConfig, EmbeddingWorker, HttpEmbeddingGenerator, WorkerConfig,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = WorkerConfig::from_env();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("storyloom_worker={}", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Fatal panics ---
    // Panics inside a job are recorded on the job; any other panic stops the
    // worker gracefully before the process exits.
    let fatal = CancellationToken::new();
    let fatal_trigger = fatal.clone();
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if current_job().is_none() {
            tracing::error!(panic = %info, "Fatal panic, stopping embedding worker");
            fatal_trigger.cancel();
        }
        default_hook(info);
    }));

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = storyloom_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    storyloom_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database connection pool created");

    // --- Worker ---
    let generator = HttpEmbeddingGenerator::new(EmbeddingServiceConfig::from_env(), pool.clone())
        .expect("Failed to build embedding HTTP client");
    let worker = EmbeddingWorker::new(
        Arc::new(PgJobQueue::new(pool)),
        Arc::new(generator),
        config,
    );
    worker.start().expect("Embedding worker failed to start");

    let exit_code = tokio::select! {
        () = shutdown_signal() => 0,
        () = fatal.cancelled() => 1,
    };

    match worker.stop().await {
        Ok(0) => tracing::info!("Embedding worker drained"),
        Ok(remaining) => tracing::warn!(remaining, "Exiting with embedding jobs in flight"),
        Err(e) => tracing::error!(error = %e, "Embedding worker stop failed"),
    }

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
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
            tracing::info!("Received SIGINT (Ctrl-C), stopping embedding worker");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, stopping embedding worker");
        }
    }
}
