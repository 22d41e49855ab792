//! PostgreSQL persistence for Storyloom.
//!
//! Repositories are zero-sized structs whose methods take a `&PgPool` and
//! return `sqlx::Error`. The [`adapters`] module wraps them behind the
//! `storyloom_core::ports` traits and maps errors into `CoreError`.

use sqlx::postgres::PgPoolOptions;

pub mod adapters;
pub mod models;
pub mod repositories;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
