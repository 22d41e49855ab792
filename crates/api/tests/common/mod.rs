#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use storyloom_api::auth::jwt::{generate_access_token, JwtConfig};
use storyloom_api::auth::{ROLE_ADMIN, ROLE_USER};
use storyloom_api::config::ServerConfig;
use storyloom_api::router::build_app_router;
use storyloom_api::state::AppState;
use storyloom_core::embedding_job::EmbeddingJobPayload;
use storyloom_core::error::CoreError;
use storyloom_core::ports::EmbeddingGenerator;
use storyloom_core::types::DbId;
use storyloom_db::adapters::PgJobQueue;
use storyloom_db::models::adventure::CreateAdventure;
use storyloom_db::models::character::CreateCharacter;
use storyloom_db::repositories::{AdventureRepo, CharacterRepo};
use storyloom_worker::{EmbeddingWorker, WorkerConfig};
use tower::ServiceExt;

pub const PLAYER: DbId = 1;
pub const OTHER_PLAYER: DbId = 2;
pub const ADMIN: DbId = 99;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        worker_autostart: false,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Embeds nothing; the HTTP tests never reach a real embedding service.
struct NoopGenerator;

#[async_trait]
impl EmbeddingGenerator for NoopGenerator {
    async fn generate(&self, _payload: &EmbeddingJobPayload) -> Result<DbId, CoreError> {
        Ok(0)
    }
}

/// Build the full application router, with its middleware stack, on `pool`.
pub fn build_test_app(pool: PgPool) -> Router {
    let worker = Arc::new(EmbeddingWorker::new(
        Arc::new(PgJobQueue::new(pool.clone())),
        Arc::new(NoopGenerator),
        WorkerConfig {
            poll_interval_ms: 20,
            ..WorkerConfig::default()
        },
    ));
    build_app_router(AppState::new(pool, test_config(), worker))
}

pub fn token_for(user_id: DbId, role: &str) -> String {
    generate_access_token(user_id, role, &test_config().jwt).expect("token generation")
}

pub fn player_token() -> String {
    token_for(PLAYER, ROLE_USER)
}

pub fn admin_token() -> String {
    token_for(ADMIN, ROLE_ADMIN)
}

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// A character and an adventure owned by [`PLAYER`]. Returns the adventure id.
pub async fn seed_adventure(pool: &PgPool, adventure_type: Option<&str>) -> DbId {
    let character = CharacterRepo::create(
        pool,
        &CreateCharacter {
            user_id: PLAYER,
            name: "Mira".into(),
            appearance: Some("She has long silver hair and bright green eyes.".into()),
            personality: Some("wry, patient".into()),
            scents: None,
        },
    )
    .await
    .unwrap();
    AdventureRepo::create(
        pool,
        &CreateAdventure {
            user_id: PLAYER,
            character_id: character.id,
            title: "The Lantern Road".into(),
            adventure_type: adventure_type.map(str::to_string),
            character_name: "Mira".into(),
            player_name: Some("Sam".into()),
            setting: None,
            location: None,
        },
    )
    .await
    .unwrap()
    .id
}
