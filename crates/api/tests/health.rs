mod common;

use axum::http::StatusCode;
use common::{admin_token, body_json, get, post_json};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../db/migrations")]
async fn health_reports_database_and_stopped_worker(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["dbHealthy"], true);
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));

    let worker = &json["embeddingWorker"];
    assert_eq!(worker["state"], "stopped");
    assert_eq!(worker["isRunning"], false);
    assert!(worker["startedAt"].is_null());
    assert_eq!(worker["activeJobs"], 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn health_follows_worker_lifecycle(pool: PgPool) {
    let app = common::build_test_app(pool);
    let token = admin_token();

    let response = post_json(
        app.clone(),
        "/api/admin/jobs",
        &token,
        json!({"action": "start-worker"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(get(app.clone(), "/health").await).await;
    assert_eq!(json["embeddingWorker"]["isRunning"], true);
    assert_eq!(json["embeddingWorker"]["state"], "running");
    assert!(json["embeddingWorker"]["startedAt"].is_string());

    post_json(app.clone(), "/api/admin/jobs", &token, json!({"action": "stop-worker"})).await;
    let json = body_json(get(app, "/health").await).await;
    assert_eq!(json["embeddingWorker"]["isRunning"], false);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn health_is_public_and_tagged_with_request_id(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app.clone(), "/health").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("x-request-id header");
    assert_eq!(request_id.to_str().unwrap().len(), 36);

    let response = get(app, "/api/health").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
