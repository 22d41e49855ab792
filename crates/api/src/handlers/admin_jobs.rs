//! Handlers for `/api/admin/jobs`: embedding queue inspection and worker
//! control.
//!
//! Both endpoints require the `admin` role.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use storyloom_core::embedding_job::{EmbeddingJob, JobStats};
use storyloom_worker::WorkerStatus;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::MessageResponse;
use crate::state::AppState;

/// Age used by `cleanup-jobs` when `olderThanDays` is omitted.
pub const DEFAULT_CLEANUP_DAYS: i32 = 7;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct JobsQuery {
    pub action: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JobActionRequest {
    pub action: String,
    #[validate(range(min = 1, max = 3650))]
    pub older_than_days: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: JobStats,
    pub worker: WorkerStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextJobResponse {
    pub success: bool,
    pub next_job: Option<EmbeddingJob>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub success: bool,
    pub message: String,
    pub deleted_count: u64,
}

// ---------------------------------------------------------------------------
// GET
// ---------------------------------------------------------------------------

/// GET /api/admin/jobs?action=stats|next-job
pub async fn get_jobs(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<JobsQuery>,
) -> AppResult<Response> {
    match query.action.as_deref() {
        Some("stats") => {
            let stats = state.worker.get_stats().await?;
            Ok(Json(StatsResponse {
                success: true,
                stats,
                worker: state.worker.status(),
            })
            .into_response())
        }
        Some("next-job") => {
            let next_job = state.jobs.peek_next_job().await?;
            Ok(Json(NextJobResponse {
                success: true,
                next_job,
            })
            .into_response())
        }
        other => Err(AppError::BadRequest(format!(
            "Invalid action '{}'. Expected one of: stats, next-job",
            other.unwrap_or_default()
        ))),
    }
}

// ---------------------------------------------------------------------------
// POST
// ---------------------------------------------------------------------------

/// POST /api/admin/jobs `{ action: start-worker|stop-worker|cleanup-jobs, olderThanDays? }`
///
/// Starting a running worker or stopping a stopped one is a 400.
pub async fn post_jobs(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<JobActionRequest>,
) -> AppResult<Response> {
    input.validate()?;

    let response = match input.action.as_str() {
        "start-worker" => {
            state.worker.start()?;
            tracing::info!(user_id = admin.user_id, "Embedding worker started via admin API");
            Json(MessageResponse::new("Worker started")).into_response()
        }
        "stop-worker" => {
            let remaining = state.worker.stop().await?;
            tracing::info!(
                user_id = admin.user_id,
                remaining,
                "Embedding worker stopped via admin API"
            );
            let message = if remaining == 0 {
                "Worker stopped".to_string()
            } else {
                format!("Worker stopped with {remaining} jobs still in flight")
            };
            Json(MessageResponse::new(message)).into_response()
        }
        "cleanup-jobs" => {
            let days = input.older_than_days.unwrap_or(DEFAULT_CLEANUP_DAYS);
            let deleted_count = state.jobs.cleanup_old_jobs(days).await?;
            tracing::info!(user_id = admin.user_id, days, deleted_count, "Old embedding jobs cleaned up");
            Json(CleanupResponse {
                success: true,
                message: format!("Cleaned up {deleted_count} jobs older than {days} days"),
                deleted_count,
            })
            .into_response()
        }
        other => {
            return Err(AppError::BadRequest(format!(
                "Invalid action '{other}'. Expected one of: start-worker, stop-worker, cleanup-jobs"
            )))
        }
    };

    Ok(response)
}
