//! Repository for the `embedding_jobs` and `embedding_job_events` tables.
//!
//! Status transitions go through `EmbeddingJobStatus` ids; retry decisions
//! come from `storyloom_core::embedding_job::on_failure`.

use sqlx::PgPool;
use storyloom_core::embedding_job::{
    on_failure, EmbeddingJobPayload, EmbeddingJobStatus, FailureTransition, DEFAULT_MAX_ATTEMPTS,
};
use storyloom_core::types::DbId;

use crate::models::embedding_job::{EmbeddingJobEvent, EmbeddingJobRow, StatusCount};
use crate::models::status::{StatusId, CLAIMABLE_STATUSES, TERMINAL_STATUSES};

/// Column list for `embedding_jobs` queries.
const COLUMNS: &str = "\
    id, status_id, adventure_character_id, trait_type, trait_path, trait_value, context, \
    attempts, max_attempts, last_error, \
    created_at, scheduled_at, started_at, completed_at, updated_at";

/// Column list for `embedding_job_events` queries.
const EVENT_COLUMNS: &str = "id, job_id, event_type, message, metadata, created_at";

/// Subquery selecting the next claimable job id. Bind `$1` to
/// `CLAIMABLE_STATUSES`.
const NEXT_CLAIMABLE: &str = "\
    SELECT id FROM embedding_jobs \
    WHERE status_id = ANY($1) AND scheduled_at <= NOW() \
    ORDER BY scheduled_at ASC, id ASC \
    LIMIT 1";

pub struct EmbeddingJobRepo;

impl EmbeddingJobRepo {
    /// Enqueue a pending job. Returns the new job id.
    pub async fn create(pool: &PgPool, payload: &EmbeddingJobPayload) -> Result<DbId, sqlx::Error> {
        let row: (DbId,) = sqlx::query_as(
            "INSERT INTO embedding_jobs \
                (status_id, adventure_character_id, trait_type, trait_path, trait_value, context, max_attempts) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id",
        )
        .bind(EmbeddingJobStatus::Pending.id())
        .bind(payload.adventure_character_id)
        .bind(&payload.trait_type)
        .bind(&payload.trait_path)
        .bind(&payload.trait_value)
        .bind(&payload.context)
        .bind(DEFAULT_MAX_ATTEMPTS)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<EmbeddingJobRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM embedding_jobs WHERE id = $1");
        sqlx::query_as::<_, EmbeddingJobRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Atomically claim the next pending or due retrying job.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent workers never claim
    /// the same job. The claim counts as an attempt.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<EmbeddingJobRow>, sqlx::Error> {
        let query = format!(
            "UPDATE embedding_jobs \
             SET status_id = $2, attempts = attempts + 1, started_at = NOW(), updated_at = NOW() \
             WHERE id = ({NEXT_CLAIMABLE} FOR UPDATE SKIP LOCKED) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EmbeddingJobRow>(&query)
            .bind(&CLAIMABLE_STATUSES[..])
            .bind(EmbeddingJobStatus::Running.id())
            .fetch_optional(pool)
            .await
    }

    /// The job `claim_next` would return, without claiming it.
    pub async fn peek_next(pool: &PgPool) -> Result<Option<EmbeddingJobRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM embedding_jobs WHERE id = ({NEXT_CLAIMABLE})");
        sqlx::query_as::<_, EmbeddingJobRow>(&query)
            .bind(&CLAIMABLE_STATUSES[..])
            .fetch_optional(pool)
            .await
    }

    pub async fn mark_completed(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE embedding_jobs \
             SET status_id = $2, completed_at = NOW(), last_error = NULL, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(EmbeddingJobStatus::Completed.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record a failed attempt.
    ///
    /// With attempts remaining the job moves to `retrying` and is rescheduled
    /// after the backoff; otherwise it is terminally `failed`. Returns the
    /// new status, or `None` if the job does not exist.
    pub async fn mark_failed(
        pool: &PgPool,
        job_id: DbId,
        error: &str,
    ) -> Result<Option<EmbeddingJobStatus>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let row: Option<(i32, i32)> = sqlx::query_as(
            "SELECT attempts, max_attempts FROM embedding_jobs WHERE id = $1 FOR UPDATE",
        )
        .bind(job_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((attempts, max_attempts)) = row else {
            return Ok(None);
        };

        let transition = on_failure(attempts, max_attempts);
        match transition {
            FailureTransition::Retry { delay } => {
                sqlx::query(
                    "UPDATE embedding_jobs \
                     SET status_id = $2, last_error = $3, \
                         scheduled_at = NOW() + make_interval(secs => $4), updated_at = NOW() \
                     WHERE id = $1",
                )
                .bind(job_id)
                .bind(EmbeddingJobStatus::Retrying.id())
                .bind(error)
                .bind(delay.as_secs_f64())
                .execute(&mut *tx)
                .await?;
            }
            FailureTransition::GiveUp => {
                sqlx::query(
                    "UPDATE embedding_jobs \
                     SET status_id = $2, last_error = $3, completed_at = NOW(), updated_at = NOW() \
                     WHERE id = $1",
                )
                .bind(job_id)
                .bind(EmbeddingJobStatus::Failed.id())
                .bind(error)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(Some(transition.status()))
    }

    pub async fn log_event(
        pool: &PgPool,
        job_id: DbId,
        event_type: &str,
        message: &str,
        metadata: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO embedding_job_events (job_id, event_type, message, metadata) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(job_id)
        .bind(event_type)
        .bind(message)
        .bind(metadata)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Events for a job, oldest first.
    pub async fn list_events(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Vec<EmbeddingJobEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM embedding_job_events WHERE job_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, EmbeddingJobEvent>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }

    /// Job counts per status for jobs created within the last `window_hours`.
    pub async fn count_by_status(
        pool: &PgPool,
        window_hours: i64,
    ) -> Result<Vec<StatusCount>, sqlx::Error> {
        sqlx::query_as::<_, StatusCount>(
            "SELECT status_id, COUNT(*) AS count FROM embedding_jobs \
             WHERE created_at >= NOW() - make_interval(hours => $1::int) \
             GROUP BY status_id",
        )
        .bind(window_hours)
        .fetch_all(pool)
        .await
    }

    /// Delete terminal jobs that finished more than `older_than_days` days
    /// ago. Their events go with them. Returns the number of jobs deleted.
    pub async fn cleanup(pool: &PgPool, older_than_days: i32) -> Result<u64, sqlx::Error> {
        let terminal: &[StatusId] = &TERMINAL_STATUSES;
        let result = sqlx::query(
            "DELETE FROM embedding_jobs \
             WHERE status_id = ANY($1) \
               AND completed_at < NOW() - make_interval(days => $2)",
        )
        .bind(terminal)
        .bind(older_than_days)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
