//! Embedding job and job event rows.

use serde::Serialize;
use sqlx::FromRow;
use storyloom_core::embedding_job::{EmbeddingJob, EmbeddingJobPayload, EmbeddingJobStatus};
use storyloom_core::error::CoreError;
use storyloom_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `embedding_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EmbeddingJobRow {
    pub id: DbId,
    pub status_id: StatusId,
    pub adventure_character_id: DbId,
    pub trait_type: String,
    pub trait_path: String,
    pub trait_value: String,
    pub context: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub scheduled_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl TryFrom<EmbeddingJobRow> for EmbeddingJob {
    type Error = CoreError;

    fn try_from(row: EmbeddingJobRow) -> Result<Self, Self::Error> {
        let status = EmbeddingJobStatus::from_id(row.status_id).ok_or_else(|| {
            CoreError::Internal(format!(
                "Embedding job {} has unknown status id {}",
                row.id, row.status_id
            ))
        })?;
        Ok(Self {
            id: row.id,
            status,
            payload: EmbeddingJobPayload {
                adventure_character_id: row.adventure_character_id,
                trait_type: row.trait_type,
                trait_path: row.trait_path,
                trait_value: row.trait_value,
                context: row.context,
            },
            attempts: row.attempts,
            max_attempts: row.max_attempts,
            last_error: row.last_error,
            created_at: row.created_at,
            scheduled_at: row.scheduled_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

/// A row from the `embedding_job_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EmbeddingJobEvent {
    pub id: DbId,
    pub job_id: DbId,
    pub event_type: String,
    pub message: String,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}

/// One `GROUP BY status_id` row of the stats query.
#[derive(Debug, Clone, FromRow)]
pub struct StatusCount {
    pub status_id: StatusId,
    pub count: i64,
}
