//! PostgreSQL implementations of the `storyloom_core::ports` traits.

use async_trait::async_trait;
use storyloom_core::embedding_job::{
    EmbeddingJob, EmbeddingJobPayload, EmbeddingJobStatus, JobStats, STATS_WINDOW_HOURS,
};
use storyloom_core::error::CoreError;
use storyloom_core::merge::{CharacterState, CharacterTemplate};
use storyloom_core::ports::{
    AdventureRecord, AdventureStore, JobQueue, ProtectionRuleSource, StoredState,
};
use storyloom_core::protection::ProtectionRule;
use storyloom_core::types::DbId;

use crate::repositories::{AdventureRepo, CharacterRepo, EmbeddingJobRepo, ProtectionRuleRepo};
use crate::DbPool;

/// Map a database error into the domain error type.
fn db_error(err: sqlx::Error) -> CoreError {
    tracing::error!(error = %err, "Database error");
    CoreError::Internal(format!("Database error: {err}"))
}

fn json_error(err: serde_json::Error) -> CoreError {
    CoreError::Internal(format!("Malformed character state: {err}"))
}

#[derive(Clone)]
pub struct PgAdventureStore {
    pool: DbPool,
}

impl PgAdventureStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdventureStore for PgAdventureStore {
    async fn get_adventure(
        &self,
        adventure_id: DbId,
        user_id: DbId,
    ) -> Result<Option<AdventureRecord>, CoreError> {
        let row = AdventureRepo::find_for_user(&self.pool, adventure_id, user_id)
            .await
            .map_err(db_error)?;
        Ok(row.map(AdventureRecord::from))
    }

    async fn get_state(
        &self,
        adventure_id: DbId,
        user_id: DbId,
    ) -> Result<Option<StoredState>, CoreError> {
        let Some(row) = AdventureRepo::find_state(&self.pool, adventure_id, user_id)
            .await
            .map_err(db_error)?
        else {
            return Ok(None);
        };
        let state: CharacterState = serde_json::from_value(row.state).map_err(json_error)?;
        Ok(Some(StoredState {
            id: row.id,
            adventure_id: row.adventure_id,
            state,
        }))
    }

    async fn update_state(
        &self,
        adventure_id: DbId,
        state: &CharacterState,
        user_id: DbId,
    ) -> Result<DbId, CoreError> {
        let value = serde_json::to_value(state).map_err(json_error)?;
        AdventureRepo::upsert_state(&self.pool, adventure_id, &value, user_id)
            .await
            .map_err(db_error)?
            .ok_or(CoreError::NotFound {
                entity: "adventure",
                id: adventure_id,
            })
    }

    async fn get_character(
        &self,
        character_id: DbId,
        user_id: DbId,
    ) -> Result<Option<CharacterTemplate>, CoreError> {
        let row = CharacterRepo::find_for_user(&self.pool, character_id, user_id)
            .await
            .map_err(db_error)?;
        Ok(row.map(CharacterTemplate::from))
    }
}

#[derive(Clone)]
pub struct PgJobQueue {
    pool: DbPool,
}

impl PgJobQueue {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn create_embedding_job(&self, payload: &EmbeddingJobPayload) -> Result<DbId, CoreError> {
        EmbeddingJobRepo::create(&self.pool, payload)
            .await
            .map_err(db_error)
    }

    async fn get_next_pending_job(&self) -> Result<Option<EmbeddingJob>, CoreError> {
        EmbeddingJobRepo::claim_next(&self.pool)
            .await
            .map_err(db_error)?
            .map(EmbeddingJob::try_from)
            .transpose()
    }

    async fn peek_next_job(&self) -> Result<Option<EmbeddingJob>, CoreError> {
        EmbeddingJobRepo::peek_next(&self.pool)
            .await
            .map_err(db_error)?
            .map(EmbeddingJob::try_from)
            .transpose()
    }

    async fn mark_completed(&self, job_id: DbId) -> Result<(), CoreError> {
        EmbeddingJobRepo::mark_completed(&self.pool, job_id)
            .await
            .map_err(db_error)
    }

    async fn mark_failed(&self, job_id: DbId, error: &str) -> Result<EmbeddingJobStatus, CoreError> {
        EmbeddingJobRepo::mark_failed(&self.pool, job_id, error)
            .await
            .map_err(db_error)?
            .ok_or(CoreError::NotFound {
                entity: "embedding_job",
                id: job_id,
            })
    }

    async fn log_event(
        &self,
        job_id: DbId,
        event_type: &str,
        message: &str,
        metadata: serde_json::Value,
    ) -> Result<(), CoreError> {
        EmbeddingJobRepo::log_event(&self.pool, job_id, event_type, message, &metadata)
            .await
            .map_err(db_error)
    }

    async fn get_stats(&self) -> Result<JobStats, CoreError> {
        let counts = EmbeddingJobRepo::count_by_status(&self.pool, STATS_WINDOW_HOURS)
            .await
            .map_err(db_error)?;
        let mut stats = JobStats::default();
        for row in counts {
            if let Some(status) = EmbeddingJobStatus::from_id(row.status_id) {
                stats.add(status, row.count);
            }
        }
        Ok(stats)
    }

    async fn cleanup_old_jobs(&self, older_than_days: i32) -> Result<u64, CoreError> {
        let deleted = EmbeddingJobRepo::cleanup(&self.pool, older_than_days)
            .await
            .map_err(db_error)?;
        tracing::info!(deleted, older_than_days, "Cleaned up old embedding jobs");
        Ok(deleted)
    }
}

#[derive(Clone)]
pub struct PgProtectionRuleSource {
    pool: DbPool,
}

impl PgProtectionRuleSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProtectionRuleSource for PgProtectionRuleSource {
    async fn list_rules(&self) -> Result<Vec<ProtectionRule>, CoreError> {
        ProtectionRuleRepo::list(&self.pool)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(ProtectionRule::try_from)
            .collect()
    }
}
