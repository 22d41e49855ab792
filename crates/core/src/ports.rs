//! Collaborator interfaces the pipeline and worker are written against.
//!
//! `storyloom-db` implements these over PostgreSQL; tests use in-memory
//! implementations.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embedding_job::{EmbeddingJob, EmbeddingJobPayload, EmbeddingJobStatus, JobStats};
use crate::error::CoreError;
use crate::merge::{CharacterState, CharacterTemplate};
use crate::protection::ProtectionRule;
use crate::types::DbId;

/// An adventure as the prompt pipeline sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdventureRecord {
    pub id: DbId,
    pub user_id: DbId,
    pub title: String,
    /// Raw stored type; resolved leniently when building prompts.
    pub adventure_type: Option<String>,
    pub character_id: DbId,
    pub character_name: String,
    /// Name the user plays under.
    pub player_name: String,
    pub setting: Option<serde_json::Value>,
    pub location: Option<serde_json::Value>,
}

/// Persisted character state for one adventure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredState {
    /// Row id; embedding jobs reference it as `adventure_character_id`.
    pub id: DbId,
    pub adventure_id: DbId,
    pub state: CharacterState,
}

#[async_trait]
pub trait AdventureStore: Send + Sync {
    /// The adventure if it exists and belongs to `user_id`.
    async fn get_adventure(
        &self,
        adventure_id: DbId,
        user_id: DbId,
    ) -> Result<Option<AdventureRecord>, CoreError>;

    async fn get_state(
        &self,
        adventure_id: DbId,
        user_id: DbId,
    ) -> Result<Option<StoredState>, CoreError>;

    /// Upsert the state row. Returns its id.
    async fn update_state(
        &self,
        adventure_id: DbId,
        state: &CharacterState,
        user_id: DbId,
    ) -> Result<DbId, CoreError>;

    async fn get_character(
        &self,
        character_id: DbId,
        user_id: DbId,
    ) -> Result<Option<CharacterTemplate>, CoreError>;
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn create_embedding_job(&self, payload: &EmbeddingJobPayload) -> Result<DbId, CoreError>;

    /// Atomically claim the next claimable job, moving it to `running`.
    async fn get_next_pending_job(&self) -> Result<Option<EmbeddingJob>, CoreError>;

    /// The job `get_next_pending_job` would claim, without claiming it.
    async fn peek_next_job(&self) -> Result<Option<EmbeddingJob>, CoreError>;

    async fn mark_completed(&self, job_id: DbId) -> Result<(), CoreError>;

    /// Record a failed attempt. Returns the status the job moved to
    /// (`retrying` or `failed`).
    async fn mark_failed(&self, job_id: DbId, error: &str) -> Result<EmbeddingJobStatus, CoreError>;

    async fn log_event(
        &self,
        job_id: DbId,
        event_type: &str,
        message: &str,
        metadata: serde_json::Value,
    ) -> Result<(), CoreError>;

    /// Counts per status for jobs created in the stats window.
    async fn get_stats(&self) -> Result<JobStats, CoreError>;

    /// Delete terminal jobs that finished more than `older_than_days` ago.
    async fn cleanup_old_jobs(&self, older_than_days: i32) -> Result<u64, CoreError>;
}

#[async_trait]
pub trait EmbeddingGenerator: Send + Sync {
    /// Embed `payload.trait_value` and store it. Returns the embedding id.
    async fn generate(&self, payload: &EmbeddingJobPayload) -> Result<DbId, CoreError>;
}

#[async_trait]
pub trait ContextCache: Send + Sync {
    async fn get(&self, adventure_id: DbId) -> Result<Option<String>, CoreError>;

    /// Counter bumped by every [`invalidate`](Self::invalidate). Read it
    /// before loading the value to be cached.
    async fn generation(&self, adventure_id: DbId) -> Result<u64, CoreError>;

    /// Store `value` only if no invalidation happened since `generation` was
    /// read. Returns whether the value was stored.
    async fn set_if_generation(
        &self,
        adventure_id: DbId,
        value: String,
        ttl: Duration,
        generation: u64,
    ) -> Result<bool, CoreError>;

    async fn invalidate(&self, adventure_id: DbId) -> Result<(), CoreError>;
}

#[async_trait]
pub trait ProtectionRuleSource: Send + Sync {
    async fn list_rules(&self) -> Result<Vec<ProtectionRule>, CoreError>;
}
