//! Embedding job state machine.
//!
//! `pending -> running -> completed | failed`. A failed attempt with
//! attempts remaining goes to `retrying` and becomes claimable again once its
//! backoff has elapsed. `completed` and `failed` are terminal.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

/// Event type logged when a worker picks up a job.
pub const EVENT_JOB_STARTED: &str = "job_started";
/// Event type logged when an embedding was stored.
pub const EVENT_JOB_COMPLETED: &str = "job_completed";
/// Event type logged when an attempt failed.
pub const EVENT_JOB_FAILED: &str = "job_failed";

pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// First retry delay; doubles per attempt.
pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(30);
pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(60 * 60);

/// Stats window for [`JobStats`].
pub const STATS_WINDOW_HOURS: i64 = 24;

/// Status ids match the seed order of the `embedding_job_statuses` table.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingJobStatus {
    Pending = 1,
    Running = 2,
    Completed = 3,
    Failed = 4,
    Retrying = 5,
}

impl EmbeddingJobStatus {
    pub const ALL: [EmbeddingJobStatus; 5] = [
        Self::Pending,
        Self::Running,
        Self::Completed,
        Self::Failed,
        Self::Retrying,
    ];

    /// Database status id.
    pub fn id(self) -> i16 {
        self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Retrying => "retrying",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether a worker may claim a job in this status (subject to its
    /// `scheduled_at`).
    pub fn is_claimable(self) -> bool {
        matches!(self, Self::Pending | Self::Retrying)
    }
}

/// What one embedding job embeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingJobPayload {
    pub adventure_character_id: DbId,
    /// Trait domain or field-type key (`appearance`, `location`).
    pub trait_type: String,
    /// Full field path (`appearance.hair.color`).
    pub trait_path: String,
    pub trait_value: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingJob {
    pub id: DbId,
    pub status: EmbeddingJobStatus,
    pub payload: EmbeddingJobPayload,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub scheduled_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

/// Job counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStats {
    pub pending: i64,
    pub running: i64,
    pub completed: i64,
    pub failed: i64,
    pub retrying: i64,
}

impl JobStats {
    pub fn add(&mut self, status: EmbeddingJobStatus, count: i64) {
        match status {
            EmbeddingJobStatus::Pending => self.pending += count,
            EmbeddingJobStatus::Running => self.running += count,
            EmbeddingJobStatus::Completed => self.completed += count,
            EmbeddingJobStatus::Failed => self.failed += count,
            EmbeddingJobStatus::Retrying => self.retrying += count,
        }
    }

    pub fn total(&self) -> i64 {
        self.pending + self.running + self.completed + self.failed + self.retrying
    }
}

/// Outcome of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureTransition {
    Retry { delay: Duration },
    GiveUp,
}

impl FailureTransition {
    pub fn status(&self) -> EmbeddingJobStatus {
        match self {
            Self::Retry { .. } => EmbeddingJobStatus::Retrying,
            Self::GiveUp => EmbeddingJobStatus::Failed,
        }
    }
}

/// Decide what a failure after `attempts` claims (this one included) does.
pub fn on_failure(attempts: i32, max_attempts: i32) -> FailureTransition {
    if attempts >= max_attempts {
        FailureTransition::GiveUp
    } else {
        FailureTransition::Retry {
            delay: retry_delay(attempts),
        }
    }
}

/// `30s * 2^(attempts-1)`, capped at one hour.
pub fn retry_delay(attempts: i32) -> Duration {
    let exponent = attempts.saturating_sub(1).clamp(0, 16) as u32;
    RETRY_BASE_DELAY
        .saturating_mul(2u32.saturating_pow(exponent))
        .min(RETRY_MAX_DELAY)
}
