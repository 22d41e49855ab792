//! Status ids mapping to SMALLINT lookup tables.
//!
//! The embedding job status enum itself lives in core so the worker and the
//! job state machine can use it without a database dependency.

pub use storyloom_core::embedding_job::EmbeddingJobStatus;

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

/// Statuses `cleanup_old_jobs` may delete.
pub const TERMINAL_STATUSES: [StatusId; 2] = [
    EmbeddingJobStatus::Completed as StatusId,
    EmbeddingJobStatus::Failed as StatusId,
];

/// Statuses a worker may claim once `scheduled_at` has passed.
pub const CLAIMABLE_STATUSES: [StatusId; 2] = [
    EmbeddingJobStatus::Pending as StatusId,
    EmbeddingJobStatus::Retrying as StatusId,
];
