//! Embedding worker lifecycle and poll loop.
//!
//! One long-lived Tokio task polls the queue. Each claimed job runs on its
//! own task so a slow embedding call never blocks claiming; the set of
//! in-flight job ids bounds concurrency.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use serde::Serialize;
use storyloom_core::embedding_job::{
    EmbeddingJob, JobStats, EVENT_JOB_COMPLETED, EVENT_JOB_FAILED, EVENT_JOB_STARTED,
};
use storyloom_core::ports::{EmbeddingGenerator, JobQueue};
use storyloom_core::types::{DbId, Timestamp};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::error::WorkerError;

tokio::task_local! {
    static CURRENT_JOB: DbId;
}

/// The job whose task is currently executing, if any.
///
/// A process panic hook uses this to tell a panicking job (caught and
/// recorded by the worker) from a fatal panic.
pub fn current_job() -> Option<DbId> {
    CURRENT_JOB.try_with(|id| *id).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Snapshot for status endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStatus {
    pub state: WorkerState,
    pub is_running: bool,
    pub started_at: Option<Timestamp>,
    pub active_jobs: usize,
}

struct Lifecycle {
    state: WorkerState,
    started_at: Option<Timestamp>,
    cancel: Option<CancellationToken>,
    poll_loop: Option<JoinHandle<()>>,
}

/// State shared between the poll loop and job tasks.
struct Shared {
    queue: Arc<dyn JobQueue>,
    generator: Arc<dyn EmbeddingGenerator>,
    config: WorkerConfig,
    active: Mutex<HashSet<DbId>>,
}

impl Shared {
    fn active(&self) -> MutexGuard<'_, HashSet<DbId>> {
        // The set stays consistent even if a holder panicked.
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub struct EmbeddingWorker {
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
}

impl EmbeddingWorker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        generator: Arc<dyn EmbeddingGenerator>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue,
                generator,
                config,
                active: Mutex::new(HashSet::new()),
            }),
            lifecycle: Mutex::new(Lifecycle {
                state: WorkerState::Stopped,
                started_at: None,
                cancel: None,
                poll_loop: None,
            }),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start polling. Fails with `AlreadyRunning` unless stopped.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<(), WorkerError> {
        let mut lifecycle = self.lifecycle();
        if lifecycle.state != WorkerState::Stopped {
            return Err(WorkerError::AlreadyRunning);
        }
        lifecycle.state = WorkerState::Starting;

        let cancel = CancellationToken::new();
        let poll_loop = tokio::spawn(run_poll_loop(Arc::clone(&self.shared), cancel.clone()));

        lifecycle.cancel = Some(cancel);
        lifecycle.poll_loop = Some(poll_loop);
        lifecycle.started_at = Some(chrono::Utc::now());
        lifecycle.state = WorkerState::Running;

        tracing::info!(
            poll_interval_ms = self.shared.config.poll_interval_ms,
            max_concurrent_jobs = self.shared.config.max_concurrent_jobs,
            "Embedding worker started",
        );
        Ok(())
    }

    /// Stop claiming jobs and, with graceful shutdown enabled, wait up to the
    /// drain timeout for in-flight jobs. Fails with `NotRunning` unless
    /// running.
    ///
    /// Returns the number of jobs still in flight when it gave up waiting.
    pub async fn stop(&self) -> Result<usize, WorkerError> {
        let (cancel, poll_loop) = {
            let mut lifecycle = self.lifecycle();
            if lifecycle.state != WorkerState::Running {
                return Err(WorkerError::NotRunning);
            }
            lifecycle.state = WorkerState::Stopping;
            (lifecycle.cancel.take(), lifecycle.poll_loop.take())
        };
        tracing::info!("Stopping embedding worker");

        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        if let Some(poll_loop) = poll_loop {
            if let Err(e) = poll_loop.await {
                tracing::error!(error = %e, "Embedding worker poll loop ended abnormally");
            }
        }

        let remaining = if self.shared.config.enable_graceful_shutdown {
            self.drain().await
        } else {
            self.shared.active().len()
        };
        if remaining > 0 {
            tracing::warn!(
                remaining,
                "Embedding worker stopped with jobs still in flight"
            );
        }

        let mut lifecycle = self.lifecycle();
        lifecycle.state = WorkerState::Stopped;
        lifecycle.started_at = None;
        tracing::info!("Embedding worker stopped");
        Ok(remaining)
    }

    /// Wait for the active set to empty or the drain timeout to pass.
    async fn drain(&self) -> usize {
        let deadline = Instant::now() + self.shared.config.drain_timeout;
        let tick = self
            .shared
            .config
            .poll_interval()
            .min(std::time::Duration::from_millis(100));
        loop {
            let remaining = self.shared.active().len();
            if remaining == 0 || Instant::now() >= deadline {
                return remaining;
            }
            tracing::debug!(remaining, "Waiting for embedding jobs to finish");
            tokio::time::sleep(tick).await;
        }
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == WorkerState::Running
    }

    pub fn started_at(&self) -> Option<Timestamp> {
        self.lifecycle().started_at
    }

    pub fn active_jobs(&self) -> usize {
        self.shared.active().len()
    }

    pub fn status(&self) -> WorkerStatus {
        let lifecycle = self.lifecycle();
        WorkerStatus {
            state: lifecycle.state,
            is_running: lifecycle.state == WorkerState::Running,
            started_at: lifecycle.started_at,
            active_jobs: self.active_jobs(),
        }
    }

    /// Queue counts per status over the stats window.
    pub async fn get_stats(&self) -> Result<JobStats, WorkerError> {
        Ok(self.shared.queue.get_stats().await?)
    }
}

async fn run_poll_loop(shared: Arc<Shared>, cancel: CancellationToken) {
    let poll_interval = shared.config.poll_interval();
    let max = shared.config.max_concurrent_jobs;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let claimed = if shared.active().len() >= max {
            None
        } else {
            match shared.queue.get_next_pending_job().await {
                Ok(job) => job,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to claim embedding job");
                    None
                }
            }
        };

        match claimed {
            Some(job) => {
                shared.active().insert(job.id);
                tokio::spawn(supervise_job(Arc::clone(&shared), job));
            }
            None => {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
        }
    }
    tracing::debug!("Embedding worker poll loop exited");
}

/// Run one job on its own task and record a panic as a failure. Always
/// releases the job's slot.
async fn supervise_job(shared: Arc<Shared>, job: EmbeddingJob) {
    let job_id = job.id;
    let attempts = job.attempts;
    let task = tokio::spawn(CURRENT_JOB.scope(job_id, process_job(Arc::clone(&shared), job)));

    if let Err(e) = task.await {
        let error = if e.is_panic() {
            "Embedding job panicked".to_string()
        } else {
            format!("Embedding job task failed: {e}")
        };
        tracing::error!(job_id, error = %error, "Embedding job aborted");
        record_failure(&shared, job_id, attempts, &error, 0).await;
    }

    shared.active().remove(&job_id);
}

async fn process_job(shared: Arc<Shared>, job: EmbeddingJob) {
    let job_id = job.id;
    log_event(
        &shared,
        job_id,
        EVENT_JOB_STARTED,
        "Embedding job started",
        serde_json::json!({
            "attempt": job.attempts,
            "trait_path": job.payload.trait_path,
        }),
    )
    .await;

    let started = Instant::now();
    let result = shared.generator.generate(&job.payload).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(embedding_id) => {
            if let Err(e) = shared.queue.mark_completed(job_id).await {
                tracing::error!(job_id, error = %e, "Failed to mark embedding job completed");
                let error = format!("Failed to record completion: {e}");
                record_failure(&shared, job_id, job.attempts, &error, elapsed_ms).await;
                return;
            }
            log_event(
                &shared,
                job_id,
                EVENT_JOB_COMPLETED,
                "Embedding job completed",
                serde_json::json!({
                    "embedding_id": embedding_id,
                    "elapsed_ms": elapsed_ms,
                }),
            )
            .await;
            tracing::info!(job_id, embedding_id, elapsed_ms, "Embedding job completed");
        }
        Err(e) => {
            record_failure(&shared, job_id, job.attempts, &e.to_string(), elapsed_ms).await;
        }
    }
}

async fn record_failure(shared: &Shared, job_id: DbId, attempts: i32, error: &str, elapsed_ms: u64) {
    let status = match shared.queue.mark_failed(job_id, error).await {
        Ok(status) => Some(status),
        Err(e) => {
            tracing::error!(job_id, error = %e, "Failed to mark embedding job failed");
            None
        }
    };
    log_event(
        shared,
        job_id,
        EVENT_JOB_FAILED,
        error,
        serde_json::json!({
            "attempt": attempts,
            "elapsed_ms": elapsed_ms,
            "status": status.map(|s| s.label()),
        }),
    )
    .await;
    tracing::warn!(
        job_id,
        attempts,
        error,
        status = status.map(|s| s.label()).unwrap_or("unknown"),
        "Embedding job failed"
    );
}

async fn log_event(
    shared: &Shared,
    job_id: DbId,
    event_type: &str,
    message: &str,
    metadata: serde_json::Value,
) {
    if let Err(e) = shared
        .queue
        .log_event(job_id, event_type, message, metadata)
        .await
    {
        tracing::warn!(job_id, event_type, error = %e, "Failed to log embedding job event");
    }
}
