use storyloom_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Worker is already running")]
    AlreadyRunning,

    #[error("Worker is not running")]
    NotRunning,

    #[error(transparent)]
    Core(#[from] CoreError),
}
