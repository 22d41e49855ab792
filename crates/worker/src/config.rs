use std::time::Duration;

/// How long `stop()` waits for in-flight jobs before giving up on them.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Embedding worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Sleep between polls when idle or saturated (default: `1000`).
    pub poll_interval_ms: u64,
    /// Upper bound on jobs processed at once (default: `3`).
    pub max_concurrent_jobs: usize,
    /// Wait for in-flight jobs on stop (default: `true`).
    pub enable_graceful_shutdown: bool,
    /// Default tracing level for the worker binary (default: `info`).
    pub log_level: String,
    /// Drain window on stop. Not read from the environment.
    pub drain_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_concurrent_jobs: 3,
            enable_graceful_shutdown: true,
            log_level: "info".into(),
            drain_timeout: DRAIN_TIMEOUT,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `WORKER_POLL_INTERVAL_MS`    | `1000`  |
    /// | `WORKER_MAX_CONCURRENT_JOBS` | `3`     |
    /// | `WORKER_GRACEFUL_SHUTDOWN`   | `true`  |
    /// | `WORKER_LOG_LEVEL`           | `info`  |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let poll_interval_ms: u64 = std::env::var("WORKER_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| defaults.poll_interval_ms.to_string())
            .parse()
            .expect("WORKER_POLL_INTERVAL_MS must be a valid u64");

        let max_concurrent_jobs: usize = std::env::var("WORKER_MAX_CONCURRENT_JOBS")
            .unwrap_or_else(|_| defaults.max_concurrent_jobs.to_string())
            .parse()
            .expect("WORKER_MAX_CONCURRENT_JOBS must be a valid usize");
        assert!(
            max_concurrent_jobs > 0,
            "WORKER_MAX_CONCURRENT_JOBS must be at least 1"
        );

        let enable_graceful_shutdown: bool = std::env::var("WORKER_GRACEFUL_SHUTDOWN")
            .unwrap_or_else(|_| defaults.enable_graceful_shutdown.to_string())
            .parse()
            .expect("WORKER_GRACEFUL_SHUTDOWN must be true or false");

        let log_level = std::env::var("WORKER_LOG_LEVEL").unwrap_or(defaults.log_level);

        Self {
            poll_interval_ms,
            max_concurrent_jobs,
            enable_graceful_shutdown,
            log_level,
            drain_timeout: DRAIN_TIMEOUT,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
