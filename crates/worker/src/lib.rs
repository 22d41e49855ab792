//! Background embedding worker.
//!
//! [`EmbeddingWorker`] claims embedding jobs from a [`JobQueue`], runs them
//! through an [`EmbeddingGenerator`] with bounded concurrency, and records
//! every outcome on the job.
//!
//! [`JobQueue`]: storyloom_core::ports::JobQueue
//! [`EmbeddingGenerator`]: storyloom_core::ports::EmbeddingGenerator

pub mod config;
pub mod error;
pub mod generator;
pub mod worker;

pub use config::WorkerConfig;
pub use error::WorkerError;
pub use generator::{EmbeddingServiceConfig, HttpEmbeddingGenerator};
pub use worker::{current_job, EmbeddingWorker, WorkerState, WorkerStatus};
