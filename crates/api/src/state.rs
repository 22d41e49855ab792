use std::sync::Arc;

use storyloom_core::ports::{AdventureStore, ContextCache, JobQueue, ProtectionRuleSource};
use storyloom_db::adapters::{PgAdventureStore, PgJobQueue, PgProtectionRuleSource};
use storyloom_pipeline::{CharacterStateService, InMemoryContextCache, PromptAssembler, TurnProcessor};
use storyloom_worker::EmbeddingWorker;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything heavy sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: storyloom_db::DbPool,
    /// Server configuration (JWT secret for the auth extractor).
    pub config: Arc<ServerConfig>,
    /// The process-wide embedding worker.
    pub worker: Arc<EmbeddingWorker>,
    /// Embedding job queue, for admin inspection and cleanup.
    pub jobs: Arc<dyn JobQueue>,
    pub states: Arc<CharacterStateService>,
    pub assembler: Arc<PromptAssembler>,
    pub turns: Arc<TurnProcessor>,
}

impl AppState {
    /// Wire the PostgreSQL adapters, the in-process context cache, and the
    /// given worker into request-path services.
    pub fn new(pool: storyloom_db::DbPool, config: ServerConfig, worker: Arc<EmbeddingWorker>) -> Self {
        let store: Arc<dyn AdventureStore> = Arc::new(PgAdventureStore::new(pool.clone()));
        let jobs: Arc<dyn JobQueue> = Arc::new(PgJobQueue::new(pool.clone()));
        let rules: Arc<dyn ProtectionRuleSource> =
            Arc::new(PgProtectionRuleSource::new(pool.clone()));
        let cache: Arc<dyn ContextCache> = Arc::new(InMemoryContextCache::new());

        let states = Arc::new(CharacterStateService::new(
            Arc::clone(&store),
            Arc::clone(&jobs),
            rules,
            Arc::clone(&cache),
        ));
        let assembler = Arc::new(PromptAssembler::new(store, cache));
        let turns = Arc::new(TurnProcessor::new(Arc::clone(&states)));

        Self {
            pool,
            config: Arc::new(config),
            worker,
            jobs,
            states,
            assembler,
            turns,
        }
    }
}
