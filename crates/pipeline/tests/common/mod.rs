//! In-memory port implementations for pipeline integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use storyloom_core::embedding_job::{
    EmbeddingJob, EmbeddingJobPayload, EmbeddingJobStatus, JobStats,
};
use storyloom_core::error::CoreError;
use storyloom_core::merge::{CharacterState, CharacterTemplate};
use storyloom_core::ports::{
    AdventureRecord, AdventureStore, JobQueue, ProtectionRuleSource, StoredState,
};
use storyloom_core::protection::ProtectionRule;
use storyloom_core::types::DbId;
use storyloom_pipeline::{CharacterStateService, InMemoryContextCache, PromptAssembler};

pub const USER: DbId = 1;
pub const ADVENTURE: DbId = 10;
pub const CHARACTER: DbId = 20;

#[derive(Default)]
pub struct MemoryStore {
    pub adventures: Mutex<HashMap<DbId, AdventureRecord>>,
    pub characters: Mutex<HashMap<DbId, (DbId, CharacterTemplate)>>,
    pub states: Mutex<HashMap<DbId, StoredState>>,
    pub fail_writes: AtomicBool,
    /// When armed, the next `get_state` signals `reached` and then waits
    /// for `resume`.
    pub read_gate: Mutex<Option<ReadGate>>,
    next_state_id: AtomicI64,
}

#[derive(Clone, Default)]
pub struct ReadGate {
    pub reached: Arc<Notify>,
    pub resume: Arc<Notify>,
}

impl MemoryStore {
    pub fn with_adventure(adventure_type: Option<&str>, template: CharacterTemplate) -> Self {
        let store = Self::default();
        store.adventures.lock().unwrap().insert(
            ADVENTURE,
            AdventureRecord {
                id: ADVENTURE,
                user_id: USER,
                title: "The Lantern Road".into(),
                adventure_type: adventure_type.map(Into::into),
                character_id: CHARACTER,
                character_name: template.name.clone(),
                player_name: "Sam".into(),
                setting: None,
                location: None,
            },
        );
        store
            .characters
            .lock()
            .unwrap()
            .insert(CHARACTER, (USER, template));
        store
    }

    pub fn arm_read_gate(&self) -> ReadGate {
        let gate = ReadGate::default();
        *self.read_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn stored_state(&self) -> Option<CharacterState> {
        self.states
            .lock()
            .unwrap()
            .get(&ADVENTURE)
            .map(|s| s.state.clone())
    }
}

#[async_trait]
impl AdventureStore for MemoryStore {
    async fn get_adventure(
        &self,
        adventure_id: DbId,
        user_id: DbId,
    ) -> Result<Option<AdventureRecord>, CoreError> {
        Ok(self
            .adventures
            .lock()
            .unwrap()
            .get(&adventure_id)
            .filter(|a| a.user_id == user_id)
            .cloned())
    }

    async fn get_state(
        &self,
        adventure_id: DbId,
        user_id: DbId,
    ) -> Result<Option<StoredState>, CoreError> {
        if self.get_adventure(adventure_id, user_id).await?.is_none() {
            return Ok(None);
        }
        let snapshot = self.states.lock().unwrap().get(&adventure_id).cloned();
        let gate = self.read_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.reached.notify_one();
            gate.resume.notified().await;
            return Ok(snapshot);
        }
        Ok(self.states.lock().unwrap().get(&adventure_id).cloned())
    }

    async fn update_state(
        &self,
        adventure_id: DbId,
        state: &CharacterState,
        user_id: DbId,
    ) -> Result<DbId, CoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CoreError::Internal("write failed".into()));
        }
        if self.get_adventure(adventure_id, user_id).await?.is_none() {
            return Err(CoreError::NotFound {
                entity: "adventure",
                id: adventure_id,
            });
        }
        let mut states = self.states.lock().unwrap();
        let id = match states.get(&adventure_id) {
            Some(existing) => existing.id,
            None => self.next_state_id.fetch_add(1, Ordering::SeqCst) + 100,
        };
        states.insert(
            adventure_id,
            StoredState {
                id,
                adventure_id,
                state: state.clone(),
            },
        );
        Ok(id)
    }

    async fn get_character(
        &self,
        character_id: DbId,
        user_id: DbId,
    ) -> Result<Option<CharacterTemplate>, CoreError> {
        Ok(self
            .characters
            .lock()
            .unwrap()
            .get(&character_id)
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, template)| template.clone()))
    }
}

/// Records enqueued payloads; the claim side is unused here.
#[derive(Default)]
pub struct RecordingQueue {
    pub created: Mutex<Vec<EmbeddingJobPayload>>,
}

impl RecordingQueue {
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .created
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.trait_path.clone())
            .collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl JobQueue for RecordingQueue {
    async fn create_embedding_job(&self, payload: &EmbeddingJobPayload) -> Result<DbId, CoreError> {
        let mut created = self.created.lock().unwrap();
        created.push(payload.clone());
        Ok(created.len() as DbId)
    }

    async fn get_next_pending_job(&self) -> Result<Option<EmbeddingJob>, CoreError> {
        Ok(None)
    }

    async fn peek_next_job(&self) -> Result<Option<EmbeddingJob>, CoreError> {
        Ok(None)
    }

    async fn mark_completed(&self, _job_id: DbId) -> Result<(), CoreError> {
        Ok(())
    }

    async fn mark_failed(&self, _job_id: DbId, _error: &str) -> Result<EmbeddingJobStatus, CoreError> {
        Ok(EmbeddingJobStatus::Failed)
    }

    async fn log_event(
        &self,
        _job_id: DbId,
        _event_type: &str,
        _message: &str,
        _metadata: serde_json::Value,
    ) -> Result<(), CoreError> {
        Ok(())
    }

    async fn get_stats(&self) -> Result<JobStats, CoreError> {
        Ok(JobStats::default())
    }

    async fn cleanup_old_jobs(&self, _older_than_days: i32) -> Result<u64, CoreError> {
        Ok(0)
    }
}

pub struct StaticRules(pub Vec<ProtectionRule>);

#[async_trait]
impl ProtectionRuleSource for StaticRules {
    async fn list_rules(&self) -> Result<Vec<ProtectionRule>, CoreError> {
        Ok(self.0.clone())
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub queue: Arc<RecordingQueue>,
    pub cache: Arc<InMemoryContextCache>,
    pub states: Arc<CharacterStateService>,
    pub assembler: PromptAssembler,
}

pub fn harness(store: MemoryStore, rules: Vec<ProtectionRule>) -> Harness {
    let store = Arc::new(store);
    let queue = Arc::new(RecordingQueue::default());
    let cache = Arc::new(InMemoryContextCache::new());
    let states = Arc::new(CharacterStateService::new(
        store.clone(),
        queue.clone(),
        Arc::new(StaticRules(rules)),
        cache.clone(),
    ));
    let assembler = PromptAssembler::new(store.clone(), cache.clone());
    Harness {
        store,
        queue,
        cache,
        states,
        assembler,
    }
}

pub fn mira() -> CharacterTemplate {
    CharacterTemplate {
        name: "Mira".into(),
        appearance: Some("She has long silver hair and bright green eyes.".into()),
        personality: Some("wry, patient".into()),
        scents: None,
    }
}

/// Let spawned enqueue tasks run until `expected` payloads arrived.
pub async fn wait_for_jobs(queue: &RecordingQueue, expected: usize) {
    for _ in 0..100 {
        if queue.created.lock().unwrap().len() >= expected {
            return;
        }
        tokio::task::yield_now().await;
    }
}
