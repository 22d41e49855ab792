//! Loading, merging and persisting adventure character state.

use std::sync::Arc;

use serde::Serialize;
use storyloom_core::attributes::{path, TraitDomain};
use storyloom_core::embedding_job::EmbeddingJobPayload;
use storyloom_core::error::CoreError;
use storyloom_core::extraction::{Confidence, ExtractionCandidate};
use storyloom_core::merge::{
    apply_extractions, manual_candidate, seed_state, CharacterState, MergeOptions, MergeOutcome,
    TraitUpdateRecord, UpdateSource,
};
use storyloom_core::ports::{
    AdventureRecord, AdventureStore, ContextCache, JobQueue, ProtectionRuleSource,
};
use storyloom_core::protection::ProtectionRules;
use storyloom_core::types::DbId;

/// Context recorded on manual edits.
const MANUAL_EDIT_CONTEXT: &str = "Manual edit";

/// Current state of an adventure, seeded from its character when nothing
/// has been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedState {
    /// Id of the stored row; `None` for a freshly seeded state.
    pub state_id: Option<DbId>,
    pub state: CharacterState,
}

pub struct CharacterStateService {
    store: Arc<dyn AdventureStore>,
    jobs: Arc<dyn JobQueue>,
    rules: Arc<dyn ProtectionRuleSource>,
    cache: Arc<dyn ContextCache>,
}

impl CharacterStateService {
    pub fn new(
        store: Arc<dyn AdventureStore>,
        jobs: Arc<dyn JobQueue>,
        rules: Arc<dyn ProtectionRuleSource>,
        cache: Arc<dyn ContextCache>,
    ) -> Self {
        Self {
            store,
            jobs,
            rules,
            cache,
        }
    }

    /// The adventure owned by `user_id`, or `NotFound`.
    pub async fn adventure(
        &self,
        adventure_id: DbId,
        user_id: DbId,
    ) -> Result<AdventureRecord, CoreError> {
        self.store
            .get_adventure(adventure_id, user_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "adventure",
                id: adventure_id,
            })
    }

    pub async fn load_state(
        &self,
        adventure: &AdventureRecord,
        user_id: DbId,
    ) -> Result<LoadedState, CoreError> {
        load_or_seed(self.store.as_ref(), adventure, user_id).await
    }

    /// Merge `candidates` into the adventure's state.
    ///
    /// Unless `options.dry_run` is set, accepted changes are persisted, the
    /// adventure's cached context is dropped before returning, and one
    /// embedding job per changed leaf is enqueued in the background.
    pub async fn apply(
        &self,
        adventure_id: DbId,
        user_id: DbId,
        candidates: &[ExtractionCandidate],
        options: &MergeOptions,
    ) -> Result<MergeOutcome, CoreError> {
        let adventure = self.adventure(adventure_id, user_id).await?;
        let loaded = self.load_state(&adventure, user_id).await?;
        let rules = ProtectionRules::new(self.rules.list_rules().await?);

        let outcome = apply_extractions(
            &loaded.state,
            candidates,
            &rules,
            options,
            chrono::Utc::now(),
        );

        if outcome.dry_run || outcome.accepted.is_empty() {
            return Ok(outcome);
        }

        let state_id = self
            .store
            .update_state(adventure_id, &outcome.state, user_id)
            .await?;
        tracing::debug!(
            adventure_id,
            state_id,
            updates_applied = outcome.updates_applied,
            "Character state updated"
        );

        if let Err(e) = self.cache.invalidate(adventure_id).await {
            tracing::warn!(adventure_id, error = %e, "Failed to invalidate context cache");
        }

        let payloads = embedding_payloads(state_id, &outcome.accepted);
        self.enqueue_embedding_jobs(payloads);

        Ok(outcome)
    }

    /// Apply a user's direct edit of one trait domain.
    ///
    /// Bypasses the confidence gate and guarded rules; immutable rules still
    /// hold.
    pub async fn manual_update(
        &self,
        adventure_id: DbId,
        user_id: DbId,
        domain: TraitDomain,
        text: &str,
    ) -> Result<MergeOutcome, CoreError> {
        if text.trim().is_empty() {
            return Err(CoreError::Validation(format!("{domain} text must not be empty")));
        }
        let candidate = manual_candidate(domain, text, MANUAL_EDIT_CONTEXT);
        let options = MergeOptions {
            min_confidence: Confidence::Low,
            dry_run: false,
            source: UpdateSource::ManualUpdate,
        };
        self.apply(adventure_id, user_id, &[candidate], &options).await
    }

    /// Fire-and-forget enqueue. Failures are logged, never surfaced.
    fn enqueue_embedding_jobs(&self, payloads: Vec<EmbeddingJobPayload>) {
        for payload in payloads {
            let jobs = Arc::clone(&self.jobs);
            tokio::spawn(async move {
                match jobs.create_embedding_job(&payload).await {
                    Ok(job_id) => {
                        tracing::debug!(job_id, trait_path = %payload.trait_path, "Embedding job enqueued");
                    }
                    Err(e) => {
                        tracing::warn!(
                            trait_path = %payload.trait_path,
                            error = %e,
                            "Failed to enqueue embedding job"
                        );
                    }
                }
            });
        }
    }
}

/// Stored state, or a state seeded from the adventure's library character.
pub(crate) async fn load_or_seed(
    store: &dyn AdventureStore,
    adventure: &AdventureRecord,
    user_id: DbId,
) -> Result<LoadedState, CoreError> {
    if let Some(stored) = store.get_state(adventure.id, user_id).await? {
        return Ok(LoadedState {
            state_id: Some(stored.id),
            state: stored.state,
        });
    }
    let state = match store.get_character(adventure.character_id, user_id).await? {
        Some(template) => seed_state(&template, chrono::Utc::now()),
        None => CharacterState::default(),
    };
    Ok(LoadedState {
        state_id: None,
        state,
    })
}

/// One payload per leaf whose value differs from the record's old value.
pub fn embedding_payloads(
    state_id: DbId,
    records: &[TraitUpdateRecord],
) -> Vec<EmbeddingJobPayload> {
    let mut payloads = Vec::new();
    for record in records {
        let new = record.value.attributes_json();
        let old = record.old_value.as_ref().map(|v| v.attributes_json());
        for leaf in path::leaf_paths(&new) {
            let Some(value) = path::get(&new, &leaf) else {
                continue;
            };
            if old.as_ref().and_then(|o| path::get(o, &leaf)) == Some(value) {
                continue;
            }
            let text = leaf_text(value);
            if text.is_empty() {
                continue;
            }
            payloads.push(EmbeddingJobPayload {
                adventure_character_id: state_id,
                trait_type: record.field.clone(),
                trait_path: path::join(&record.field, &leaf),
                trait_value: text,
                context: record.context.clone(),
            });
        }
    }
    payloads
}

fn leaf_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(leaf_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyloom_core::attributes::{Appearance, Hair, TraitValue};

    fn record(value: TraitValue, old_value: Option<TraitValue>) -> TraitUpdateRecord {
        TraitUpdateRecord {
            field: "appearance".into(),
            value,
            old_value,
            timestamp: chrono::Utc::now(),
            context: "My hair is now blonde.".into(),
            confidence: Some(Confidence::High),
            source: Some(UpdateSource::AutomatedExtraction),
        }
    }

    fn hair(color: &str, length: Option<&str>) -> TraitValue {
        TraitValue::Appearance(Appearance {
            hair: Some(Hair {
                color: Some(color.into()),
                length: length.map(Into::into),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    #[test]
    fn payloads_cover_only_changed_leaves() {
        let records = [record(
            hair("blonde", Some("long")),
            Some(hair("red", Some("long"))),
        )];
        let payloads = embedding_payloads(42, &records);
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].trait_path, "appearance.hair.color");
        assert_eq!(payloads[0].trait_value, "blonde");
        assert_eq!(payloads[0].trait_type, "appearance");
        assert_eq!(payloads[0].adventure_character_id, 42);
    }

    #[test]
    fn text_values_use_the_field_path() {
        let mut location = record(TraitValue::Text("the old lighthouse".into()), None);
        location.field = "location".into();
        let payloads = embedding_payloads(1, &[location]);
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].trait_path, "location");
        assert_eq!(payloads[0].trait_value, "the old lighthouse");
    }
}
