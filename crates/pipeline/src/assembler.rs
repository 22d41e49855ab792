//! System prompt assembly for an adventure.
//!
//! The character section of the prompt context is read through the
//! [`ContextCache`]; cache trouble never fails a request.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use storyloom_core::error::CoreError;
use storyloom_core::ports::{AdventureStore, ContextCache};
use storyloom_core::prompt::{
    build_prompt, AdventureType, ContextValue, PromptContext, ResponseConfig,
};
use storyloom_core::types::DbId;

use crate::cache::CONTEXT_CACHE_TTL;
use crate::state_service::load_or_seed;

type CharacterContext = BTreeMap<String, ContextValue>;

/// A rendered system prompt plus the knobs the LLM caller needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledPrompt {
    pub adventure_type: AdventureType,
    pub system_prompt: String,
    pub stop_sequences: Vec<String>,
    pub context_window_size: u32,
    pub response_config: ResponseConfig,
}

pub struct PromptAssembler {
    store: Arc<dyn AdventureStore>,
    cache: Arc<dyn ContextCache>,
}

impl PromptAssembler {
    pub fn new(store: Arc<dyn AdventureStore>, cache: Arc<dyn ContextCache>) -> Self {
        Self { store, cache }
    }

    /// Build the system prompt for an adventure owned by `user_id`.
    ///
    /// An unknown or missing stored adventure type falls back to `general`.
    /// `context_window` is clamped into the type's bounds.
    pub async fn assemble(
        &self,
        adventure_id: DbId,
        user_id: DbId,
        context_window: Option<u32>,
    ) -> Result<AssembledPrompt, CoreError> {
        let adventure = self
            .store
            .get_adventure(adventure_id, user_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "adventure",
                id: adventure_id,
            })?;

        let character = match self.cached_character(adventure_id).await {
            Some(character) => character,
            None => {
                // Read before loading so an invalidation during the load wins.
                let generation = self.cache_generation(adventure_id).await;
                let loaded = load_or_seed(self.store.as_ref(), &adventure, user_id).await?;
                let character =
                    PromptContext::character_from_state(&adventure.character_name, &loaded.state);
                if let Some(generation) = generation {
                    self.store_character(adventure_id, &character, generation).await;
                }
                character
            }
        };

        let context = PromptContext::new(
            adventure.character_name.as_str(),
            adventure.player_name.as_str(),
            adventure.title.as_str(),
        )
        .with_character(character)
        .with_setting(adventure.setting)
        .with_location(adventure.location);

        let adventure_type = AdventureType::resolve(adventure.adventure_type.as_deref());
        let system_prompt = build_prompt(adventure_type.as_str(), &context)?;
        let response_config = ResponseConfig::for_type(adventure_type);

        Ok(AssembledPrompt {
            adventure_type,
            system_prompt,
            stop_sequences: response_config.stop_sequences_for(context.character_name()),
            context_window_size: response_config.context_window_size(context_window),
            response_config,
        })
    }

    async fn cached_character(&self, adventure_id: DbId) -> Option<CharacterContext> {
        let raw = match self.cache.get(adventure_id).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(adventure_id, error = %e, "Context cache read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(character) => Some(character),
            Err(e) => {
                tracing::warn!(adventure_id, error = %e, "Discarding unreadable cached context");
                None
            }
        }
    }

    async fn cache_generation(&self, adventure_id: DbId) -> Option<u64> {
        match self.cache.generation(adventure_id).await {
            Ok(generation) => Some(generation),
            Err(e) => {
                tracing::warn!(adventure_id, error = %e, "Context cache read failed");
                None
            }
        }
    }

    async fn store_character(
        &self,
        adventure_id: DbId,
        character: &CharacterContext,
        generation: u64,
    ) {
        let raw = match serde_json::to_string(character) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(adventure_id, error = %e, "Failed to serialize character context");
                return;
            }
        };
        match self
            .cache
            .set_if_generation(adventure_id, raw, CONTEXT_CACHE_TTL, generation)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(adventure_id, "State changed during load, context not cached");
            }
            Err(e) => tracing::warn!(adventure_id, error = %e, "Context cache write failed"),
        }
    }
}
