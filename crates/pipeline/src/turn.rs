//! Turn enrichment: extract character-state changes from a chat turn and
//! merge them.

use std::sync::Arc;

use serde::Serialize;
use storyloom_core::error::CoreError;
use storyloom_core::extraction::{
    extract_state, ExtractionCandidate, ExtractionMetadata, ExtractionOptions,
};
use storyloom_core::merge::{MergeError, MergeOptions, MergeOutcome, StateChangeEvent};
use storyloom_core::types::DbId;

use crate::state_service::CharacterStateService;

/// What enrichment did for one turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    pub extractions: Vec<ExtractionCandidate>,
    pub updates_applied: usize,
    pub high_confidence_updates: usize,
    pub events: Vec<StateChangeEvent>,
    pub errors: Vec<MergeError>,
    /// Set when enrichment failed; the turn itself still succeeds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment_error: Option<String>,
}

/// A dry-run merge of extracted text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnPreview {
    pub extractions: Vec<ExtractionCandidate>,
    pub metadata: ExtractionMetadata,
    pub outcome: MergeOutcome,
}

pub struct TurnProcessor {
    states: Arc<CharacterStateService>,
    extraction: ExtractionOptions,
    merge: MergeOptions,
}

impl TurnProcessor {
    pub fn new(states: Arc<CharacterStateService>) -> Self {
        Self {
            states,
            extraction: ExtractionOptions::default(),
            merge: MergeOptions::default(),
        }
    }

    pub fn with_options(mut self, extraction: ExtractionOptions, merge: MergeOptions) -> Self {
        self.extraction = extraction;
        self.merge = merge;
        self
    }

    /// Extract from the assistant reply (and the user message, if given) and
    /// merge the result.
    ///
    /// Never fails: errors are logged and reported in `enrichment_error`.
    pub async fn process_turn(
        &self,
        adventure_id: DbId,
        user_id: DbId,
        assistant_text: &str,
        user_text: Option<&str>,
    ) -> TurnOutcome {
        let extractions = self.extract(assistant_text, user_text);
        if extractions.is_empty() {
            return TurnOutcome::default();
        }

        let options = MergeOptions {
            dry_run: false,
            ..self.merge
        };
        match self
            .states
            .apply(adventure_id, user_id, &extractions, &options)
            .await
        {
            Ok(outcome) => {
                if outcome.updates_applied > 0 {
                    tracing::info!(
                        adventure_id,
                        updates_applied = outcome.updates_applied,
                        high_confidence_updates = outcome.high_confidence_updates,
                        "Turn enrichment applied"
                    );
                }
                for error in &outcome.errors {
                    tracing::debug!(adventure_id, field = %error.field, reason = %error.message, "Update rejected");
                }
                TurnOutcome {
                    extractions,
                    updates_applied: outcome.updates_applied,
                    high_confidence_updates: outcome.high_confidence_updates,
                    events: outcome.events,
                    errors: outcome.errors,
                    enrichment_error: None,
                }
            }
            Err(e) => {
                tracing::warn!(adventure_id, error = %e, "Turn enrichment failed");
                TurnOutcome {
                    extractions,
                    enrichment_error: Some(e.to_string()),
                    ..TurnOutcome::default()
                }
            }
        }
    }

    /// Extract from `text` and compute the merge without persisting.
    pub async fn preview(
        &self,
        adventure_id: DbId,
        user_id: DbId,
        text: &str,
    ) -> Result<TurnPreview, CoreError> {
        if text.trim().is_empty() {
            return Err(CoreError::Validation("text must not be empty".into()));
        }
        let result = extract_state(text, &self.extraction);
        let options = MergeOptions {
            dry_run: true,
            ..self.merge
        };
        let outcome = self
            .states
            .apply(adventure_id, user_id, &result.extractions, &options)
            .await?;
        Ok(TurnPreview {
            extractions: result.extractions,
            metadata: result.metadata,
            outcome,
        })
    }

    fn extract(&self, assistant_text: &str, user_text: Option<&str>) -> Vec<ExtractionCandidate> {
        let mut extractions = extract_state(assistant_text, &self.extraction).extractions;
        if let Some(user_text) = user_text.filter(|t| !t.trim().is_empty()) {
            extractions.extend(extract_state(user_text, &self.extraction).extractions);
        }
        extractions
    }
}
