//! Merging extraction candidates into persisted character state.
//!
//! The merger is pure: it takes the current state and returns the next one
//! along with what changed. Persisting the result, invalidating caches and
//! enqueueing embedding jobs belong to the caller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::attributes::{parse_text, path, FieldType, TraitDomain, TraitValue};
use crate::extraction::{Confidence, ExtractionCandidate};
use crate::protection::ProtectionRules;
use crate::types::Timestamp;

/// Event type emitted once per trait domain with high-confidence changes.
pub const STATE_CHANGE_EVENT: &str = "state_change";

/// Context recorded on records created by [`seed_state`].
pub const SEED_CONTEXT: &str = "Seeded from character template";

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateSource {
    ManualUpdate,
    AutomatedExtraction,
}

/// The latest value at one field of adventure character state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitUpdateRecord {
    pub field: String,
    pub value: TraitValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<TraitValue>,
    pub timestamp: Timestamp,
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<UpdateSource>,
}

/// Field key -> latest record for one (adventure, character) pair.
///
/// Trait domains are keyed by their root (`appearance`); other candidates
/// by their field type (`location`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterState {
    fields: BTreeMap<String, TraitUpdateRecord>,
}

impl CharacterState {
    pub fn get(&self, field: &str) -> Option<&TraitUpdateRecord> {
        self.fields.get(field)
    }

    pub fn value(&self, field: &str) -> Option<&TraitValue> {
        self.fields.get(field).map(|r| &r.value)
    }

    pub fn insert(&mut self, record: TraitUpdateRecord) {
        self.fields.insert(record.field.clone(), record);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TraitUpdateRecord)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The library character an adventure's state is seeded from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterTemplate {
    pub name: String,
    pub appearance: Option<String>,
    pub personality: Option<String>,
    pub scents: Option<String>,
}

impl CharacterTemplate {
    fn text_for(&self, domain: TraitDomain) -> Option<&str> {
        let text = match domain {
            TraitDomain::Appearance => self.appearance.as_deref(),
            TraitDomain::Personality => self.personality.as_deref(),
            TraitDomain::Scents => self.scents.as_deref(),
        };
        text.map(str::trim).filter(|t| !t.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Options and outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeOptions {
    pub min_confidence: Confidence,
    pub dry_run: bool,
    pub source: UpdateSource,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            min_confidence: Confidence::Medium,
            dry_run: false,
            source: UpdateSource::AutomatedExtraction,
        }
    }
}

/// One `state_change` event per trait domain per batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChangeEvent {
    pub event_type: String,
    pub domain: TraitDomain,
    /// Full leaf paths changed in this domain.
    pub fields: Vec<String>,
    pub timestamp: Timestamp,
}

/// A rejected write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub updates_applied: usize,
    pub high_confidence_updates: usize,
    pub events: Vec<StateChangeEvent>,
    pub errors: Vec<MergeError>,
    /// Records written in this batch, in application order.
    pub accepted: Vec<TraitUpdateRecord>,
    pub state: CharacterState,
    pub dry_run: bool,
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Apply `candidates` in order on top of `existing`.
///
/// Each candidate is checked against `rules` leaf by leaf: protected leaves
/// are dropped and reported, the rest of the candidate still applies.
/// Structured values merge into the existing value of the same domain.
pub fn apply_extractions(
    existing: &CharacterState,
    candidates: &[ExtractionCandidate],
    rules: &ProtectionRules,
    options: &MergeOptions,
    now: Timestamp,
) -> MergeOutcome {
    let manual = options.source == UpdateSource::ManualUpdate;
    let mut state = existing.clone();
    let mut accepted = Vec::new();
    let mut errors = Vec::new();
    let mut high_confidence_updates = 0;
    let mut changed: BTreeMap<TraitDomain, Vec<String>> = BTreeMap::new();

    for candidate in candidates {
        if !manual && candidate.confidence < options.min_confidence {
            continue;
        }
        let key = state_key(candidate.field_type);
        let previous = state.get(&key);

        let Some(value) = filter_protected(&key, candidate, previous, rules, manual, &mut errors)
        else {
            continue;
        };

        let merged = match previous {
            Some(record) if record.value.domain().is_some() && value.domain().is_none() => {
                errors.push(MergeError {
                    field: key.clone(),
                    message: format!(
                        "Unstructured text would overwrite structured {key} attributes"
                    ),
                });
                continue;
            }
            Some(record) => match record.value.merged_with(&value) {
                Ok(merged) => merged,
                Err(e) => {
                    errors.push(MergeError {
                        field: key.clone(),
                        message: e.to_string(),
                    });
                    continue;
                }
            },
            None => value.clone(),
        };
        if previous.is_some_and(|r| r.value == merged) {
            continue;
        }

        let record = TraitUpdateRecord {
            field: key.clone(),
            old_value: previous.map(|r| r.value.clone()),
            value: merged,
            timestamp: now,
            context: candidate.context.clone(),
            confidence: Some(candidate.confidence),
            source: Some(options.source),
        };

        if candidate.confidence == Confidence::High {
            high_confidence_updates += 1;
            if let Some(domain) = candidate.field_type.domain() {
                let fields = changed.entry(domain).or_default();
                for leaf in path::leaf_paths(&value.attributes_json()) {
                    let full = path::join(&key, &leaf);
                    if !fields.contains(&full) {
                        fields.push(full);
                    }
                }
            }
        }

        state.insert(record.clone());
        accepted.push(record);
    }

    let events = changed
        .into_iter()
        .map(|(domain, fields)| StateChangeEvent {
            event_type: STATE_CHANGE_EVENT.to_string(),
            domain,
            fields,
            timestamp: now,
        })
        .collect();

    MergeOutcome {
        updates_applied: accepted.len(),
        high_confidence_updates,
        events,
        errors,
        accepted,
        state,
        dry_run: options.dry_run,
    }
}

/// State key for a field type: the domain root or the type name.
pub fn state_key(field_type: FieldType) -> String {
    match field_type.domain() {
        Some(domain) => domain.as_str().to_string(),
        None => field_type.as_str().to_string(),
    }
}

/// Strip leaves refused by protection rules, recording each refusal.
///
/// Returns `None` when nothing of the candidate survives.
fn filter_protected(
    key: &str,
    candidate: &ExtractionCandidate,
    previous: Option<&TraitUpdateRecord>,
    rules: &ProtectionRules,
    manual: bool,
    errors: &mut Vec<MergeError>,
) -> Option<TraitValue> {
    if candidate.extracted_data.is_empty() {
        return None;
    }
    if rules.is_empty() {
        return Some(candidate.extracted_data.clone());
    }

    let previous_json = previous.map(|r| r.value.attributes_json());
    let mut remaining = candidate.extracted_data.attributes_json();
    let score = candidate.confidence.score();

    for leaf in path::leaf_paths(&remaining) {
        let full = path::join(key, &leaf);
        let already_set = rules.rule_for(&full).is_some_and(|rule| {
            covered_value_set(key, &rule.field_path, previous_json.as_ref())
        });
        if let Err(rejection) = rules.check(&full, already_set, score, manual) {
            errors.push(MergeError {
                field: full,
                message: rejection.to_string(),
            });
            if leaf.is_empty() {
                return None;
            }
            path::remove(&mut remaining, &leaf);
        }
    }

    match candidate.extracted_data.domain() {
        Some(domain) => {
            if path::leaf_paths(&remaining).is_empty() {
                return None;
            }
            match TraitValue::from_attributes_json(domain, remaining) {
                Ok(value) => Some(value),
                Err(e) => {
                    errors.push(MergeError {
                        field: key.to_string(),
                        message: e.to_string(),
                    });
                    None
                }
            }
        }
        None => Some(candidate.extracted_data.clone()),
    }
}

/// Whether the subtree a rule at `rule_path` protects already holds a value.
///
/// Checked at the rule's path, not the candidate leaf, so a new sibling under
/// a protected object counts as a change to it. A previous value that is not
/// an object (unparsed text) is opaque and counts as set everywhere.
fn covered_value_set(key: &str, rule_path: &str, previous: Option<&serde_json::Value>) -> bool {
    let Some(previous) = previous.filter(|v| !v.is_null()) else {
        return false;
    };
    if !previous.is_object() {
        return true;
    }
    let relative = rule_path
        .strip_prefix(key)
        .map(|rest| rest.trim_start_matches('.'))
        .unwrap_or_default();
    path::get(previous, relative).is_some()
}

/// Build a high-confidence candidate for a user's direct edit.
///
/// Pair with [`UpdateSource::ManualUpdate`] so the confidence gate and
/// guarded rules are skipped.
pub fn manual_candidate(domain: TraitDomain, text: &str, context: &str) -> ExtractionCandidate {
    let extracted_data =
        parse_text(text, domain).unwrap_or_else(|| TraitValue::Text(text.trim().to_string()));
    ExtractionCandidate {
        field_type: domain.into(),
        original_text: text.to_string(),
        extracted_data,
        confidence: Confidence::High,
        context: context.to_string(),
    }
}

/// Initial adventure state from a library character.
///
/// Free-text fields are parsed into structured values; text the codec
/// cannot read is kept verbatim.
pub fn seed_state(template: &CharacterTemplate, now: Timestamp) -> CharacterState {
    let mut state = CharacterState::default();
    for domain in TraitDomain::ALL {
        let Some(text) = template.text_for(domain) else {
            continue;
        };
        let value = parse_text(text, domain).unwrap_or_else(|| TraitValue::Text(text.to_string()));
        state.insert(TraitUpdateRecord {
            field: domain.as_str().to_string(),
            value,
            old_value: None,
            timestamp: now,
            context: SEED_CONTEXT.to_string(),
            confidence: None,
            source: None,
        });
    }
    state
}
