mod common;

use assert_matches::assert_matches;
use common::*;
use storyloom_core::attributes::{TraitDomain, TraitValue};
use storyloom_core::error::CoreError;
use storyloom_core::ports::ContextCache;
use storyloom_core::prompt::AdventureType;
use storyloom_core::protection::{ProtectionLevel, ProtectionRule};
use storyloom_pipeline::TurnProcessor;

fn rule(path: &str, level: ProtectionLevel, min_confidence: f64) -> ProtectionRule {
    ProtectionRule {
        field_path: path.into(),
        protection_level: level,
        min_confidence,
        priority: 0,
    }
}

fn hair_of(h: &Harness) -> storyloom_core::attributes::Hair {
    let state = h.store.stored_state().expect("state persisted");
    match state.value("appearance") {
        Some(TraitValue::Appearance(a)) => a.hair.clone().expect("hair set"),
        other => panic!("expected appearance, got {other:?}"),
    }
}

// -- Turn enrichment ---------------------------------------------------------

#[tokio::test]
async fn hair_change_merges_into_seeded_state() {
    let h = harness(MemoryStore::with_adventure(Some("romance"), mira()), vec![]);
    let turns = TurnProcessor::new(h.states.clone());

    let outcome = turns
        .process_turn(ADVENTURE, USER, "My hair is now blonde and curly.", None)
        .await;

    assert_eq!(outcome.enrichment_error, None);
    assert_eq!(outcome.extractions.len(), 1);
    assert_eq!(outcome.updates_applied, 1);
    assert_eq!(outcome.high_confidence_updates, 1);
    assert_eq!(outcome.events.len(), 1);
    assert_eq!(outcome.events[0].domain, TraitDomain::Appearance);

    let hair = hair_of(&h);
    assert_eq!(hair.color.as_deref(), Some("blonde"));
    assert_eq!(hair.style.as_deref(), Some("curly"));
    assert_eq!(hair.length.as_deref(), Some("long"), "untouched leaf is kept");

    let state = h.store.stored_state().unwrap();
    assert!(state.get("appearance").unwrap().old_value.is_some());

    wait_for_jobs(&h.queue, 2).await;
    assert_eq!(
        h.queue.paths(),
        ["appearance.hair.color", "appearance.hair.style"]
    );
}

#[tokio::test]
async fn immutable_field_rejects_change() {
    let h = harness(
        MemoryStore::with_adventure(None, mira()),
        vec![rule("appearance.hair.color", ProtectionLevel::Immutable, 0.0)],
    );
    let turns = TurnProcessor::new(h.states.clone());

    let outcome = turns
        .process_turn(ADVENTURE, USER, "My hair is now blonde.", None)
        .await;

    assert_eq!(outcome.updates_applied, 0);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].field, "appearance.hair.color");
    assert!(h.store.stored_state().is_none(), "nothing accepted, nothing written");

    wait_for_jobs(&h.queue, 1).await;
    assert!(h.queue.paths().is_empty());
}

#[tokio::test]
async fn enrichment_failure_does_not_fail_the_turn() {
    let store = MemoryStore::with_adventure(None, mira());
    store
        .fail_writes
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let h = harness(store, vec![]);
    let turns = TurnProcessor::new(h.states.clone());

    let outcome = turns
        .process_turn(ADVENTURE, USER, "My hair is now blonde.", None)
        .await;

    assert_eq!(outcome.extractions.len(), 1);
    assert_eq!(outcome.updates_applied, 0);
    assert!(outcome.enrichment_error.unwrap().contains("write failed"));
}

#[tokio::test]
async fn turn_without_state_changes_is_a_no_op() {
    let h = harness(MemoryStore::with_adventure(None, mira()), vec![]);
    let turns = TurnProcessor::new(h.states.clone());

    let outcome = turns
        .process_turn(ADVENTURE, USER, "The innkeeper pours another drink.", Some("Thanks."))
        .await;

    assert!(outcome.extractions.is_empty());
    assert_eq!(outcome.enrichment_error, None);
    assert!(h.store.stored_state().is_none());
}

#[tokio::test]
async fn other_users_adventure_is_not_found() {
    let h = harness(MemoryStore::with_adventure(None, mira()), vec![]);
    let turns = TurnProcessor::new(h.states.clone());

    let outcome = turns
        .process_turn(ADVENTURE, USER + 1, "My hair is now blonde.", None)
        .await;
    assert!(outcome.enrichment_error.unwrap().contains("adventure"));

    let err = turns
        .preview(ADVENTURE, USER + 1, "My hair is now blonde.")
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::NotFound { entity: "adventure", .. });
}

// -- Preview and manual edits ------------------------------------------------

#[tokio::test]
async fn preview_does_not_persist() {
    let h = harness(MemoryStore::with_adventure(None, mira()), vec![]);
    let turns = TurnProcessor::new(h.states.clone());

    let preview = turns
        .preview(ADVENTURE, USER, "My hair is now blonde and curly.")
        .await
        .unwrap();

    assert!(preview.outcome.dry_run);
    assert_eq!(preview.outcome.updates_applied, 1);
    assert_eq!(preview.metadata.returned_count, 1);
    assert!(h.store.stored_state().is_none());
    wait_for_jobs(&h.queue, 1).await;
    assert!(h.queue.paths().is_empty());
}

#[tokio::test]
async fn preview_rejects_blank_text() {
    let h = harness(MemoryStore::with_adventure(None, mira()), vec![]);
    let turns = TurnProcessor::new(h.states.clone());
    let err = turns.preview(ADVENTURE, USER, "  ").await.unwrap_err();
    assert_matches!(err, CoreError::Validation(_));
}

#[tokio::test]
async fn manual_edit_bypasses_guarded_rules_only() {
    let h = harness(
        MemoryStore::with_adventure(None, mira()),
        vec![
            rule("appearance.hair", ProtectionLevel::Guarded, 0.95),
            rule("appearance.eyes", ProtectionLevel::Immutable, 0.0),
        ],
    );
    let turns = TurnProcessor::new(h.states.clone());

    // High confidence (0.9) is below the guarded threshold.
    let outcome = turns
        .process_turn(ADVENTURE, USER, "My hair is now blonde.", None)
        .await;
    assert_eq!(outcome.updates_applied, 0);
    assert_eq!(outcome.errors.len(), 1);

    let outcome = h
        .states
        .manual_update(ADVENTURE, USER, TraitDomain::Appearance, "hair: blonde, eyes: grey")
        .await
        .unwrap();
    assert_eq!(outcome.updates_applied, 1);
    assert_eq!(outcome.errors.len(), 1, "eyes stay immutable");
    assert_eq!(hair_of(&h).color.as_deref(), Some("blonde"));
}

// -- Prompt assembly ---------------------------------------------------------

#[tokio::test]
async fn prompt_reads_through_cache_and_sees_updates() {
    let h = harness(MemoryStore::with_adventure(Some("romance"), mira()), vec![]);
    let turns = TurnProcessor::new(h.states.clone());

    let first = h.assembler.assemble(ADVENTURE, USER, None).await.unwrap();
    assert_eq!(first.adventure_type, AdventureType::Romance);
    assert!(first.system_prompt.contains("ROMANCE FOCUS"));
    assert!(first.system_prompt.contains("silver"));
    assert!(first.stop_sequences.contains(&"Mira:".to_string()));
    assert_eq!(first.context_window_size, 20);
    assert!(h.cache.get(ADVENTURE).await.unwrap().is_some());

    turns
        .process_turn(ADVENTURE, USER, "My hair is now blonde and curly.", None)
        .await;
    assert!(
        h.cache.get(ADVENTURE).await.unwrap().is_none(),
        "accepted update invalidates the cached context"
    );

    let second = h.assembler.assemble(ADVENTURE, USER, Some(100)).await.unwrap();
    assert!(second.system_prompt.contains("blonde"));
    assert_eq!(second.context_window_size, 40);
}

#[tokio::test]
async fn update_during_cache_miss_load_is_not_masked_by_stale_context() {
    let h = harness(MemoryStore::with_adventure(Some("romance"), mira()), vec![]);
    let gate = h.store.arm_read_gate();

    let (first, outcome) = tokio::join!(h.assembler.assemble(ADVENTURE, USER, None), async {
        gate.reached.notified().await;
        let outcome = h
            .states
            .manual_update(ADVENTURE, USER, TraitDomain::Appearance, "hair: black")
            .await;
        gate.resume.notify_one();
        outcome
    });

    assert!(first.unwrap().system_prompt.contains("silver"));
    assert_eq!(outcome.unwrap().updates_applied, 1);
    assert!(
        h.cache.get(ADVENTURE).await.unwrap().is_none(),
        "context loaded before the update is not cached"
    );

    let second = h.assembler.assemble(ADVENTURE, USER, None).await.unwrap();
    assert!(second.system_prompt.contains("black"));
    assert!(!second.system_prompt.contains("silver"));
}

#[tokio::test]
async fn unknown_stored_type_falls_back_to_general() {
    let h = harness(MemoryStore::with_adventure(Some("horror"), mira()), vec![]);

    let prompt = h.assembler.assemble(ADVENTURE, USER, None).await.unwrap();

    assert_eq!(prompt.adventure_type, AdventureType::General);
    assert!(prompt.system_prompt.contains("STORY FOCUS"));
    assert!(!prompt.system_prompt.contains("{{"));
    assert!(!prompt.stop_sequences.contains(&"Mira:".to_string()));
    assert_eq!(prompt.context_window_size, 16);
}

#[tokio::test]
async fn prompt_for_missing_adventure_is_not_found() {
    let h = harness(MemoryStore::with_adventure(None, mira()), vec![]);
    let err = h.assembler.assemble(ADVENTURE + 1, USER, None).await.unwrap_err();
    assert_matches!(err, CoreError::NotFound { .. });
}
