use assert_matches::assert_matches;
use chrono::TimeZone;
use sqlx::PgPool;
use storyloom_core::error::CoreError;
use storyloom_core::merge::{seed_state, CharacterTemplate};
use storyloom_core::ports::{AdventureStore, ProtectionRuleSource};
use storyloom_core::protection::ProtectionLevel;
use storyloom_db::adapters::{PgAdventureStore, PgProtectionRuleSource};
use storyloom_db::models::adventure::CreateAdventure;
use storyloom_db::models::character::CreateCharacter;
use storyloom_db::models::protection_rule::CreateProtectionRule;
use storyloom_db::repositories::{AdventureRepo, CharacterRepo, ProtectionRuleRepo};

const OWNER: i64 = 1;
const STRANGER: i64 = 2;

async fn seed_adventure(pool: &PgPool) -> (i64, i64) {
    let character = CharacterRepo::create(
        pool,
        &CreateCharacter {
            user_id: OWNER,
            name: "Mira".into(),
            appearance: Some("Long silver hair and green eyes".into()),
            personality: Some("wry, patient".into()),
            scents: None,
        },
    )
    .await
    .unwrap();
    let adventure = AdventureRepo::create(
        pool,
        &CreateAdventure {
            user_id: OWNER,
            character_id: character.id,
            title: "The Lantern Road".into(),
            adventure_type: None,
            character_name: "Mira".into(),
            player_name: Some("Sam".into()),
            setting: Some(serde_json::json!({"name": "Harbor City"})),
            location: None,
        },
    )
    .await
    .unwrap();
    (adventure.id, character.id)
}

#[sqlx::test(migrations = "./migrations")]
async fn test_health_check(pool: PgPool) {
    storyloom_db::health_check(&pool).await.unwrap();
}

#[sqlx::test(migrations = "./migrations")]
async fn test_player_name_defaults(pool: PgPool) {
    let (_, character_id) = seed_adventure(&pool).await;
    let adventure = AdventureRepo::create(
        &pool,
        &CreateAdventure {
            user_id: OWNER,
            character_id,
            title: "Second".into(),
            adventure_type: Some("action".into()),
            character_name: "Mira".into(),
            player_name: None,
            setting: None,
            location: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(adventure.player_name, "Traveler");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_adventure_lookup_is_owner_scoped(pool: PgPool) {
    let (adventure_id, character_id) = seed_adventure(&pool).await;
    let store = PgAdventureStore::new(pool);

    let record = store.get_adventure(adventure_id, OWNER).await.unwrap().unwrap();
    assert_eq!(record.player_name, "Sam");
    assert_eq!(record.setting.unwrap()["name"], "Harbor City");
    assert!(store.get_adventure(adventure_id, STRANGER).await.unwrap().is_none());

    let template = store.get_character(character_id, OWNER).await.unwrap().unwrap();
    assert_eq!(template.name, "Mira");
    assert!(store.get_character(character_id, STRANGER).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_state_upsert_round_trips(pool: PgPool) {
    let (adventure_id, _) = seed_adventure(&pool).await;
    let store = PgAdventureStore::new(pool);
    assert!(store.get_state(adventure_id, OWNER).await.unwrap().is_none());

    let now = chrono::Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    let template = CharacterTemplate {
        name: "Mira".into(),
        appearance: Some("Long silver hair".into()),
        personality: Some("wry".into()),
        scents: None,
    };
    let state = seed_state(&template, now);

    let first_id = store.update_state(adventure_id, &state, OWNER).await.unwrap();
    let second_id = store.update_state(adventure_id, &state, OWNER).await.unwrap();
    assert_eq!(first_id, second_id, "upsert keeps a single row per adventure");

    let stored = store.get_state(adventure_id, OWNER).await.unwrap().unwrap();
    assert_eq!(stored.id, first_id);
    assert_eq!(stored.state, state);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_state_write_requires_ownership(pool: PgPool) {
    let (adventure_id, _) = seed_adventure(&pool).await;
    let store = PgAdventureStore::new(pool);
    let err = store
        .update_state(adventure_id, &Default::default(), STRANGER)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::NotFound { entity: "adventure", .. });
    assert!(store.get_state(adventure_id, STRANGER).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_protection_rules_load_in_priority_order(pool: PgPool) {
    for (path, level, priority) in [
        ("appearance", "guarded", 1),
        ("appearance.eyes.color", "immutable", 10),
        ("personality", "open", 1),
    ] {
        ProtectionRuleRepo::create(
            &pool,
            &CreateProtectionRule {
                field_path: path.into(),
                protection_level: level.into(),
                min_confidence: 0.5,
                priority,
            },
        )
        .await
        .unwrap();
    }

    let rules = PgProtectionRuleSource::new(pool).list_rules().await.unwrap();
    let paths: Vec<&str> = rules.iter().map(|r| r.field_path.as_str()).collect();
    assert_eq!(paths, ["appearance.eyes.color", "appearance", "personality"]);
    assert_eq!(rules[0].protection_level, ProtectionLevel::Immutable);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_protection_level_check_constraint(pool: PgPool) {
    let result = ProtectionRuleRepo::create(
        &pool,
        &CreateProtectionRule {
            field_path: "appearance".into(),
            protection_level: "locked".into(),
            min_confidence: 0.5,
            priority: 0,
        },
    )
    .await;
    assert!(result.is_err());
}
