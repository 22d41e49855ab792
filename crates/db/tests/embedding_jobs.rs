use assert_matches::assert_matches;
use sqlx::PgPool;
use storyloom_core::embedding_job::{EmbeddingJobPayload, EmbeddingJobStatus};
use storyloom_core::ports::JobQueue;
use storyloom_db::adapters::PgJobQueue;
use storyloom_db::models::adventure::CreateAdventure;
use storyloom_db::models::character::CreateCharacter;
use storyloom_db::repositories::{AdventureRepo, CharacterRepo, EmbeddingJobRepo};

const USER: i64 = 7;

/// Create a character, an adventure and an empty state row. Returns the
/// state row id embedding jobs hang off.
async fn seed_state_row(pool: &PgPool) -> i64 {
    let character = CharacterRepo::create(
        pool,
        &CreateCharacter {
            user_id: USER,
            name: "Mira".into(),
            appearance: Some("Long silver hair".into()),
            personality: None,
            scents: None,
        },
    )
    .await
    .unwrap();
    let adventure = AdventureRepo::create(
        pool,
        &CreateAdventure {
            user_id: USER,
            character_id: character.id,
            title: "The Lantern Road".into(),
            adventure_type: Some("romance".into()),
            character_name: "Mira".into(),
            player_name: None,
            setting: None,
            location: None,
        },
    )
    .await
    .unwrap();
    AdventureRepo::upsert_state(pool, adventure.id, &serde_json::json!({}), USER)
        .await
        .unwrap()
        .unwrap()
}

fn payload(state_id: i64, path: &str) -> EmbeddingJobPayload {
    EmbeddingJobPayload {
        adventure_character_id: state_id,
        trait_type: "appearance".into(),
        trait_path: path.into(),
        trait_value: "silver".into(),
        context: "Her hair is now silver.".into(),
    }
}

async fn set_status_age(pool: &PgPool, job_id: i64, status: EmbeddingJobStatus, days: i32) {
    sqlx::query(
        "UPDATE embedding_jobs SET status_id = $2, completed_at = NOW() - make_interval(days => $3) \
         WHERE id = $1",
    )
    .bind(job_id)
    .bind(status.id())
    .bind(days)
    .execute(pool)
    .await
    .unwrap();
}

#[sqlx::test(migrations = "./migrations")]
async fn test_claim_moves_job_to_running(pool: PgPool) {
    let state_id = seed_state_row(&pool).await;
    let queue = PgJobQueue::new(pool.clone());
    let first = queue
        .create_embedding_job(&payload(state_id, "appearance.hair.color"))
        .await
        .unwrap();
    let second = queue
        .create_embedding_job(&payload(state_id, "appearance.eyes.color"))
        .await
        .unwrap();

    let peeked = queue.peek_next_job().await.unwrap().unwrap();
    assert_eq!(peeked.id, first);
    assert_eq!(peeked.status, EmbeddingJobStatus::Pending);

    let claimed = queue.get_next_pending_job().await.unwrap().unwrap();
    assert_eq!(claimed.id, first);
    assert_eq!(claimed.status, EmbeddingJobStatus::Running);
    assert_eq!(claimed.attempts, 1);
    assert!(claimed.started_at.is_some());

    let next = queue.get_next_pending_job().await.unwrap().unwrap();
    assert_eq!(next.id, second);
    assert!(queue.get_next_pending_job().await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_failure_retries_then_gives_up(pool: PgPool) {
    let state_id = seed_state_row(&pool).await;
    let queue = PgJobQueue::new(pool.clone());
    let id = queue
        .create_embedding_job(&payload(state_id, "appearance.hair.color"))
        .await
        .unwrap();

    queue.get_next_pending_job().await.unwrap().unwrap();
    let status = queue.mark_failed(id, "timeout").await.unwrap();
    assert_eq!(status, EmbeddingJobStatus::Retrying);

    // Backoff pushes the retry into the future.
    assert!(queue.get_next_pending_job().await.unwrap().is_none());
    let row = EmbeddingJobRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(row.last_error.as_deref(), Some("timeout"));
    assert!(row.scheduled_at > row.created_at);

    // Exhaust the remaining attempts.
    sqlx::query("UPDATE embedding_jobs SET attempts = max_attempts WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();
    let status = queue.mark_failed(id, "timeout again").await.unwrap();
    assert_eq!(status, EmbeddingJobStatus::Failed);
    let row = EmbeddingJobRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert!(row.completed_at.is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_mark_failed_unknown_job_is_not_found(pool: PgPool) {
    let queue = PgJobQueue::new(pool);
    let err = queue.mark_failed(9999, "boom").await.unwrap_err();
    assert_matches!(
        err,
        storyloom_core::error::CoreError::NotFound {
            entity: "embedding_job",
            ..
        }
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_completion_and_events(pool: PgPool) {
    let state_id = seed_state_row(&pool).await;
    let queue = PgJobQueue::new(pool.clone());
    let id = queue
        .create_embedding_job(&payload(state_id, "appearance.hair.color"))
        .await
        .unwrap();
    queue.get_next_pending_job().await.unwrap().unwrap();
    queue
        .log_event(id, "job_started", "Started", serde_json::json!({}))
        .await
        .unwrap();
    queue.mark_completed(id).await.unwrap();
    queue
        .log_event(id, "job_completed", "Done", serde_json::json!({"elapsed_ms": 12}))
        .await
        .unwrap();

    let row = EmbeddingJobRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(row.status_id, EmbeddingJobStatus::Completed.id());

    let events = EmbeddingJobRepo::list_events(&pool, id).await.unwrap();
    let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(types, ["job_started", "job_completed"]);
    assert_eq!(events[1].metadata["elapsed_ms"], 12);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_stats_count_per_status(pool: PgPool) {
    let state_id = seed_state_row(&pool).await;
    let queue = PgJobQueue::new(pool.clone());
    for path in ["a", "b", "c"] {
        queue.create_embedding_job(&payload(state_id, path)).await.unwrap();
    }
    let claimed = queue.get_next_pending_job().await.unwrap().unwrap();
    queue.mark_completed(claimed.id).await.unwrap();
    queue.get_next_pending_job().await.unwrap().unwrap();

    let stats = queue.get_stats().await.unwrap();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.running, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.total(), 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cleanup_deletes_only_old_terminal_jobs(pool: PgPool) {
    let state_id = seed_state_row(&pool).await;
    let queue = PgJobQueue::new(pool.clone());
    let old = queue.create_embedding_job(&payload(state_id, "a")).await.unwrap();
    let recent = queue.create_embedding_job(&payload(state_id, "b")).await.unwrap();
    let pending = queue.create_embedding_job(&payload(state_id, "c")).await.unwrap();
    set_status_age(&pool, old, EmbeddingJobStatus::Completed, 10).await;
    set_status_age(&pool, recent, EmbeddingJobStatus::Completed, 3).await;

    let deleted = queue.cleanup_old_jobs(7).await.unwrap();
    assert_eq!(deleted, 1);

    assert!(EmbeddingJobRepo::find_by_id(&pool, old).await.unwrap().is_none());
    assert!(EmbeddingJobRepo::find_by_id(&pool, recent).await.unwrap().is_some());
    assert!(EmbeddingJobRepo::find_by_id(&pool, pending).await.unwrap().is_some());
}
