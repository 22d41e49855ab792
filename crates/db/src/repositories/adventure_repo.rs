//! Repository for `adventures` and `adventure_character_states`.

use sqlx::PgPool;
use storyloom_core::types::DbId;

use crate::models::adventure::{Adventure, AdventureCharacterState, CreateAdventure};

/// Column list for `adventures` queries.
const COLUMNS: &str = "\
    id, user_id, character_id, title, adventure_type, character_name, player_name, \
    setting, location, created_at, updated_at";

/// Column list for `adventure_character_states` queries, qualified with `s.`.
const STATE_COLUMNS: &str = "s.id, s.adventure_id, s.state, s.created_at, s.updated_at";

pub struct AdventureRepo;

impl AdventureRepo {
    pub async fn create(pool: &PgPool, input: &CreateAdventure) -> Result<Adventure, sqlx::Error> {
        let query = format!(
            "INSERT INTO adventures \
                (user_id, character_id, title, adventure_type, character_name, player_name, setting, location) \
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, 'Traveler'), $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Adventure>(&query)
            .bind(input.user_id)
            .bind(input.character_id)
            .bind(&input.title)
            .bind(&input.adventure_type)
            .bind(&input.character_name)
            .bind(&input.player_name)
            .bind(&input.setting)
            .bind(&input.location)
            .fetch_one(pool)
            .await
    }

    /// Find an adventure owned by `user_id`.
    pub async fn find_for_user(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Adventure>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM adventures WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Adventure>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Character state of an adventure owned by `user_id`.
    pub async fn find_state(
        pool: &PgPool,
        adventure_id: DbId,
        user_id: DbId,
    ) -> Result<Option<AdventureCharacterState>, sqlx::Error> {
        let query = format!(
            "SELECT {STATE_COLUMNS} FROM adventure_character_states s \
             JOIN adventures a ON a.id = s.adventure_id \
             WHERE s.adventure_id = $1 AND a.user_id = $2"
        );
        sqlx::query_as::<_, AdventureCharacterState>(&query)
            .bind(adventure_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert or replace the state row of an adventure owned by `user_id`.
    ///
    /// Single-row upsert; concurrent writers are last-writer-wins. Returns
    /// `None` when the adventure does not belong to `user_id`.
    pub async fn upsert_state(
        pool: &PgPool,
        adventure_id: DbId,
        state: &serde_json::Value,
        user_id: DbId,
    ) -> Result<Option<DbId>, sqlx::Error> {
        let row: Option<(DbId,)> = sqlx::query_as(
            "INSERT INTO adventure_character_states (adventure_id, state) \
             SELECT a.id, $2 FROM adventures a WHERE a.id = $1 AND a.user_id = $3 \
             ON CONFLICT (adventure_id) DO UPDATE \
                SET state = EXCLUDED.state, updated_at = NOW() \
             RETURNING id",
        )
        .bind(adventure_id)
        .bind(state)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|(id,)| id))
    }
}
