//! Repository for the `characters` table.

use sqlx::PgPool;
use storyloom_core::types::DbId;

use crate::models::character::{Character, CreateCharacter};

/// Column list for `characters` queries.
const COLUMNS: &str = "id, user_id, name, appearance, personality, scents, created_at, updated_at";

pub struct CharacterRepo;

impl CharacterRepo {
    pub async fn create(pool: &PgPool, input: &CreateCharacter) -> Result<Character, sqlx::Error> {
        let query = format!(
            "INSERT INTO characters (user_id, name, appearance, personality, scents) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Character>(&query)
            .bind(input.user_id)
            .bind(&input.name)
            .bind(&input.appearance)
            .bind(&input.personality)
            .bind(&input.scents)
            .fetch_one(pool)
            .await
    }

    /// Find a character owned by `user_id`.
    pub async fn find_for_user(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Character>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM characters WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Character>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}
