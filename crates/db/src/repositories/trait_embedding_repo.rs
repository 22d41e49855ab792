//! Repository for the `trait_embeddings` table.
//!
//! The `embedding` column is an unsized pgvector `vector`. Runtime queries
//! pass it as a text literal (`'[0.1,0.2]'`) cast in SQL.

use sqlx::PgPool;
use storyloom_core::types::DbId;

use crate::models::trait_embedding::{CreateTraitEmbedding, TraitEmbedding};

/// Column list for `trait_embeddings` queries (excludes the `embedding` vector).
const COLUMNS: &str = "\
    id, adventure_character_id, trait_type, trait_path, trait_value, model, \
    created_at, updated_at";

pub struct TraitEmbeddingRepo;

impl TraitEmbeddingRepo {
    /// Store the embedding for one trait path, replacing any previous one.
    pub async fn upsert(pool: &PgPool, input: &CreateTraitEmbedding) -> Result<DbId, sqlx::Error> {
        let row: (DbId,) = sqlx::query_as(
            "INSERT INTO trait_embeddings \
                (adventure_character_id, trait_type, trait_path, trait_value, model, embedding) \
             VALUES ($1, $2, $3, $4, $5, $6::vector) \
             ON CONFLICT (adventure_character_id, trait_path) DO UPDATE SET \
                trait_type = EXCLUDED.trait_type, \
                trait_value = EXCLUDED.trait_value, \
                model = EXCLUDED.model, \
                embedding = EXCLUDED.embedding, \
                updated_at = NOW() \
             RETURNING id",
        )
        .bind(input.adventure_character_id)
        .bind(&input.trait_type)
        .bind(&input.trait_path)
        .bind(&input.trait_value)
        .bind(&input.model)
        .bind(vector_literal(&input.embedding))
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    pub async fn list_for_state(
        pool: &PgPool,
        adventure_character_id: DbId,
    ) -> Result<Vec<TraitEmbedding>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM trait_embeddings \
             WHERE adventure_character_id = $1 ORDER BY trait_path"
        );
        sqlx::query_as::<_, TraitEmbedding>(&query)
            .bind(adventure_character_id)
            .fetch_all(pool)
            .await
    }
}

/// pgvector text form of an embedding.
pub fn vector_literal(values: &[f32]) -> String {
    format!(
        "[{}]",
        values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_literal_format() {
        assert_eq!(vector_literal(&[0.5, -1.0, 2.25]), "[0.5,-1,2.25]");
        assert_eq!(vector_literal(&[]), "[]");
    }
}
