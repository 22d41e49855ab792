//! Stored trait embeddings.

use serde::Serialize;
use sqlx::FromRow;
use storyloom_core::types::{DbId, Timestamp};

/// A row from the `trait_embeddings` table (excludes the `embedding` vector).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TraitEmbedding {
    pub id: DbId,
    pub adventure_character_id: DbId,
    pub trait_type: String,
    pub trait_path: String,
    pub trait_value: String,
    pub model: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateTraitEmbedding {
    pub adventure_character_id: DbId,
    pub trait_type: String,
    pub trait_path: String,
    pub trait_value: String,
    pub model: String,
    pub embedding: Vec<f32>,
}
