//! Library character rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use storyloom_core::merge::CharacterTemplate;
use storyloom_core::types::{DbId, Timestamp};

/// A row from the `characters` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Character {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub appearance: Option<String>,
    pub personality: Option<String>,
    pub scents: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Character> for CharacterTemplate {
    fn from(row: Character) -> Self {
        Self {
            name: row.name,
            appearance: row.appearance,
            personality: row.personality,
            scents: row.scents,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCharacter {
    pub user_id: DbId,
    pub name: String,
    pub appearance: Option<String>,
    pub personality: Option<String>,
    pub scents: Option<String>,
}
