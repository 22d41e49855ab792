//! Adventure and adventure-state rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use storyloom_core::ports::AdventureRecord;
use storyloom_core::types::{DbId, Timestamp};

/// A row from the `adventures` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Adventure {
    pub id: DbId,
    pub user_id: DbId,
    pub character_id: DbId,
    pub title: String,
    pub adventure_type: Option<String>,
    pub character_name: String,
    pub player_name: String,
    pub setting: Option<serde_json::Value>,
    pub location: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Adventure> for AdventureRecord {
    fn from(row: Adventure) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            adventure_type: row.adventure_type,
            character_id: row.character_id,
            character_name: row.character_name,
            player_name: row.player_name,
            setting: row.setting,
            location: row.location,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAdventure {
    pub user_id: DbId,
    pub character_id: DbId,
    pub title: String,
    pub adventure_type: Option<String>,
    pub character_name: String,
    pub player_name: Option<String>,
    pub setting: Option<serde_json::Value>,
    pub location: Option<serde_json::Value>,
}

/// A row from the `adventure_character_states` table.
///
/// `state` holds a serialized `CharacterState`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AdventureCharacterState {
    pub id: DbId,
    pub adventure_id: DbId,
    pub state: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
