//! Field protection rule rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use storyloom_core::error::CoreError;
use storyloom_core::protection::ProtectionRule;
use storyloom_core::types::{DbId, Timestamp};

/// A row from the `field_protection_rules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FieldProtectionRule {
    pub id: DbId,
    pub field_path: String,
    pub protection_level: String,
    pub min_confidence: f64,
    pub priority: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<FieldProtectionRule> for ProtectionRule {
    type Error = CoreError;

    fn try_from(row: FieldProtectionRule) -> Result<Self, Self::Error> {
        Ok(Self {
            protection_level: row.protection_level.parse()?,
            field_path: row.field_path,
            min_confidence: row.min_confidence,
            priority: row.priority,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProtectionRule {
    pub field_path: String,
    pub protection_level: String,
    pub min_confidence: f64,
    pub priority: i32,
}
