//! Repository for the `field_protection_rules` table.

use sqlx::PgPool;

use crate::models::protection_rule::{CreateProtectionRule, FieldProtectionRule};

/// Column list for `field_protection_rules` queries.
const COLUMNS: &str =
    "id, field_path, protection_level, min_confidence, priority, created_at, updated_at";

pub struct ProtectionRuleRepo;

impl ProtectionRuleRepo {
    /// All rules, highest priority first.
    pub async fn list(pool: &PgPool) -> Result<Vec<FieldProtectionRule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM field_protection_rules \
             ORDER BY priority DESC, LENGTH(field_path) DESC, field_path ASC"
        );
        sqlx::query_as::<_, FieldProtectionRule>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn create(
        pool: &PgPool,
        input: &CreateProtectionRule,
    ) -> Result<FieldProtectionRule, sqlx::Error> {
        let query = format!(
            "INSERT INTO field_protection_rules (field_path, protection_level, min_confidence, priority) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FieldProtectionRule>(&query)
            .bind(&input.field_path)
            .bind(&input.protection_level)
            .bind(input.min_confidence)
            .bind(input.priority)
            .fetch_one(pool)
            .await
    }
}
