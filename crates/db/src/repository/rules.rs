//! Rule reads. Rule CRUD belongs to the dashboard backend; the engine only
//! ever loads rules.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, models::RuleRow};

const RULE_COLUMNS: &str = r#"
    id, organization_id, name, description, trigger_type, priority,
    enabled, stop_on_first_match, graph, created_at, updated_at
"#;

/// Fetch a single rule by its primary key, enabled or not.
pub async fn get_rule(pool: &PgPool, id: Uuid) -> Result<RuleRow, DbError> {
    let sql = format!("SELECT {RULE_COLUMNS} FROM automation_rules WHERE id = $1");

    sqlx::query_as::<_, RuleRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound { table: "automation_rules", id })
}

/// Return the enabled rules of one organization for one trigger type,
/// highest priority first (ties by id).
pub async fn list_enabled_rules(
    pool: &PgPool,
    organization_id: Uuid,
    trigger_type: &str,
) -> Result<Vec<RuleRow>, DbError> {
    let sql = format!(
        r#"
        SELECT {RULE_COLUMNS}
        FROM automation_rules
        WHERE organization_id = $1 AND trigger_type = $2 AND enabled
        ORDER BY priority DESC, id ASC
        "#
    );

    let rows = sqlx::query_as::<_, RuleRow>(&sql)
        .bind(organization_id)
        .bind(trigger_type)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
