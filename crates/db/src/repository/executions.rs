//! Execution log repository functions.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, models::ExecutionLogRow};

/// Insert one execution log row. Logs are never updated afterwards.
pub async fn insert_execution_log(pool: &PgPool, row: &ExecutionLogRow) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO automation_execution_logs
            (id, rule_id, trigger_event, status, error_message, duration_ms, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(row.id)
    .bind(row.rule_id)
    .bind(&row.trigger_event)
    .bind(&row.status)
    .bind(&row.error_message)
    .bind(row.duration_ms)
    .bind(row.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// One page of a rule's logs, newest first.
pub async fn list_execution_logs(
    pool: &PgPool,
    rule_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<ExecutionLogRow>, DbError> {
    let rows = sqlx::query_as::<_, ExecutionLogRow>(
        r#"
        SELECT id, rule_id, trigger_event, status, error_message, duration_ms, created_at
        FROM automation_execution_logs
        WHERE rule_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(rule_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Total number of logs recorded for a rule.
pub async fn count_execution_logs(pool: &PgPool, rule_id: Uuid) -> Result<i64, DbError> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM automation_execution_logs WHERE rule_id = $1")
            .bind(rule_id)
            .fetch_one(pool)
            .await?;

    Ok(count)
}
