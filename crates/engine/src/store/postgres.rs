//! Postgres-backed stores: thin adapters between `db` rows and domain types.

use async_trait::async_trait;
use db::models::{ExecutionLogRow, RuleRow};
use db::repository::{executions as log_repo, rules as rule_repo};
use db::{DbError, DbPool};
use tracing::error;
use uuid::Uuid;

use super::{ExecutionLogStore, PageRequest, RuleStore};
use crate::error::StoreError;
use crate::models::{AutomationGraph, ExecutionLog, LogPage, Rule, TriggerType};

fn store_error(err: DbError) -> StoreError {
    if err.is_unavailable() {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Database(err)
    }
}

/// Decode a rule row. A bad `graph` or `trigger_type` does not drop the rule:
/// it comes back with `definition_error` set so it still gets a log.
/// `trigger_hint` stands in for an unparseable trigger type; without one the
/// row is unusable.
fn rule_from_row(row: RuleRow, trigger_hint: Option<TriggerType>) -> Result<Rule, StoreError> {
    let mut problems = Vec::new();

    let trigger_type = match row.trigger_type.parse::<TriggerType>() {
        Ok(tt) => tt,
        Err(reason) => match trigger_hint {
            Some(tt) => {
                problems.push(reason);
                tt
            }
            None => return Err(StoreError::Corrupt { rule_id: row.id, reason }),
        },
    };
    let graph = match serde_json::from_value::<AutomationGraph>(row.graph) {
        Ok(graph) => graph,
        Err(e) => {
            problems.push(format!("graph: {e}"));
            AutomationGraph::default()
        }
    };

    let definition_error = if problems.is_empty() {
        None
    } else {
        let reason = problems.join("; ");
        error!(rule_id = %row.id, %reason, "rule definition could not be decoded");
        Some(reason)
    };

    Ok(Rule {
        id: row.id,
        organization_id: row.organization_id,
        name: row.name,
        description: row.description,
        trigger_type,
        priority: row.priority,
        enabled: row.enabled,
        stop_on_first_match: row.stop_on_first_match,
        graph,
        definition_error,
    })
}

fn log_from_row(row: ExecutionLogRow) -> Result<ExecutionLog, StoreError> {
    let status = row.status.parse().map_err(|reason| StoreError::Corrupt {
        rule_id: row.rule_id,
        reason,
    })?;

    Ok(ExecutionLog {
        id: row.id,
        rule_id: row.rule_id,
        trigger_event: row.trigger_event,
        status,
        error_message: row.error_message,
        duration_ms: u64::try_from(row.duration_ms).unwrap_or(0),
        created_at: row.created_at,
    })
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Loads rules from the `automation_rules` table.
#[derive(Debug, Clone)]
pub struct PostgresRuleStore {
    pool: DbPool,
}

impl PostgresRuleStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleStore for PostgresRuleStore {
    async fn load_rule(&self, id: Uuid) -> Result<Option<Rule>, StoreError> {
        match rule_repo::get_rule(&self.pool, id).await {
            Ok(row) => rule_from_row(row, None).map(Some),
            Err(DbError::NotFound { .. }) => Ok(None),
            Err(e) => Err(store_error(e)),
        }
    }

    async fn load_enabled_rules(
        &self,
        organization_id: Uuid,
        trigger_type: TriggerType,
    ) -> Result<Vec<Rule>, StoreError> {
        let rows = rule_repo::list_enabled_rules(&self.pool, organization_id, trigger_type.as_str())
            .await
            .map_err(store_error)?;

        // The query filtered on the trigger type, so it can stand in for an
        // unparseable column value.
        rows.into_iter()
            .map(|row| rule_from_row(row, Some(trigger_type)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Execution logs
// ---------------------------------------------------------------------------

/// Appends to and pages through the `automation_execution_logs` table.
#[derive(Debug, Clone)]
pub struct PostgresLogStore {
    pool: DbPool,
}

impl PostgresLogStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExecutionLogStore for PostgresLogStore {
    async fn write_log(&self, log: &ExecutionLog) -> Result<(), StoreError> {
        let row = ExecutionLogRow {
            id: log.id,
            rule_id: log.rule_id,
            trigger_event: log.trigger_event.clone(),
            status: log.status.to_string(),
            error_message: log.error_message.clone(),
            duration_ms: i64::try_from(log.duration_ms).unwrap_or(i64::MAX),
            created_at: log.created_at,
        };
        log_repo::insert_execution_log(&self.pool, &row)
            .await
            .map_err(store_error)
    }

    async fn list_logs(&self, rule_id: Uuid, page: PageRequest) -> Result<LogPage, StoreError> {
        let page = page.normalized();
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);

        let rows = log_repo::list_execution_logs(&self.pool, rule_id, i64::from(page.per_page), offset)
            .await
            .map_err(store_error)?;
        let total = log_repo::count_execution_logs(&self.pool, rule_id)
            .await
            .map_err(store_error)?;

        Ok(LogPage {
            items: rows.into_iter().map(log_from_row).collect::<Result<_, _>>()?,
            page: page.page,
            per_page: page.per_page,
            total: u64::try_from(total).unwrap_or(0),
        })
    }
}
