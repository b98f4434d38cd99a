//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models — they carry no domain behaviour.
//! Domain types live in the `engine` crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// automation_rules
// ---------------------------------------------------------------------------

/// A persisted automation rule row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RuleRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: String,
    /// Event kind, e.g. `transaction.created`.
    pub trigger_type: String,
    pub priority: i32,
    pub enabled: bool,
    pub stop_on_first_match: bool,
    /// Full JSON rule graph (nodes + edges).
    pub graph: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// automation_execution_logs
// ---------------------------------------------------------------------------

/// A persisted execution log row. Rows are insert-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExecutionLogRow {
    pub id: Uuid,
    pub rule_id: Uuid,
    pub trigger_event: serde_json::Value,
    /// One of `success`, `partial`, `failed`, `skipped`.
    pub status: String,
    pub error_message: Option<String>,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}
