//! Storage seams: where rules come from and where execution logs go.
//!
//! The engine only *reads* rules and only *appends* logs. Two backends are
//! provided: [`memory`] for tests and offline runs, [`postgres`] on top of the
//! `db` crate.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{ExecutionLog, LogPage, Rule, TriggerType};

pub use memory::{InMemoryLogStore, InMemoryRuleStore};
pub use postgres::{PostgresLogStore, PostgresRuleStore};

/// Read-only access to rule definitions.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Load one rule regardless of its `enabled` flag.
    async fn load_rule(&self, id: Uuid) -> Result<Option<Rule>, StoreError>;

    /// Load the enabled rules of `organization_id` listening for `trigger_type`.
    /// Order is not guaranteed; the dispatcher sorts.
    async fn load_enabled_rules(
        &self,
        organization_id: Uuid,
        trigger_type: TriggerType,
    ) -> Result<Vec<Rule>, StoreError>;
}

/// Append-only execution log sink plus the paginated audit read.
#[async_trait]
pub trait ExecutionLogStore: Send + Sync {
    async fn write_log(&self, log: &ExecutionLog) -> Result<(), StoreError>;

    /// Logs of one rule, newest first.
    async fn list_logs(&self, rule_id: Uuid, page: PageRequest) -> Result<LogPage, StoreError>;
}

/// 1-based page selector for log queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default = "PageRequest::first_page")]
    pub page: u32,
    #[serde(default = "PageRequest::default_per_page")]
    pub per_page: u32,
}

impl PageRequest {
    pub const MAX_PER_PAGE: u32 = 100;

    fn first_page() -> u32 {
        1
    }

    fn default_per_page() -> u32 {
        20
    }

    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    /// Clamp to `page >= 1` and `1 <= per_page <= MAX_PER_PAGE`.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(Self::first_page(), Self::default_per_page())
    }
}
