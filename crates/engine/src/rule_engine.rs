//! `RuleEngine`: the façade the API, CLI and worker pool talk to.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::EngineConfig;
use crate::dag::validate_rule;
use crate::error::{EngineError, ValidationError};
use crate::executor::RuleExecutor;
use crate::lock::RuleLocks;
use crate::models::{LogPage, Rule};
use crate::recorder::RuleRunner;
use crate::registry::ActionRegistry;
use crate::store::{ExecutionLogStore, PageRequest, RuleStore};

/// Cheap to clone; every clone shares stores, handlers and rule locks.
#[derive(Clone)]
pub struct RuleEngine {
    pub(crate) rules: Arc<dyn RuleStore>,
    pub(crate) logs: Arc<dyn ExecutionLogStore>,
    pub(crate) runner: RuleRunner,
}

impl RuleEngine {
    pub fn new(
        rules: Arc<dyn RuleStore>,
        logs: Arc<dyn ExecutionLogStore>,
        registry: ActionRegistry,
        config: &EngineConfig,
    ) -> Self {
        let executor = RuleExecutor::new(Arc::new(registry), config.action_timeout);
        let runner = RuleRunner::new(executor, RuleLocks::new(), Arc::clone(&logs));
        Self { rules, logs, runner }
    }

    /// Save-time check for a rule authored in the dashboard.
    pub fn validate(&self, rule: &Rule) -> Result<(), ValidationError> {
        validate_rule(rule).map(|_| ())
    }

    /// Paginated audit read of one rule's execution logs.
    pub async fn list_logs(&self, rule_id: Uuid, page: PageRequest) -> Result<LogPage, EngineError> {
        Ok(self.logs.list_logs(rule_id, page).await?)
    }
}
