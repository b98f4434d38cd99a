//! Manual trigger gateway.

use serde_json::{Map, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::context::EventContext;
use crate::error::EngineError;
use crate::models::ExecutionLog;
use crate::rule_engine::RuleEngine;

impl RuleEngine {
    /// Run one rule on demand against a caller-supplied context (default `{}`).
    ///
    /// The trigger node's filter is bypassed; conditions still apply. Disabled
    /// rules are rejected without writing a log.
    #[instrument(skip_all, fields(rule_id = %rule_id))]
    pub async fn trigger_manually(&self, rule_id: Uuid, context: Option<Value>) -> Result<ExecutionLog, EngineError> {
        let rule = self
            .rules
            .load_rule(rule_id)
            .await?
            .ok_or(EngineError::RuleNotFound(rule_id))?;

        if !rule.enabled {
            warn!("manual trigger rejected, rule is disabled");
            return Err(EngineError::RuleDisabled(rule_id));
        }

        let payload = context.unwrap_or_else(|| Value::Object(Map::new()));
        let ctx = EventContext::manual(rule.organization_id, payload);
        let log = self.runner.run(&rule, &ctx).await;

        info!(status = %log.status, "manual trigger finished");
        Ok(log)
    }
}
