//! Dry-run action handler that only records the call in the trace log.
//!
//! The bundled binary registers it for every external action type, so rule
//! graphs can be exercised without wiring up real side effects.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::{ActionContext, ActionError, ActionHandler, ActionType};

/// Succeeds for every call after emitting an `info` event.
pub struct LoggingAction {
    action_type: ActionType,
}

impl LoggingAction {
    pub fn new(action_type: ActionType) -> Self {
        Self { action_type }
    }
}

#[async_trait]
impl ActionHandler for LoggingAction {
    async fn execute(&self, config: &Value, ctx: &ActionContext) -> Result<(), ActionError> {
        info!(
            rule_id = %ctx.rule_id,
            node_id = %ctx.node_id,
            action = %self.action_type,
            %config,
            "action executed (dry run)"
        );
        Ok(())
    }

    fn is_idempotent(&self) -> bool {
        true
    }
}
