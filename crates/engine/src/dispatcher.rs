//! Rule selection for incoming events.

use std::cmp::Reverse;

use tracing::{error, info, instrument};

use crate::context::EventContext;
use crate::error::EngineError;
use crate::models::{Event, ExecutionLog, ExecutionStatus, Rule};
use crate::rule_engine::RuleEngine;

impl RuleEngine {
    /// Run every enabled rule of the event's organization that listens for
    /// its trigger type, highest priority first.
    ///
    /// Returns one log per rule that ran. A rule with `stop_on_first_match`
    /// that did not end up `skipped` suppresses everything after it. Only a
    /// rule store failure is an error, and it aborts before any rule runs.
    #[instrument(skip_all, fields(event_type = %event.trigger_type, organization_id = %event.organization_id))]
    pub async fn dispatch(&self, event: &Event) -> Result<Vec<ExecutionLog>, EngineError> {
        let rules = self
            .rules
            .load_enabled_rules(event.organization_id, event.trigger_type)
            .await
            .map_err(|e| {
                error!(error = %e, "rule store unavailable, dispatch aborted");
                EngineError::from(e)
            })?;

        let rules = select_rules(rules, event);
        info!(candidates = rules.len(), "dispatching event");

        let ctx = EventContext::from_event(event);
        let mut logs = Vec::with_capacity(rules.len());

        for rule in &rules {
            let log = self.runner.run(rule, &ctx).await;
            let stop = rule.stop_on_first_match && log.status != ExecutionStatus::Skipped;
            logs.push(log);
            if stop {
                info!(rule_id = %rule.id, "stop_on_first_match rule matched, skipping remaining rules");
                break;
            }
        }

        Ok(logs)
    }
}

/// Keep the rules that apply to `event`, ordered by priority descending
/// and then rule ID ascending.
pub fn select_rules(rules: Vec<Rule>, event: &Event) -> Vec<Rule> {
    let mut selected: Vec<Rule> = rules
        .into_iter()
        .filter(|r| r.enabled && r.trigger_type == event.trigger_type && r.organization_id == event.organization_id)
        .collect();
    selected.sort_by_key(|r| (Reverse(r.priority), r.id));
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AutomationGraph, Node, TriggerType};
    use serde_json::json;
    use uuid::Uuid;

    fn rule(org: Uuid, tt: TriggerType, priority: i32) -> Rule {
        let graph = AutomationGraph::new().with_node("t", Node::trigger(tt));
        Rule::new(org, "r", tt, graph).with_priority(priority)
    }

    #[test]
    fn selection_orders_by_priority_then_id() {
        let org = Uuid::new_v4();
        let event = Event::new(TriggerType::TransactionCreated, org, json!({}));

        let low = rule(org, TriggerType::TransactionCreated, 1);
        let mut tie_a = rule(org, TriggerType::TransactionCreated, 5);
        let mut tie_b = rule(org, TriggerType::TransactionCreated, 5);
        if tie_b.id < tie_a.id {
            std::mem::swap(&mut tie_a, &mut tie_b);
        }
        let high = rule(org, TriggerType::TransactionCreated, 10);

        let ordered: Vec<Uuid> = select_rules(vec![low.clone(), tie_b.clone(), high.clone(), tie_a.clone()], &event)
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ordered, vec![high.id, tie_a.id, tie_b.id, low.id]);
    }

    #[test]
    fn selection_drops_rules_that_do_not_apply() {
        let org = Uuid::new_v4();
        let event = Event::new(TriggerType::TransactionCreated, org, json!({}));

        let other_type = rule(org, TriggerType::WebhookReceived, 1);
        let other_org = rule(Uuid::new_v4(), TriggerType::TransactionCreated, 1);
        let disabled = rule(org, TriggerType::TransactionCreated, 1).disabled();
        let kept = rule(org, TriggerType::TransactionCreated, 1);

        let selected = select_rules(vec![other_type, other_org, disabled, kept.clone()], &event);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, kept.id);
    }
}
