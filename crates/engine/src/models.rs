//! Core domain models for the rule engine.
//!
//! These types are the source of truth for what a rule looks like in memory.
//! They serialise to/from the JSON the dashboard saves and the JSONB
//! `graph` column of the `automation_rules` table.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub use actions::ActionType;

// ---------------------------------------------------------------------------
// TriggerType
// ---------------------------------------------------------------------------

/// The kinds of business event a rule can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerType {
    #[serde(rename = "transaction.created")]
    TransactionCreated,
    #[serde(rename = "transaction.updated")]
    TransactionUpdated,
    #[serde(rename = "webhook.received")]
    WebhookReceived,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransactionCreated => "transaction.created",
            Self::TransactionUpdated => "transaction.updated",
            Self::WebhookReceived    => "webhook.received",
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TriggerType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transaction.created" => Ok(Self::TransactionCreated),
            "transaction.updated" => Ok(Self::TransactionUpdated),
            "webhook.received"    => Ok(Self::WebhookReceived),
            other                 => Err(format!("unknown trigger type: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// How the leaf conditions of a group are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOperator {
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

/// Comparison applied by a single leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    InList,
    NotInList,
    IsEmpty,
    IsNotEmpty,
    Regex,
    Before,
    After,
    Between,
    DayOfMonth,
    DayOfWeek,
    IsWeekend,
    IsBusinessDay,
}

/// A single field comparison, e.g. `amount gt 100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Dotted path into the event payload (`merchant.name`).
    pub field: String,
    pub operator: ConditionOperator,
    /// Comparison operand. Unused by the unary operators.
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
        Self { field: field.into(), operator, value }
    }
}

/// AND/OR combination of leaf conditions gating a condition node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    pub operator: LogicalOperator,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// Root of a rule graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerNode {
    pub trigger_type: TriggerType,
    /// Optional filter, e.g. `{ "source": "stripe" }` for webhooks.
    #[serde(default)]
    pub config: Value,
}

/// A side-effecting step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionNode {
    pub action_type: ActionType,
    #[serde(default)]
    pub config: Value,
    /// Keep traversing past this node when it fails.
    #[serde(default)]
    pub continue_on_error: bool,
}

impl ActionNode {
    pub fn new(action_type: ActionType, config: Value) -> Self {
        Self { action_type, config, continue_on_error: false }
    }

    pub fn continue_on_error(mut self) -> Self {
        self.continue_on_error = true;
        self
    }
}

/// A step in a rule graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Trigger(TriggerNode),
    Condition(ConditionGroup),
    Action(ActionNode),
}

impl Node {
    pub fn trigger(trigger_type: TriggerType) -> Self {
        Self::Trigger(TriggerNode { trigger_type, config: Value::Null })
    }

    pub fn condition(operator: LogicalOperator, conditions: Vec<Condition>) -> Self {
        Self::Condition(ConditionGroup { operator, conditions })
    }

    pub fn action(action_type: ActionType, config: Value) -> Self {
        Self::Action(ActionNode::new(action_type, config))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Trigger(_)   => "trigger",
            Self::Condition(_) => "condition",
            Self::Action(_)    => "action",
        }
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// Directed edge from one node to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

/// Arena representation of a rule graph: nodes by ID plus an edge list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutomationGraph {
    pub nodes: BTreeMap<String, Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl AutomationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a node.
    pub fn with_node(mut self, id: impl Into<String>, node: Node) -> Self {
        self.nodes.insert(id.into(), node);
        self
    }

    /// Append an edge.
    pub fn with_edge(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.edges.push(Edge { source: source.into(), target: target.into() });
        self
    }

    /// IDs of every trigger node, in ID order.
    pub fn trigger_ids(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(_, n)| matches!(n, Node::Trigger(_)))
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Every action node in the graph.
    pub fn actions(&self) -> impl Iterator<Item = (&str, &ActionNode)> {
        self.nodes.iter().filter_map(|(id, n)| match n {
            Node::Action(a) => Some((id.as_str(), a)),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A named, prioritised automation owning one trigger-rooted graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub trigger_type: TriggerType,
    /// Higher runs first.
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub stop_on_first_match: bool,
    pub graph: AutomationGraph,
    /// Set by a store when the stored definition could not be decoded. The
    /// rule still takes its place in dispatch order but is logged `failed`.
    #[serde(skip)]
    pub definition_error: Option<String>,
}

fn enabled_by_default() -> bool {
    true
}

impl Rule {
    /// Convenience constructor: enabled, priority 0, no `stop_on_first_match`.
    pub fn new(
        organization_id: Uuid,
        name: impl Into<String>,
        trigger_type: TriggerType,
        graph: AutomationGraph,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            name: name.into(),
            description: String::new(),
            trigger_type,
            priority: 0,
            enabled: true,
            stop_on_first_match: false,
            graph,
            definition_error: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn stop_on_first_match(mut self) -> Self {
        self.stop_on_first_match = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A typed business occurrence that may trigger rule evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(alias = "type")]
    pub trigger_type: TriggerType,
    pub organization_id: Uuid,
    #[serde(default)]
    pub payload: Value,
}

impl Event {
    pub fn new(trigger_type: TriggerType, organization_id: Uuid, payload: Value) -> Self {
        Self { trigger_type, organization_id, payload }
    }
}

// ---------------------------------------------------------------------------
// Execution log
// ---------------------------------------------------------------------------

/// Aggregate outcome of one rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Partial,
    Failed,
    Skipped,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Partial => write!(f, "partial"),
            Self::Failed  => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "partial" => Ok(Self::Partial),
            "failed"  => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            other     => Err(format!("unknown execution status: {other}")),
        }
    }
}

/// Immutable audit record of one rule evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLog {
    pub id: Uuid,
    pub rule_id: Uuid,
    /// Snapshot of the payload the rule was evaluated against.
    pub trigger_event: Value,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// One page of execution logs, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPage {
    pub items: Vec<ExecutionLog>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_kind_matches_serde_tag() {
        let nodes = [
            Node::trigger(TriggerType::WebhookReceived),
            Node::condition(LogicalOperator::Or, vec![]),
            Node::action(ActionType::AddTag, json!({})),
        ];
        for node in nodes {
            let value = serde_json::to_value(&node).unwrap();
            assert_eq!(value["kind"], node.kind());
        }
    }

    #[test]
    fn node_json_uses_kind_tag_and_camel_case_fields() {
        let node: Node = serde_json::from_value(json!({
            "kind": "action",
            "actionType": "set_category",
            "config": { "category": "travel" },
            "continueOnError": true
        }))
        .unwrap();

        assert_eq!(
            node,
            Node::Action(
                ActionNode::new(ActionType::SetCategory, json!({ "category": "travel" }))
                    .continue_on_error()
            )
        );
    }

    #[test]
    fn rule_defaults_apply_when_fields_are_missing() {
        let rule: Rule = serde_json::from_value(json!({
            "id": Uuid::nil(),
            "organizationId": Uuid::nil(),
            "name": "coffee",
            "triggerType": "transaction.created",
            "graph": {
                "nodes": { "t": { "kind": "trigger", "triggerType": "transaction.created" } }
            }
        }))
        .unwrap();

        assert!(rule.enabled);
        assert!(!rule.stop_on_first_match);
        assert_eq!(rule.priority, 0);
        assert!(rule.graph.edges.is_empty());
        assert_eq!(rule.graph.trigger_ids(), vec!["t"]);
    }

    #[test]
    fn event_accepts_type_alias() {
        let event: Event = serde_json::from_value(json!({
            "type": "transaction.created",
            "organizationId": Uuid::nil(),
            "payload": { "amount": 150 }
        }))
        .unwrap();
        assert_eq!(event.trigger_type, TriggerType::TransactionCreated);
        assert_eq!(event.payload["amount"], 150);
    }

    #[test]
    fn logical_operator_accepts_both_cases() {
        let upper: LogicalOperator = serde_json::from_value(json!("AND")).unwrap();
        let lower: LogicalOperator = serde_json::from_value(json!("or")).unwrap();
        assert_eq!(upper, LogicalOperator::And);
        assert_eq!(lower, LogicalOperator::Or);
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            ExecutionStatus::Success,
            ExecutionStatus::Partial,
            ExecutionStatus::Failed,
            ExecutionStatus::Skipped,
        ] {
            assert_eq!(status.to_string().parse::<ExecutionStatus>().unwrap(), status);
        }
    }
}
