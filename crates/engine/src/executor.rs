//! Rule graph traversal.
//!
//! `RuleExecutor` walks a validated rule graph from its trigger:
//! 1. A node becomes runnable once every predecessor has settled.
//! 2. An edge is *live* when its source passed (trigger matched, condition
//!    held, action succeeded or failed with `continue_on_error`). A node whose
//!    incoming edges are all dead is pruned and never visited.
//! 3. Runnable action nodes run concurrently, each bounded by the action
//!    timeout; conditions are evaluated inline.
//! 4. A successful `stop_execution` halts the traversal: in-flight actions
//!    finish, nothing new starts, every unvisited node becomes `Halted`.
//!
//! Failures never escape as errors; they are node outcomes folded into an
//! [`ExecutionStatus`] once every branch has settled.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use actions::{ActionContext, ActionError};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::condition::{self, lookup, loosely_equal};
use crate::context::{EventContext, Invocation};
use crate::models::{ActionNode, AutomationGraph, ExecutionStatus, Node, Rule, TriggerNode};
use crate::registry::ActionRegistry;

// ---------------------------------------------------------------------------
// Node outcomes
// ---------------------------------------------------------------------------

/// Where a single node ended up after a traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NodeOutcome {
    /// Never visited: not reached, or every path into it was pruned.
    Pending,
    /// Trigger matched / condition held.
    Satisfied,
    /// Trigger filter or condition did not hold; outgoing edges pruned.
    Skipped,
    /// Action completed.
    Succeeded,
    /// Action failed. `continued` records whether traversal went on past it.
    Failed { message: String, continued: bool },
    /// Not visited when `stop_execution` fired.
    Halted,
}

impl NodeOutcome {
    /// Whether the node's outgoing edges are live.
    fn passes(&self) -> bool {
        match self {
            Self::Satisfied | Self::Succeeded => true,
            Self::Failed { continued, .. } => *continued,
            Self::Pending | Self::Skipped | Self::Halted => false,
        }
    }
}

/// Everything a traversal produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraversalReport {
    pub status: ExecutionStatus,
    /// First action failure, in completion order.
    pub error_message: Option<String>,
    pub halted: bool,
    pub outcomes: BTreeMap<String, NodeOutcome>,
}

impl TraversalReport {
    /// Report for a rule that was never traversed.
    pub fn rejected(rule: &Rule, message: String) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            error_message: Some(message),
            halted: false,
            outcomes: rule
                .graph
                .nodes
                .keys()
                .map(|id| (id.clone(), NodeOutcome::Pending))
                .collect(),
        }
    }

    pub fn outcome(&self, node_id: &str) -> Option<&NodeOutcome> {
        self.outcomes.get(node_id)
    }
}

/// Fold action outcomes into the rule status.
pub fn aggregate_status(graph: &AutomationGraph, outcomes: &BTreeMap<String, NodeOutcome>) -> ExecutionStatus {
    let mut visited = false;
    let mut continued_failure = false;

    for (id, _) in graph.actions() {
        match outcomes.get(id) {
            Some(NodeOutcome::Succeeded) => visited = true,
            Some(NodeOutcome::Failed { continued: false, .. }) => return ExecutionStatus::Failed,
            Some(NodeOutcome::Failed { continued: true, .. }) => {
                visited = true;
                continued_failure = true;
            }
            _ => {}
        }
    }

    match (visited, continued_failure) {
        (_, true) => ExecutionStatus::Partial,
        (true, false) => ExecutionStatus::Success,
        (false, false) => ExecutionStatus::Skipped,
    }
}

// ---------------------------------------------------------------------------
// Traversal bookkeeping
// ---------------------------------------------------------------------------

/// Per-run scheduling state over borrowed node IDs.
struct Traversal<'g> {
    successors: HashMap<&'g str, Vec<&'g str>>,
    /// Predecessors that have not settled yet.
    unsettled: HashMap<&'g str, usize>,
    /// Predecessors whose edge into the node is live.
    live: HashMap<&'g str, usize>,
    ready: VecDeque<&'g str>,
}

impl<'g> Traversal<'g> {
    fn new(graph: &'g AutomationGraph) -> Self {
        let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut unsettled: HashMap<&str, usize> = HashMap::new();

        for id in graph.nodes.keys() {
            successors.entry(id.as_str()).or_default();
            unsettled.entry(id.as_str()).or_insert(0);
        }
        for edge in &graph.edges {
            successors
                .entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
            *unsettled.entry(edge.target.as_str()).or_insert(0) += 1;
        }

        let ready = graph
            .nodes
            .iter()
            .filter(|(_, n)| matches!(n, Node::Trigger(_)))
            .map(|(id, _)| id.as_str())
            .collect();

        Self {
            successors,
            unsettled,
            live: HashMap::new(),
            ready,
        }
    }

    /// Mark `node` as finished and release its successors. Successors left
    /// with no live incoming edge are pruned, which cascades downstream.
    fn settle(&mut self, node: &'g str, passes: bool) {
        let mut stack = vec![(node, passes)];

        while let Some((current, passes)) = stack.pop() {
            let Some(next_nodes) = self.successors.get(current) else {
                continue;
            };
            for &next in next_nodes {
                if passes {
                    *self.live.entry(next).or_insert(0) += 1;
                }
                let remaining = self.unsettled.entry(next).or_insert(1);
                *remaining -= 1;
                if *remaining > 0 {
                    continue;
                }
                if self.live.get(next).copied().unwrap_or(0) > 0 {
                    self.ready.push_back(next);
                } else {
                    stack.push((next, false));
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RuleExecutor
// ---------------------------------------------------------------------------

/// Stateless traversal engine shared by the dispatcher and the manual
/// trigger gateway.
#[derive(Debug, Clone)]
pub struct RuleExecutor {
    registry: Arc<ActionRegistry>,
    action_timeout: Duration,
}

impl RuleExecutor {
    pub fn new(registry: Arc<ActionRegistry>, action_timeout: Duration) -> Self {
        Self { registry, action_timeout }
    }

    /// Whether concurrent runs of `rule` must be serialised.
    pub fn requires_exclusive(&self, rule: &Rule) -> bool {
        !self.registry.all_idempotent(&rule.graph)
    }

    /// Walk `rule`'s graph against `ctx` and report every node's outcome.
    ///
    /// The graph must already have passed [`validate_graph`](crate::dag::validate_graph).
    #[instrument(skip_all, fields(rule_id = %rule.id))]
    pub async fn traverse(&self, rule: &Rule, ctx: &EventContext) -> TraversalReport {
        let graph = &rule.graph;
        let mut state = Traversal::new(graph);
        let mut outcomes: BTreeMap<String, NodeOutcome> = graph
            .nodes
            .keys()
            .map(|id| (id.clone(), NodeOutcome::Pending))
            .collect();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut in_flight = FuturesUnordered::new();
        let mut error_message: Option<String> = None;
        let mut halted = false;

        loop {
            // Start everything that is runnable.
            while !halted {
                let Some(id) = state.ready.pop_front() else {
                    break;
                };
                visited.insert(id);
                let node = &graph.nodes[id];
                debug!(node_id = id, kind = node.kind(), "visiting node");

                match node {
                    Node::Trigger(trigger) => {
                        let outcome = if trigger_matches(trigger, ctx) {
                            NodeOutcome::Satisfied
                        } else {
                            debug!(node_id = id, "trigger filter did not match");
                            NodeOutcome::Skipped
                        };
                        state.settle(id, outcome.passes());
                        outcomes.insert(id.to_owned(), outcome);
                    }
                    Node::Condition(group) => {
                        let outcome = if condition::evaluate(group, &ctx.payload) {
                            NodeOutcome::Satisfied
                        } else {
                            NodeOutcome::Skipped
                        };
                        debug!(node_id = id, ?outcome, "condition evaluated");
                        state.settle(id, outcome.passes());
                        outcomes.insert(id.to_owned(), outcome);
                    }
                    Node::Action(action) if action.action_type.is_intrinsic() => {
                        info!(node_id = id, "stop_execution reached, halting traversal");
                        outcomes.insert(id.to_owned(), NodeOutcome::Succeeded);
                        halted = true;
                    }
                    Node::Action(action) => {
                        in_flight.push(self.run_action(rule, id, action, ctx));
                    }
                }
            }

            // Join barrier: wait for the next in-flight action.
            let Some((id, action, result)) = in_flight.next().await else {
                break;
            };

            let outcome = match result {
                Ok(()) => NodeOutcome::Succeeded,
                Err(err) => {
                    let message = format!("action '{id}' ({}) failed: {err}", action.action_type);
                    warn!(node_id = id, continue_on_error = action.continue_on_error, "{message}");
                    error_message.get_or_insert_with(|| message.clone());
                    NodeOutcome::Failed {
                        message,
                        continued: action.continue_on_error,
                    }
                }
            };
            if !halted {
                state.settle(id, outcome.passes());
            }
            outcomes.insert(id.to_owned(), outcome);
        }

        if halted {
            for (id, outcome) in outcomes.iter_mut() {
                if *outcome == NodeOutcome::Pending && !visited.contains(id.as_str()) {
                    *outcome = NodeOutcome::Halted;
                }
            }
        }

        let status = aggregate_status(graph, &outcomes);
        info!(%status, halted, "traversal finished");

        TraversalReport {
            status,
            error_message,
            halted,
            outcomes,
        }
    }

    /// Invoke the handler for one action node, bounded by the timeout.
    fn run_action<'a>(
        &'a self,
        rule: &'a Rule,
        node_id: &'a str,
        action: &'a ActionNode,
        ctx: &'a EventContext,
    ) -> BoxFuture<'a, (&'a str, &'a ActionNode, Result<(), ActionError>)> {
        let handler = self.registry.get(action.action_type);
        let timeout = self.action_timeout;

        async move {
            let Some(handler) = handler else {
                return (node_id, action, Err(ActionError::NotRegistered(action.action_type.to_string())));
            };

            let action_ctx = ActionContext {
                rule_id: rule.id,
                organization_id: ctx.organization_id,
                node_id: node_id.to_owned(),
                payload: ctx.payload.clone(),
            };

            let result = match tokio::time::timeout(timeout, handler.execute(&action.config, &action_ctx)).await {
                Ok(result) => result,
                Err(_) => Err(ActionError::TimedOut {
                    after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                }),
            };
            (node_id, action, result)
        }
        .boxed()
    }
}

/// Automatic invocations must satisfy the trigger's `config.filter`.
fn trigger_matches(trigger: &TriggerNode, ctx: &EventContext) -> bool {
    if ctx.invocation == Invocation::Manual {
        return true;
    }
    let Some(Value::Object(filter)) = trigger.config.get("filter") else {
        return true;
    };
    filter.iter().all(|(field, expected)| {
        lookup(&ctx.payload, field).is_some_and(|actual| loosely_equal(actual, expected))
    })
}
