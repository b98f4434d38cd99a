//! Graph validation — run this before persisting a rule.
//!
//! Rules enforced:
//! 1. Every edge must reference valid node IDs (both `source` and `target`).
//! 2. There is exactly one trigger node, and nothing points at it.
//! 3. The directed graph must be acyclic (topological sort must succeed).
//! 4. Every node is reachable from the trigger.
//!
//! Returns a topologically-sorted list of node IDs on success. The executor
//! assumes these invariants and never re-checks them.

use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::error::ValidationError;
use crate::models::{AutomationGraph, Node, Rule};

/// Validate a whole rule: its graph plus the trigger/rule type agreement.
pub fn validate_rule(rule: &Rule) -> Result<Vec<String>, ValidationError> {
    let order = validate_graph(&rule.graph)?;

    if let Some(Node::Trigger(trigger)) = order.first().and_then(|id| rule.graph.nodes.get(id)) {
        if trigger.trigger_type != rule.trigger_type {
            return Err(ValidationError::TriggerTypeMismatch {
                expected: rule.trigger_type,
                found: trigger.trigger_type,
            });
        }
    }

    Ok(order)
}

/// Validate the graph and return nodes in topological execution order.
///
/// The trigger node is always first in the returned order.
///
/// # Errors
/// - [`ValidationError::UnknownNodeReference`] if an edge references a missing node.
/// - [`ValidationError::MissingTrigger`] / [`ValidationError::MultipleTriggers`]
///   unless there is exactly one trigger.
/// - [`ValidationError::TriggerHasIncomingEdge`] if an edge targets the trigger.
/// - [`ValidationError::CycleDetected`] if the graph is not acyclic.
/// - [`ValidationError::UnreachableNode`] if a node cannot be reached from the trigger.
pub fn validate_graph(graph: &AutomationGraph) -> Result<Vec<String>, ValidationError> {
    // -----------------------------------------------------------------------
    // 1. Validate edge endpoints
    // -----------------------------------------------------------------------
    for edge in &graph.edges {
        if !graph.nodes.contains_key(&edge.source) {
            return Err(ValidationError::UnknownNodeReference {
                node_id: edge.source.clone(),
                side: "source",
            });
        }
        if !graph.nodes.contains_key(&edge.target) {
            return Err(ValidationError::UnknownNodeReference {
                node_id: edge.target.clone(),
                side: "target",
            });
        }
    }

    // -----------------------------------------------------------------------
    // 2. Exactly one trigger, with no incoming edges
    // -----------------------------------------------------------------------
    let triggers = graph.trigger_ids();
    let trigger = match triggers.as_slice() {
        [] => return Err(ValidationError::MissingTrigger),
        [only] => *only,
        many => {
            return Err(ValidationError::MultipleTriggers(
                many.iter().map(|id| id.to_string()).collect(),
            ))
        }
    };

    if graph.edges.iter().any(|e| e.target == trigger) {
        return Err(ValidationError::TriggerHasIncomingEdge(trigger.to_owned()));
    }

    // -----------------------------------------------------------------------
    // 3. Topological sort (Kahn's algorithm)
    // -----------------------------------------------------------------------
    // BTreeMaps keep the resulting order deterministic.
    let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();

    for id in graph.nodes.keys() {
        adjacency.entry(id.as_str()).or_default();
        in_degree.entry(id.as_str()).or_insert(0);
    }

    for edge in &graph.edges {
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
        *in_degree.entry(edge.target.as_str()).or_insert(0) += 1;
    }

    // Seed with the trigger so it always comes first, then any other roots
    // (those are unreachable and rejected below).
    let mut queue: VecDeque<&str> = VecDeque::from([trigger]);
    queue.extend(
        in_degree
            .iter()
            .filter(|(&id, &d)| d == 0 && id != trigger)
            .map(|(&id, _)| id),
    );

    let mut sorted: Vec<String> = Vec::with_capacity(graph.nodes.len());

    while let Some(node_id) = queue.pop_front() {
        sorted.push(node_id.to_owned());

        if let Some(neighbours) = adjacency.get(node_id) {
            for &neighbour in neighbours {
                let deg = in_degree.entry(neighbour).or_insert(0);
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(neighbour);
                }
            }
        }
    }

    // If we didn't visit every node the graph contains a cycle.
    if sorted.len() != graph.nodes.len() {
        return Err(ValidationError::CycleDetected);
    }

    // -----------------------------------------------------------------------
    // 4. Reachability from the trigger
    // -----------------------------------------------------------------------
    let mut reached: HashSet<&str> = HashSet::from([trigger]);
    let mut frontier = vec![trigger];
    while let Some(node_id) = frontier.pop() {
        for &next in &adjacency[node_id] {
            if reached.insert(next) {
                frontier.push(next);
            }
        }
    }

    if let Some(orphan) = sorted.iter().find(|id| !reached.contains(id.as_str())) {
        return Err(ValidationError::UnreachableNode(orphan.clone()));
    }

    Ok(sorted)
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionType, LogicalOperator, TriggerType};
    use serde_json::Value;
    use uuid::Uuid;

    fn action() -> Node {
        Node::action(ActionType::AddTag, Value::Null)
    }

    fn rooted(graph: AutomationGraph) -> AutomationGraph {
        graph.with_node("t", Node::trigger(TriggerType::TransactionCreated))
    }

    #[test]
    fn valid_linear_graph_returns_sorted_order() {
        // t → c → a
        let graph = rooted(AutomationGraph::new())
            .with_node("c", Node::condition(LogicalOperator::And, vec![]))
            .with_node("a", action())
            .with_edge("t", "c")
            .with_edge("c", "a");

        let sorted = validate_graph(&graph).expect("should be valid");
        assert_eq!(sorted, vec!["t", "c", "a"]);
    }

    #[test]
    fn valid_diamond_graph() {
        //   t
        //  / \
        // b   c
        //  \ /
        //   d
        let graph = rooted(AutomationGraph::new())
            .with_node("b", action())
            .with_node("c", action())
            .with_node("d", action())
            .with_edge("t", "b")
            .with_edge("t", "c")
            .with_edge("b", "d")
            .with_edge("c", "d");

        let sorted = validate_graph(&graph).expect("should be valid");
        assert_eq!(sorted.first().unwrap(), "t");
        assert_eq!(sorted.last().unwrap(), "d");
        assert_eq!(sorted.len(), 4);
    }

    #[test]
    fn trigger_alone_is_valid() {
        let graph = rooted(AutomationGraph::new());
        assert_eq!(validate_graph(&graph).unwrap(), vec!["t"]);
    }

    #[test]
    fn edge_referencing_missing_node_is_rejected() {
        let graph = rooted(AutomationGraph::new()).with_edge("t", "ghost");
        assert!(matches!(
            validate_graph(&graph),
            Err(ValidationError::UnknownNodeReference { node_id, side: "target" }) if node_id == "ghost"
        ));
    }

    #[test]
    fn missing_trigger_is_rejected() {
        let graph = AutomationGraph::new().with_node("a", action());
        assert_eq!(validate_graph(&graph), Err(ValidationError::MissingTrigger));
    }

    #[test]
    fn extra_trigger_is_rejected() {
        let graph = rooted(AutomationGraph::new())
            .with_node("t2", Node::trigger(TriggerType::WebhookReceived));
        assert_eq!(
            validate_graph(&graph),
            Err(ValidationError::MultipleTriggers(vec!["t".into(), "t2".into()]))
        );
    }

    #[test]
    fn edge_into_trigger_is_rejected() {
        let graph = rooted(AutomationGraph::new())
            .with_node("a", action())
            .with_edge("t", "a")
            .with_edge("a", "t");
        assert_eq!(
            validate_graph(&graph),
            Err(ValidationError::TriggerHasIncomingEdge("t".into()))
        );
    }

    #[test]
    fn cycle_is_detected() {
        // t → a → b → c → a  (cycle!)
        let graph = rooted(AutomationGraph::new())
            .with_node("a", action())
            .with_node("b", action())
            .with_node("c", action())
            .with_edge("t", "a")
            .with_edge("a", "b")
            .with_edge("b", "c")
            .with_edge("c", "a");
        assert_eq!(validate_graph(&graph), Err(ValidationError::CycleDetected));
    }

    #[test]
    fn unreachable_node_is_rejected() {
        let graph = rooted(AutomationGraph::new())
            .with_node("a", action())
            .with_node("island", action())
            .with_edge("t", "a");
        assert_eq!(
            validate_graph(&graph),
            Err(ValidationError::UnreachableNode("island".into()))
        );
    }

    #[test]
    fn rule_trigger_type_must_match_trigger_node() {
        let graph = AutomationGraph::new().with_node("t", Node::trigger(TriggerType::WebhookReceived));
        let rule = crate::models::Rule::new(Uuid::nil(), "r", TriggerType::TransactionCreated, graph);
        assert_eq!(
            validate_rule(&rule),
            Err(ValidationError::TriggerTypeMismatch {
                expected: TriggerType::TransactionCreated,
                found: TriggerType::WebhookReceived,
            })
        );
    }
}
