//! Engine-level error types.

use thiserror::Error;
use uuid::Uuid;

use crate::models::TriggerType;

/// A rule graph that must not be saved (and is never handed to the executor).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The graph has no trigger node.
    #[error("graph has no trigger node")]
    MissingTrigger,

    /// The graph has more than one trigger node.
    #[error("graph has {} trigger nodes ({}), expected exactly one", .0.len(), .0.join(", "))]
    MultipleTriggers(Vec<String>),

    /// The trigger node is the target of an edge.
    #[error("trigger node '{0}' must not have incoming edges")]
    TriggerHasIncomingEdge(String),

    /// The trigger node listens for a different event than its rule.
    #[error("trigger node is for '{found}' but the rule is for '{expected}'")]
    TriggerTypeMismatch {
        expected: TriggerType,
        found: TriggerType,
    },

    /// An edge references a node ID that doesn't exist in the graph.
    #[error("edge references unknown node '{node_id}' ({side} side)")]
    UnknownNodeReference {
        node_id: String,
        side: &'static str,
    },

    /// Topological sort detected a cycle.
    #[error("rule graph contains a cycle")]
    CycleDetected,

    /// A node cannot be reached from the trigger.
    #[error("node '{0}' is not reachable from the trigger")]
    UnreachableNode(String),
}

/// The rule store or log store could not serve a request.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store is down or refused the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored rule definition could not be decoded.
    #[error("rule {rule_id} has a corrupt definition: {reason}")]
    Corrupt { rule_id: Uuid, reason: String },

    /// Persistence error from the db crate.
    #[error("database error: {0}")]
    Database(#[from] db::DbError),
}

/// Errors surfaced by the engine's entry points.
///
/// Individual rule failures are never errors: they end up as an
/// [`ExecutionLog`](crate::models::ExecutionLog) with a non-success status.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A rule graph failed save-time validation.
    #[error("invalid rule graph: {0}")]
    Validation(#[from] ValidationError),

    /// No rule with this ID exists.
    #[error("rule {0} not found")]
    RuleNotFound(Uuid),

    /// Manual triggering of a disabled rule is rejected.
    #[error("rule {0} is disabled")]
    RuleDisabled(Uuid),

    /// The rule store failed; the whole dispatch is aborted.
    #[error("rule store failure: {0}")]
    Store(#[from] StoreError),

    /// The event worker pool is no longer accepting events.
    #[error("event worker pool is shut down")]
    WorkerPoolClosed,
}
