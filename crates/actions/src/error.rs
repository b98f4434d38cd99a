//! Action-level error type.

use thiserror::Error;

/// Errors returned by an action handler (or produced by the engine on the
/// handler's behalf).
///
/// Every variant is treated the same way by the traversal: the action node is
/// marked failed and the node's `continue_on_error` flag decides whether the
/// branch carries on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The node's `config` does not have the shape the handler expects.
    #[error("invalid action config: {0}")]
    InvalidConfig(String),

    /// The side effect itself failed.
    #[error("{0}")]
    Failed(String),

    /// The handler did not answer within the per-call timeout.
    #[error("action timed out after {after_ms}ms")]
    TimedOut { after_ms: u64 },

    /// No handler is registered for the node's action type.
    #[error("no handler registered for action type '{0}'")]
    NotRegistered(String),
}
